//! HEVC decoder configuration.
//!
use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// HEVCConfigurationBox (ISO/IEC 14496-15, 8.4.1)
    #[derive(Default)]
    HevcConfigurationBox {
        record: HevcDecoderConfigRecord,
    },
    fourcc => "hvcC",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

/// HEVC Decoder Configuration Record (ISO/IEC 14496-15, 8.3.3.1).
///
/// The structured fields are parsed out; the full record is also kept
/// verbatim in `raw` so that it can be passed through unmodified.
#[derive(Clone, Debug, Default)]
pub struct HevcDecoderConfigRecord {
    pub configuration_version:  u8,
    pub general_profile_space:  u8,
    pub general_tier_flag:      bool,
    pub general_profile_idc:    u8,
    pub general_profile_compatibility: u32,
    pub general_level_idc:      u8,
    pub chroma_format_idc:      u8,
    pub length_size_minus_one:  u8,
    pub num_of_arrays:          u8,
    pub raw:                    Data,
}

impl HevcDecoderConfigRecord {
    /// Parse from the raw record bytes.
    pub fn parse(raw: Vec<u8>) -> io::Result<HevcDecoderConfigRecord> {
        let mut slice = &raw[..];
        let stream = &mut slice;

        let configuration_version = u8::from_bytes(stream)?;
        let b = u8::from_bytes(stream)?;
        let general_profile_space = b >> 6;
        let general_tier_flag = b & 0x20 > 0;
        let general_profile_idc = b & 0x1f;
        let general_profile_compatibility = u32::from_bytes(stream)?;
        // general_constraint_indicator_flags, 48 bits.
        stream.skip(6)?;
        let general_level_idc = u8::from_bytes(stream)?;
        // min_spatial_segmentation_idc, parallelismType.
        stream.skip(3)?;
        let chroma_format_idc = u8::from_bytes(stream)? & 0x03;
        // bitDepthLuma, bitDepthChroma, avgFrameRate.
        stream.skip(4)?;
        let b = u8::from_bytes(stream)?;
        let length_size_minus_one = b & 0x03;
        let num_of_arrays = u8::from_bytes(stream)?;

        Ok(HevcDecoderConfigRecord {
            configuration_version,
            general_profile_space,
            general_tier_flag,
            general_profile_idc,
            general_profile_compatibility,
            general_level_idc,
            chroma_format_idc,
            length_size_minus_one,
            num_of_arrays,
            raw: Data(raw),
        })
    }

    /// Return codec id like hvc1.1.6.L93.B0
    pub fn codec_id(&self) -> String {
        let profile_space = match self.general_profile_space {
            1 => "A",
            2 => "B",
            3 => "C",
            _ => "",
        };
        let tier = if self.general_tier_flag { "H" } else { "L" };
        format!(
            "hvc1.{}{}.{:x}.{}{}.B0",
            profile_space,
            self.general_profile_idc,
            self.general_profile_compatibility.reverse_bits(),
            tier,
            self.general_level_idc,
        )
    }
}

impl FromBytes for HevcDecoderConfigRecord {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<HevcDecoderConfigRecord> {
        let raw = Data::from_bytes(stream)?;
        HevcDecoderConfigRecord::parse(raw.0)
    }

    fn min_size() -> usize {
        23
    }
}

impl ToBytes for HevcDecoderConfigRecord {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        self.raw.to_bytes(stream)
    }
}
