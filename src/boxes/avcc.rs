//! AVC decoder configuration.
//!
use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// AVCConfigurationBox (ISO/IEC 14496-15, 5.4.2)
    #[derive(Default)]
    AvcConfigurationBox {
        record: AvcDecoderConfigRecord,
    },
    fourcc => "avcC",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

// aligned(8) class AVCDecoderConfigurationRecord {
//     unsigned int(8) configurationVersion = 1;
//     unsigned int(8) AVCProfileIndication;
//     unsigned int(8) profile_compatibility;
//     unsigned int(8) AVCLevelIndication;
//     bit(6) reserved = '111111'b;
//     unsigned int(2) lengthSizeMinusOne;
//     bit(3) reserved = '111'b;
//     unsigned int(5) numOfSequenceParameterSets;
//     ...
// }

/// AVC Decoder Configuration Record.
///
/// The structured fields are parsed out; the full record is also kept
/// verbatim in `raw` so that it can be passed through unmodified.
#[derive(Clone, Debug, Default)]
pub struct AvcDecoderConfigRecord {
    pub configuration_version: u8,
    pub profile_indication:    u8,
    pub profile_compatibility: u8,
    pub level_indication:      u8,
    pub length_size_minus_one: u8,
    pub raw:                   Data,
}

impl AvcDecoderConfigRecord {
    /// Parse from the raw record bytes.
    pub fn parse(raw: Vec<u8>) -> io::Result<AvcDecoderConfigRecord> {
        let mut slice = &raw[..];
        let stream = &mut slice;
        let configuration_version = u8::from_bytes(stream)?;
        let profile_indication = u8::from_bytes(stream)?;
        let profile_compatibility = u8::from_bytes(stream)?;
        let level_indication = u8::from_bytes(stream)?;
        let length_size_minus_one = u8::from_bytes(stream)? & 0x03;
        Ok(AvcDecoderConfigRecord {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            length_size_minus_one,
            raw: Data(raw),
        })
    }

    /// Return human name of the codec profile, like "Baseline" or "High".
    pub fn codec_name(&self) -> &'static str {
        match self.profile_indication {
            0x2c => "AVC CAVLC 4:4:4",
            0x42 => "AVC Baseline",
            0x4d => "AVC Main",
            0x58 => "AVC Extended",
            0x64 => "AVC High",
            0x6e => "AVC High 10",
            0x7a => "AVC High 4:2:2",
            0xf4 => "AVC High 4:4:4",
            0x53 => "AVC Scalable Baseline",
            0x56 => "AVC Scalable High",
            0x76 => "AVC Multiview High",
            0x80 => "AVC Stereo High",
            0x8a => "AVC Multiview Depth High",
            _ => "AVC",
        }
    }

    /// Return codec id as avc1.4d401f
    pub fn codec_id(&self) -> String {
        format!(
            "avc1.{:02x}{:02x}{:02x}",
            self.profile_indication, self.profile_compatibility, self.level_indication
        )
    }
}

impl FromBytes for AvcDecoderConfigRecord {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<AvcDecoderConfigRecord> {
        let raw = Data::from_bytes(stream)?;
        AvcDecoderConfigRecord::parse(raw.0)
    }

    fn min_size() -> usize {
        5
    }
}

impl ToBytes for AvcDecoderConfigRecord {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        self.raw.to_bytes(stream)
    }
}
