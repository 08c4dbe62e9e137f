//
// ISO/IEC 23008-3 section 20, carriage of MPEG-H 3D audio in ISOBMFF.
//
use std::fmt::Debug;
use std::io;

use crate::boxes::prelude::*;

/// MPEG-H sample entry: 'mha1'/'mha2' (raw AUs) or 'mhm1'/'mhm2' (MHAS).
#[derive(Clone, Default)]
pub struct MpeghSampleEntry {
    fourcc:                   FourCC,
    pub data_reference_index: u16,
    pub channel_count:        u16,
    pub sample_size:          u16,
    pub sample_rate_hi:       u16,
    pub sample_rate_lo:       u16,
    pub boxes:                Vec<MP4Box>,
}
pub type Mha2SampleEntry = MpeghSampleEntry;
pub type Mhm1SampleEntry = MpeghSampleEntry;
pub type Mhm2SampleEntry = MpeghSampleEntry;

impl MpeghSampleEntry {
    pub fn new(coding_name: FourCC) -> MpeghSampleEntry {
        MpeghSampleEntry {
            fourcc: coding_name,
            data_reference_index: 1,
            sample_size: 16,
            ..MpeghSampleEntry::default()
        }
    }

    /// MHAS encapsulation ('mhm1'/'mhm2') instead of raw AUs.
    pub fn is_mhas(&self) -> bool {
        self.fourcc == b"mhm1" || self.fourcc == b"mhm2"
    }

    /// The configuration box, when present.
    pub fn mha_config(&self) -> Option<&MhaConfigurationBox> {
        first_box!(&self.boxes, MhaConfigurationBox)
    }

    /// The raw mpegh3daConfig bytes from the config record.
    pub fn decoder_config(&self) -> Option<&[u8]> {
        self.mha_config().map(|c| &c.record.mpegh3da_config.0[..])
    }
}

impl FromBytes for MpeghSampleEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MpeghSampleEntry> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let stream = &mut reader;

        stream.skip(6)?;
        let data_reference_index = u16::from_bytes(stream)?;
        stream.skip(8)?;
        let channel_count = u16::from_bytes(stream)?;
        let sample_size = u16::from_bytes(stream)?;
        stream.skip(4)?;
        let sample_rate_hi = u16::from_bytes(stream)?;
        let sample_rate_lo = u16::from_bytes(stream)?;
        let boxes = Vec::<MP4Box>::from_bytes(stream)?;

        Ok(MpeghSampleEntry {
            fourcc,
            data_reference_index,
            channel_count,
            sample_size,
            sample_rate_hi,
            sample_rate_lo,
            boxes,
        })
    }

    fn min_size() -> usize {
        36
    }
}

impl ToBytes for MpeghSampleEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        stream.skip(6)?;
        self.data_reference_index.to_bytes(stream)?;
        stream.skip(8)?;
        self.channel_count.to_bytes(stream)?;
        self.sample_size.to_bytes(stream)?;
        stream.skip(4)?;
        self.sample_rate_hi.to_bytes(stream)?;
        self.sample_rate_lo.to_bytes(stream)?;
        self.boxes.to_bytes(stream)?;

        stream.finalize()
    }
}

impl BoxInfo for MpeghSampleEntry {
    const FOURCC: &'static str = "mha1";

    #[inline]
    fn fourcc(&self) -> FourCC {
        if self.fourcc == FourCC::default() {
            FourCC::new("mha1")
        } else {
            self.fourcc
        }
    }
}

impl FullBox for MpeghSampleEntry {}

impl Debug for MpeghSampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("MpeghSampleEntry");
        dbg.field("fourcc", &self.fourcc());
        dbg.field("channel_count", &self.channel_count);
        dbg.field("sample_rate", &self.sample_rate_hi);
        dbg.field("boxes", &self.boxes);
        dbg.finish()
    }
}

/// The MHA decoder config record (ISO/IEC 23008-3 section 20.4).
#[derive(Clone, Debug, Default)]
pub struct MhaDecoderConfigRecord {
    pub configuration_version:            u8,
    pub mpegh3da_profile_level_indication: u8,
    pub reference_channel_layout:         u8,
    pub mpegh3da_config:                  Data,
}

impl FromBytes for MhaDecoderConfigRecord {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MhaDecoderConfigRecord> {
        let configuration_version = u8::from_bytes(stream)?;
        let mpegh3da_profile_level_indication = u8::from_bytes(stream)?;
        let reference_channel_layout = u8::from_bytes(stream)?;
        let len = u16::from_bytes(stream)?;
        let mpegh3da_config = Data::read(stream, len as usize)?;
        Ok(MhaDecoderConfigRecord {
            configuration_version,
            mpegh3da_profile_level_indication,
            reference_channel_layout,
            mpegh3da_config,
        })
    }
    fn min_size() -> usize {
        5
    }
}

impl ToBytes for MhaDecoderConfigRecord {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        self.configuration_version.to_bytes(stream)?;
        self.mpegh3da_profile_level_indication.to_bytes(stream)?;
        self.reference_channel_layout.to_bytes(stream)?;
        (self.mpegh3da_config.len() as u16).to_bytes(stream)?;
        self.mpegh3da_config.to_bytes(stream)
    }
}

def_box! {
    /// MHAConfigurationBox ('mhaC').
    #[derive(Default)]
    MhaConfigurationBox {
        record: MhaDecoderConfigRecord,
    },
    fourcc => "mhaC",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// MHAProfileAndLevelCompatibilitySetBox ('mhaP').
    #[derive(Default)]
    MhaProfileLevelCompatibilityBox {
        compatible_sets: ArraySized8<u8>,
    },
    fourcc => "mhaP",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}
