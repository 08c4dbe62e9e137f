//
// ISO/IEC 14496-15, AVC sample entries ('avc1', 'avc3').
//
use std::fmt::Debug;
use std::io;

use crate::boxes::prelude::*;
use crate::boxes::sample_entry::VisualSampleFields;
use crate::boxes::AvcConfigurationBox;

/// AVC sample entry.
///
/// 'avc1': all parameter sets live in the config record.
/// 'avc3': in-band parameter set updates are allowed.
#[derive(Clone, Default)]
pub struct AvcSampleEntry {
    fourcc:     FourCC,
    pub visual: VisualSampleFields,
    pub boxes:  Vec<MP4Box>,
}
pub type Avc3SampleEntry = AvcSampleEntry;

impl AvcSampleEntry {
    pub fn new(coding_name: FourCC) -> AvcSampleEntry {
        AvcSampleEntry {
            fourcc: coding_name,
            ..AvcSampleEntry::default()
        }
    }

    /// The configuration box.
    pub fn avcc(&self) -> Option<&AvcConfigurationBox> {
        first_box!(&self.boxes, AvcConfigurationBox)
    }

    /// The raw decoder configuration record bytes.
    pub fn decoder_config(&self) -> Option<&[u8]> {
        self.avcc().map(|b| &b.record.raw.0[..])
    }
}

impl FromBytes for AvcSampleEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<AvcSampleEntry> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let stream = &mut reader;
        let visual = VisualSampleFields::from_bytes(stream)?;
        let boxes = Vec::<MP4Box>::from_bytes(stream)?;
        Ok(AvcSampleEntry { fourcc, visual, boxes })
    }

    fn min_size() -> usize {
        86
    }
}

impl ToBytes for AvcSampleEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;
        self.visual.to_bytes(stream)?;
        self.boxes.to_bytes(stream)?;
        stream.finalize()
    }
}

impl BoxInfo for AvcSampleEntry {
    const FOURCC: &'static str = "avc1";

    #[inline]
    fn fourcc(&self) -> FourCC {
        if self.fourcc == FourCC::default() {
            FourCC::new("avc1")
        } else {
            self.fourcc
        }
    }
}

impl FullBox for AvcSampleEntry {}

impl Debug for AvcSampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("AvcSampleEntry");
        dbg.field("fourcc", &self.fourcc());
        dbg.field("width", &self.visual.width);
        dbg.field("height", &self.visual.height);
        dbg.field("boxes", &self.boxes);
        dbg.finish()
    }
}
