//
// ISO/IEC 14496-15, HEVC sample entries ('hvc1', 'hev1').
//
use std::fmt::Debug;
use std::io;

use crate::boxes::prelude::*;
use crate::boxes::sample_entry::VisualSampleFields;
use crate::boxes::HevcConfigurationBox;

/// HEVC sample entry.
///
/// 'hvc1': all parameter sets live in the config record.
/// 'hev1': in-band parameter set updates are allowed.
#[derive(Clone, Default)]
pub struct HevcSampleEntry {
    fourcc:     FourCC,
    pub visual: VisualSampleFields,
    pub boxes:  Vec<MP4Box>,
}
pub type Hev1SampleEntry = HevcSampleEntry;

impl HevcSampleEntry {
    pub fn new(coding_name: FourCC) -> HevcSampleEntry {
        HevcSampleEntry {
            fourcc: coding_name,
            ..HevcSampleEntry::default()
        }
    }

    /// The configuration box.
    pub fn hvcc(&self) -> Option<&HevcConfigurationBox> {
        first_box!(&self.boxes, HevcConfigurationBox)
    }

    /// The raw decoder configuration record bytes.
    pub fn decoder_config(&self) -> Option<&[u8]> {
        self.hvcc().map(|b| &b.record.raw.0[..])
    }
}

impl FromBytes for HevcSampleEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<HevcSampleEntry> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let stream = &mut reader;
        let visual = VisualSampleFields::from_bytes(stream)?;
        let boxes = Vec::<MP4Box>::from_bytes(stream)?;
        Ok(HevcSampleEntry { fourcc, visual, boxes })
    }

    fn min_size() -> usize {
        86
    }
}

impl ToBytes for HevcSampleEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;
        self.visual.to_bytes(stream)?;
        self.boxes.to_bytes(stream)?;
        stream.finalize()
    }
}

impl BoxInfo for HevcSampleEntry {
    const FOURCC: &'static str = "hvc1";

    #[inline]
    fn fourcc(&self) -> FourCC {
        if self.fourcc == FourCC::default() {
            FourCC::new("hvc1")
        } else {
            self.fourcc
        }
    }
}

impl FullBox for HevcSampleEntry {}

impl Debug for HevcSampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("HevcSampleEntry");
        dbg.field("fourcc", &self.fourcc());
        dbg.field("width", &self.visual.width);
        dbg.field("height", &self.visual.height);
        dbg.field("boxes", &self.boxes);
        dbg.finish()
    }
}
