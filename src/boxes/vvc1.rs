//
// ISO/IEC 14496-15, VVC sample entries ('vvc1', 'vvi1').
//
use std::fmt::Debug;
use std::io;

use crate::boxes::prelude::*;
use crate::boxes::sample_entry::VisualSampleFields;
use crate::boxes::VvcConfigurationBox;

/// VVC sample entry.
///
/// 'vvc1': all parameter sets live in the config record.
/// 'vvi1': in-band parameter set updates are allowed.
#[derive(Clone, Default)]
pub struct VvcSampleEntry {
    fourcc:     FourCC,
    pub visual: VisualSampleFields,
    pub boxes:  Vec<MP4Box>,
}
pub type Vvi1SampleEntry = VvcSampleEntry;

impl VvcSampleEntry {
    pub fn new(coding_name: FourCC) -> VvcSampleEntry {
        VvcSampleEntry {
            fourcc: coding_name,
            ..VvcSampleEntry::default()
        }
    }

    /// The configuration box.
    pub fn vvcc(&self) -> Option<&VvcConfigurationBox> {
        first_box!(&self.boxes, VvcConfigurationBox)
    }

    /// The raw decoder configuration record bytes.
    pub fn decoder_config(&self) -> Option<Vec<u8>> {
        self.vvcc().map(|b| b.record.raw())
    }
}

impl FromBytes for VvcSampleEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<VvcSampleEntry> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let stream = &mut reader;
        let visual = VisualSampleFields::from_bytes(stream)?;
        let boxes = Vec::<MP4Box>::from_bytes(stream)?;
        Ok(VvcSampleEntry { fourcc, visual, boxes })
    }

    fn min_size() -> usize {
        86
    }
}

impl ToBytes for VvcSampleEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;
        self.visual.to_bytes(stream)?;
        self.boxes.to_bytes(stream)?;
        stream.finalize()
    }
}

impl BoxInfo for VvcSampleEntry {
    const FOURCC: &'static str = "vvc1";

    #[inline]
    fn fourcc(&self) -> FourCC {
        if self.fourcc == FourCC::default() {
            FourCC::new("vvc1")
        } else {
            self.fourcc
        }
    }
}

impl FullBox for VvcSampleEntry {}

impl Debug for VvcSampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("VvcSampleEntry");
        dbg.field("fourcc", &self.fourcc());
        dbg.field("width", &self.visual.width);
        dbg.field("height", &self.visual.height);
        dbg.field("boxes", &self.boxes);
        dbg.finish()
    }
}
