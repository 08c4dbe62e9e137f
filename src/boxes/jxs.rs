//
// ISO/IEC 21122-3 Annex B, JPEG-XS in ISOBMFF.
//
use std::fmt::Debug;
use std::io;

use crate::boxes::prelude::*;
use crate::boxes::sample_entry::VisualSampleFields;

/// JPEG-XS sample entry ('jxsm').
#[derive(Clone, Default)]
pub struct JxsSampleEntry {
    pub visual: VisualSampleFields,
    pub boxes:  Vec<MP4Box>,
}

impl JxsSampleEntry {
    /// The configuration box.
    pub fn jxsh(&self) -> Option<&JxsConfigurationBox> {
        first_box!(&self.boxes, JxsConfigurationBox)
    }

    /// The raw Codestream_Header bytes.
    pub fn decoder_config(&self) -> Option<&[u8]> {
        self.jxsh().map(|b| &b.record.codestream_header.0[..])
    }
}

impl FromBytes for JxsSampleEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<JxsSampleEntry> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;
        let visual = VisualSampleFields::from_bytes(stream)?;
        let boxes = Vec::<MP4Box>::from_bytes(stream)?;
        Ok(JxsSampleEntry { visual, boxes })
    }

    fn min_size() -> usize {
        86
    }
}

impl ToBytes for JxsSampleEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;
        self.visual.to_bytes(stream)?;
        self.boxes.to_bytes(stream)?;
        stream.finalize()
    }
}

impl BoxInfo for JxsSampleEntry {
    const FOURCC: &'static str = "jxsm";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("jxsm")
    }
}

impl FullBox for JxsSampleEntry {}

impl Debug for JxsSampleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("JxsSampleEntry");
        dbg.field("fourcc", &self.fourcc());
        dbg.field("width", &self.visual.width);
        dbg.field("height", &self.visual.height);
        dbg.field("boxes", &self.boxes);
        dbg.finish()
    }
}

/// The JXS decoder config record: the Codestream_Header from
/// ISO/IEC 21122-3 Annex A.5.5, kept as an opaque buffer.
#[derive(Clone, Debug, Default)]
pub struct JxsDecoderConfigRecord {
    pub codestream_header: Data,
}

impl FromBytes for JxsDecoderConfigRecord {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<JxsDecoderConfigRecord> {
        let codestream_header = Data::from_bytes(stream)?;
        Ok(JxsDecoderConfigRecord { codestream_header })
    }
    fn min_size() -> usize {
        0
    }
}

impl ToBytes for JxsDecoderConfigRecord {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        self.codestream_header.to_bytes(stream)
    }
}

def_box! {
    /// JPEG XS header box ('jxsH'), carries the config record.
    #[derive(Default)]
    JxsConfigurationBox {
        record: JxsDecoderConfigRecord,
    },
    fourcc => "jxsH",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// JPEG XS video information box ('jpvi').
    ///
    /// brat: maximum bitrate in Mbits/s, frat: frame rate spelling,
    /// schar: sampling characteristics, tcod: HH:MM:SS:FF timecode.
    #[derive(Default)]
    JxsVideoInformationBox {
        brat:   u32,
        frat:   u32,
        schar:  u16,
        tcod:   u32,
    },
    fourcc => "jpvi",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// JPEG XS profile and level box ('jxpl').
    #[derive(Default)]
    JxsProfileBox {
        ppih:   u16,
        plev:   u16,
    },
    fourcc => "jxpl",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

/// 12.1.5 Colour Information Box ('colr', ISO/IEC 14496-12:2015(E)).
#[derive(Clone, Debug, Default)]
pub struct ColourInformationBox {
    pub colour_type:              FourCC,
    pub colour_primaries:         u16,
    pub transfer_characteristics: u16,
    pub matrix_coefficients:      u16,
    pub full_range_flag:          bool,
    pub icc_profile:              Data,
}

impl FromBytes for ColourInformationBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<ColourInformationBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let colour_type = FourCC::from_bytes(stream)?;
        let mut this = ColourInformationBox {
            colour_type,
            ..ColourInformationBox::default()
        };
        if colour_type == b"nclx" {
            this.colour_primaries = u16::from_bytes(stream)?;
            this.transfer_characteristics = u16::from_bytes(stream)?;
            this.matrix_coefficients = u16::from_bytes(stream)?;
            this.full_range_flag = u8::from_bytes(stream)? & 0x80 > 0;
        } else {
            // 'rICC' and 'prof' carry an ICC profile.
            this.icc_profile = Data::from_bytes(stream)?;
        }
        Ok(this)
    }

    fn min_size() -> usize {
        4
    }
}

impl ToBytes for ColourInformationBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        self.colour_type.to_bytes(stream)?;
        if self.colour_type == b"nclx" {
            self.colour_primaries.to_bytes(stream)?;
            self.transfer_characteristics.to_bytes(stream)?;
            self.matrix_coefficients.to_bytes(stream)?;
            (((self.full_range_flag as u8) << 7) as u8).to_bytes(stream)?;
        } else {
            self.icc_profile.to_bytes(stream)?;
        }

        stream.finalize()
    }
}

impl BoxInfo for ColourInformationBox {
    const FOURCC: &'static str = "colr";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("colr")
    }
}

impl FullBox for ColourInformationBox {}
