//
// The field block every VisualSampleEntry starts with
// (ISO/IEC 14496-12:2015(E), 12.1.3).
//
use std::io;

use crate::boxes::prelude::*;

/// The common fields of a visual sample entry, up to the codec
/// specific sub-boxes.
#[derive(Clone, Debug)]
pub struct VisualSampleFields {
    pub data_reference_index: u16,
    pub width:                u16,
    pub height:               u16,
    pub horiz_resolution:     FixedFloat16_16,
    pub vert_resolution:      FixedFloat16_16,
    pub frame_count:          u16,
    pub compressor_name:      CompressorName,
    pub depth:                u16,
}

impl Default for VisualSampleFields {
    fn default() -> VisualSampleFields {
        VisualSampleFields {
            data_reference_index: 1,
            width:                0,
            height:               0,
            horiz_resolution:     FixedFloat16_16(0x00480000),
            vert_resolution:      FixedFloat16_16(0x00480000),
            frame_count:          1,
            compressor_name:      CompressorName::default(),
            depth:                0x0018,
        }
    }
}

impl FromBytes for VisualSampleFields {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<VisualSampleFields> {
        stream.skip(6)?;
        let data_reference_index = u16::from_bytes(stream)?;
        stream.skip(16)?;
        let width = u16::from_bytes(stream)?;
        let height = u16::from_bytes(stream)?;
        let horiz_resolution = FixedFloat16_16::from_bytes(stream)?;
        let vert_resolution = FixedFloat16_16::from_bytes(stream)?;
        stream.skip(4)?;
        let frame_count = u16::from_bytes(stream)?;
        let compressor_name = CompressorName::from_bytes(stream)?;
        let depth = u16::from_bytes(stream)?;
        // pre_defined = -1.
        stream.skip(2)?;
        Ok(VisualSampleFields {
            data_reference_index,
            width,
            height,
            horiz_resolution,
            vert_resolution,
            frame_count,
            compressor_name,
            depth,
        })
    }

    fn min_size() -> usize {
        78
    }
}

impl ToBytes for VisualSampleFields {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        stream.skip(6)?;
        self.data_reference_index.to_bytes(stream)?;
        stream.skip(16)?;
        self.width.to_bytes(stream)?;
        self.height.to_bytes(stream)?;
        self.horiz_resolution.to_bytes(stream)?;
        self.vert_resolution.to_bytes(stream)?;
        stream.skip(4)?;
        self.frame_count.to_bytes(stream)?;
        self.compressor_name.to_bytes(stream)?;
        self.depth.to_bytes(stream)?;
        (-1i16).to_bytes(stream)?;
        Ok(())
    }
}
