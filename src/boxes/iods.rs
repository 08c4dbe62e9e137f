//
// ISO/IEC 14496-14:2003(E), 5.1 object descriptor box
//
use std::io;

use crate::boxes::prelude::*;

const MP4_IOD_TAG: u8 = 0x10;

/// Initial Object Descriptor box (ISO/IEC 14496-14).
///
/// Carries the MP4 variant of the InitialObjectDescriptor with the
/// five profile/level indications.
#[derive(Clone, Debug)]
pub struct InitialObjectDescriptionBox {
    pub object_descriptor_id:   u16,
    pub od_profile_level:       u8,
    pub scene_profile_level:    u8,
    pub audio_profile_level:    u8,
    pub visual_profile_level:   u8,
    pub graphics_profile_level: u8,
    pub data:                   Data,
}

impl Default for InitialObjectDescriptionBox {
    fn default() -> InitialObjectDescriptionBox {
        // ObjectDescriptorID 1, no URL, reserved bits all-ones,
        // "no profile specified" everywhere.
        InitialObjectDescriptionBox {
            object_descriptor_id:   (0x01 << 6) | 0x0f,
            od_profile_level:       0xff,
            scene_profile_level:    0xff,
            audio_profile_level:    0xfe,
            visual_profile_level:   0xfe,
            graphics_profile_level: 0xfe,
            data:                   Data::default(),
        }
    }
}

impl FromBytes for InitialObjectDescriptionBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<InitialObjectDescriptionBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let tag = u8::from_bytes(stream)?;
        if tag != MP4_IOD_TAG {
            return Err(ioerr!(InvalidData, "iods: unexpected descriptor tag {}", tag));
        }
        let size = crate::boxes::mp4a::read_descriptor_size(stream)?;
        let pos = stream.pos();

        let object_descriptor_id = u16::from_bytes(stream)?;
        let od_profile_level = u8::from_bytes(stream)?;
        let scene_profile_level = u8::from_bytes(stream)?;
        let audio_profile_level = u8::from_bytes(stream)?;
        let visual_profile_level = u8::from_bytes(stream)?;
        let graphics_profile_level = u8::from_bytes(stream)?;

        // Any trailing ES_ID_Inc descriptors are kept verbatim.
        let done = stream.pos() - pos;
        let data = if (size as u64) > done {
            Data::read(stream, (size as u64 - done) as usize)?
        } else {
            Data::default()
        };

        Ok(InitialObjectDescriptionBox {
            object_descriptor_id,
            od_profile_level,
            scene_profile_level,
            audio_profile_level,
            visual_profile_level,
            graphics_profile_level,
            data,
        })
    }

    fn min_size() -> usize {
        12
    }
}

impl ToBytes for InitialObjectDescriptionBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        MP4_IOD_TAG.to_bytes(stream)?;
        crate::boxes::mp4a::write_descriptor_size(stream, 7 + self.data.len() as u32)?;
        self.object_descriptor_id.to_bytes(stream)?;
        self.od_profile_level.to_bytes(stream)?;
        self.scene_profile_level.to_bytes(stream)?;
        self.audio_profile_level.to_bytes(stream)?;
        self.visual_profile_level.to_bytes(stream)?;
        self.graphics_profile_level.to_bytes(stream)?;
        self.data.to_bytes(stream)?;

        stream.finalize()
    }
}

impl BoxInfo for InitialObjectDescriptionBox {
    const FOURCC: &'static str = "iods";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("iods")
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(0)
    }
}

impl FullBox for InitialObjectDescriptionBox {
    fn version(&self) -> Option<u8> {
        Some(0)
    }
}
