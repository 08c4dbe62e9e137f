//
// ISO/IEC 14496-12:2015(E)
// 8.8.12 Track Fragment Base Media Decode Time Box
//
use std::io;

use crate::boxes::prelude::*;

/// 8.8.12 Track Fragment Base Media Decode Time Box (ISO/IEC 14496-12:2015(E))
///
/// Version 1 is picked automatically when the value does not fit in
/// 32 bits, or when `force_v1` is set.
#[derive(Clone, Debug, Default)]
pub struct TrackFragmentBaseMediaDecodeTimeBox {
    pub base_media_decode_time: u64,
    pub force_v1:               bool,
}

impl FromBytes for TrackFragmentBaseMediaDecodeTimeBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<TrackFragmentBaseMediaDecodeTimeBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;
        let version = stream.version();
        let base_media_decode_time = match version {
            1 => u64::from_bytes(stream)?,
            _ => u32::from_bytes(stream)? as u64,
        };
        Ok(TrackFragmentBaseMediaDecodeTimeBox {
            base_media_decode_time,
            // Keep a parsed v1 at v1 so re-serialization is byte-exact.
            force_v1: version == 1,
        })
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for TrackFragmentBaseMediaDecodeTimeBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;
        match stream.version() {
            1 => self.base_media_decode_time.to_bytes(stream)?,
            _ => (self.base_media_decode_time as u32).to_bytes(stream)?,
        }
        stream.finalize()
    }
}

impl BoxInfo for TrackFragmentBaseMediaDecodeTimeBox {
    const FOURCC: &'static str = "tfdt";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("tfdt")
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(1)
    }
}

impl FullBox for TrackFragmentBaseMediaDecodeTimeBox {
    fn version(&self) -> Option<u8> {
        if self.force_v1 || self.base_media_decode_time > u32::MAX as u64 {
            Some(1)
        } else {
            Some(0)
        }
    }
}
