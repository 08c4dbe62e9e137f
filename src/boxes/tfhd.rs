//
// ISO/IEC 14496-12:2015(E)
// 8.8.7 Track Fragment Header Box
//
use std::io;

use crate::boxes::prelude::*;

/// 8.8.7 Track Fragment Header Box (ISO/IEC 14496-12:2015(E))
#[derive(Clone, Debug, Default)]
pub struct TrackFragmentHeaderBox {
    pub track_id:                 u32,
    pub duration_is_empty:        bool,
    pub default_base_is_moof:     bool,
    pub base_data_offset:         Option<u64>,
    pub sample_description_index: Option<u32>,
    pub default_sample_duration:  Option<u32>,
    pub default_sample_size:      Option<u32>,
    pub default_sample_flags:     Option<SampleFlags>,
}

impl FromBytes for TrackFragmentHeaderBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<TrackFragmentHeaderBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let flags = stream.flags();

        let track_id = u32::from_bytes(stream)?;

        let duration_is_empty = (flags & 0x010000) > 0;
        let default_base_is_moof = (flags & 0x020000) > 0;

        let base_data_offset = (flags & 0x01 > 0).then_read(|| u64::from_bytes(stream))?;
        let sample_description_index = (flags & 0x02 > 0).then_read(|| u32::from_bytes(stream))?;
        let default_sample_duration = (flags & 0x08 > 0).then_read(|| u32::from_bytes(stream))?;
        let default_sample_size = (flags & 0x10 > 0).then_read(|| u32::from_bytes(stream))?;
        let default_sample_flags = (flags & 0x20 > 0).then_read(|| SampleFlags::from_bytes(stream))?;

        Ok(TrackFragmentHeaderBox {
            track_id,
            duration_is_empty,
            default_base_is_moof,
            base_data_offset,
            sample_description_index,
            default_sample_duration,
            default_sample_size,
            default_sample_flags,
        })
    }

    fn min_size() -> usize {
        8
    }
}

impl ToBytes for TrackFragmentHeaderBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        self.track_id.to_bytes(stream)?;
        self.base_data_offset.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        self.sample_description_index.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        self.default_sample_duration.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        self.default_sample_size.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;
        self.default_sample_flags.as_ref().map_or(Ok(()), |x| x.to_bytes(stream))?;

        stream.finalize()
    }
}

impl BoxInfo for TrackFragmentHeaderBox {
    const FOURCC: &'static str = "tfhd";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("tfhd")
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(0)
    }
}

impl FullBox for TrackFragmentHeaderBox {
    fn version(&self) -> Option<u8> {
        Some(0)
    }
    fn flags(&self) -> u32 {
        self.base_data_offset.is_some() as u32 * 0x01
            | self.sample_description_index.is_some() as u32 * 0x02
            | self.default_sample_duration.is_some() as u32 * 0x08
            | self.default_sample_size.is_some() as u32 * 0x10
            | self.default_sample_flags.is_some() as u32 * 0x20
            | self.duration_is_empty as u32 * 0x010000
            | self.default_base_is_moof as u32 * 0x020000
    }
}

// Small helper: read a value only when its presence bit is set.
pub(crate) trait ThenRead {
    fn then_read<T, F>(self, f: F) -> io::Result<Option<T>>
    where
        F: FnOnce() -> io::Result<T>;
}

impl ThenRead for bool {
    fn then_read<T, F>(self, f: F) -> io::Result<Option<T>>
    where
        F: FnOnce() -> io::Result<T>,
    {
        if self {
            f().map(Some)
        } else {
            Ok(None)
        }
    }
}
