use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.6.5 Edit Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    EditBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "edts",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// 8.6.6 Edit List Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    EditListBox {
        entries:    ArraySized32<EditListEntry>,
    },
    fourcc => "elst",
    version => [1, entries],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

/// Entry in EditListBox.
///
/// `media_time` of -1 means an empty edit; a positive value shifts
/// the composition timeline of the whole track.
#[derive(Clone, Debug, Default)]
pub struct EditListEntry {
    pub segment_duration: u64,
    pub media_time:       i64,
    pub media_rate:       u16,
    pub media_rate_fraction: u16,
}

impl FromBytes for EditListEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<EditListEntry> {
        let (segment_duration, media_time) = if stream.version() == 1 {
            (u64::from_bytes(stream)?, i64::from_bytes(stream)?)
        } else {
            (
                u32::from_bytes(stream)? as u64,
                i32::from_bytes(stream)? as i64,
            )
        };
        Ok(EditListEntry {
            segment_duration,
            media_time,
            media_rate: u16::from_bytes(stream)?,
            media_rate_fraction: u16::from_bytes(stream)?,
        })
    }
    fn min_size() -> usize {
        12
    }
}

impl ToBytes for EditListEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        if stream.version() == 1 {
            self.segment_duration.to_bytes(stream)?;
            self.media_time.to_bytes(stream)?;
        } else {
            (self.segment_duration as u32).to_bytes(stream)?;
            (self.media_time as i32).to_bytes(stream)?;
        }
        self.media_rate.to_bytes(stream)?;
        self.media_rate_fraction.to_bytes(stream)
    }
}

impl FullBox for EditListEntry {
    fn version(&self) -> Option<u8> {
        if self.segment_duration > u32::MAX as u64
            || self.media_time > i32::MAX as i64
        {
            Some(1)
        } else {
            None
        }
    }
}
