use std::cell::Cell;
use std::fmt::Debug;
use std::io;

use crate::boxes::prelude::*;

thread_local! {
    static SKIP_MDAT: Cell<bool> = Cell::new(false);
}

// Parse-time mode switch: skip over mdat payload (recording its
// position) instead of loading it into memory.
pub(crate) fn set_mdat_skip(on: bool) {
    SKIP_MDAT.with(|skip| skip.set(on));
}

/// 8.1.1 Media Data Box (ISO/IEC 14496-12:2015(E))
///
/// When parsed with `MP4::read` the payload is held in `data`. When
/// parsed with `MP4::read_skip_mdat` only the payload position in the
/// input is recorded, so huge files can be opened without loading the
/// sample data.
#[derive(Clone, Default)]
pub struct MediaDataBox {
    /// Payload position in the input: (offset, size).
    pub location: Option<(u64, u64)>,
    pub data:     Data,
}

impl MediaDataBox {
    /// Size of the payload.
    pub fn payload_size(&self) -> u64 {
        match self.location {
            Some((_, size)) => size,
            None => self.data.len() as u64,
        }
    }

    /// Size of the mdat header in front of the payload.
    pub fn header_size(&self) -> u64 {
        if self.payload_size() + 8 > u32::MAX as u64 {
            16
        } else {
            8
        }
    }

    /// Write just the box header; the caller streams the payload.
    pub fn write_header<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let payload = self.payload_size();
        if payload + 8 > u32::MAX as u64 {
            1u32.to_bytes(stream)?;
            FourCC::new("mdat").to_bytes(stream)?;
            (payload + 16).to_bytes(stream)?;
        } else {
            ((payload + 8) as u32).to_bytes(stream)?;
            FourCC::new("mdat").to_bytes(stream)?;
        }
        Ok(())
    }
}

impl FromBytes for MediaDataBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MediaDataBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let size = stream.left();
        let pos = stream.pos();
        if SKIP_MDAT.with(|skip| skip.get()) {
            stream.skip(size)?;
            Ok(MediaDataBox {
                location: Some((pos, size)),
                data:     Data::default(),
            })
        } else {
            let data = Data::from_bytes(stream)?;
            Ok(MediaDataBox {
                location: Some((pos, size)),
                data,
            })
        }
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for MediaDataBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        self.write_header(stream)?;
        if self.data.len() as u64 == self.payload_size() {
            self.data.to_bytes(stream)
        } else {
            // Payload was not loaded. Hold the space.
            debug!("MediaDataBox: writing placeholder for unloaded payload");
            stream.skip(self.payload_size())
        }
    }
}

impl BoxInfo for MediaDataBox {
    const FOURCC: &'static str = "mdat";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("mdat")
    }
}

impl FullBox for MediaDataBox {}

impl Debug for MediaDataBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("MediaDataBox");
        dbg.field("fourcc", &self.fourcc());
        dbg.field("size", &self.payload_size());
        if let Some((pos, _)) = self.location {
            dbg.field("offset", &pos);
        }
        dbg.finish()
    }
}
