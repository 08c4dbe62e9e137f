use std::fmt::Debug;
use std::io;

use crate::boxes::prelude::*;

/// 8.1.2 Free Space Box (ISO/IEC 14496-12:2015(E)), 'free' or 'skip'.
#[derive(Clone, Default)]
pub struct FreeBox {
    fourcc: FourCC,
    pub size: u64,
}
pub type SkipBox = FreeBox;

impl FromBytes for FreeBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<FreeBox> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let size = reader.left();
        reader.skip(size)?;
        Ok(FreeBox { fourcc, size })
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for FreeBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        writer.skip(self.size)?;
        writer.finalize()
    }
}

impl BoxInfo for FreeBox {
    const FOURCC: &'static str = "free";

    #[inline]
    fn fourcc(&self) -> FourCC {
        if self.fourcc == FourCC::default() {
            FourCC::new("free")
        } else {
            self.fourcc
        }
    }
}

impl FullBox for FreeBox {}

impl Debug for FreeBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("FreeBox");
        dbg.field("fourcc", &self.fourcc());
        dbg.field("size", &self.size);
        dbg.finish()
    }
}
