use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.7.3.2 Sample Size Box (ISO/IEC 14496-12:2015(E))
    ///
    /// If all samples have the same size, `size` is non-zero and the
    /// entries table is empty.
    #[derive(Default)]
    SampleSizeBox {
        size:    u32,
        count:   u32,
        entries: ArrayUnsized<u32>,
    },
    fourcc => "stsz",
    version => [0],
    impls => [ boxinfo, debug, fullbox ],
}

impl SampleSizeBox {
    pub fn iter(&self) -> SampleSizeIterator<'_> {
        SampleSizeIterator {
            size:    self.size,
            count:   self.count,
            entries: &self.entries,
            index:   0,
        }
    }

    /// Largest sample size in the table.
    pub fn max_sample_size(&self) -> u32 {
        if self.size > 0 {
            self.size
        } else {
            self.entries.iter().cloned().max().unwrap_or(0)
        }
    }

    /// Sum of all sample sizes.
    pub fn total_size(&self) -> u64 {
        if self.size > 0 {
            self.size as u64 * self.count as u64
        } else {
            self.entries.iter().map(|&s| s as u64).sum()
        }
    }
}

pub struct SampleSizeIterator<'a> {
    size:    u32,
    count:   u32,
    entries: &'a [u32],
    index:   usize,
}

impl<'a> SampleSizeIterator<'a> {
    pub(crate) fn empty() -> SampleSizeIterator<'a> {
        SampleSizeIterator {
            size:    0,
            count:   0,
            entries: &[],
            index:   0,
        }
    }
}

impl<'a> Iterator for SampleSizeIterator<'a> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.index == self.count as usize {
            return None;
        }
        self.index += 1;
        if self.entries.is_empty() {
            Some(self.size)
        } else {
            self.entries.get(self.index - 1).cloned()
        }
    }
}

impl FromBytes for SampleSizeBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<SampleSizeBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let size = u32::from_bytes(stream)?;
        let count = u32::from_bytes(stream)?;

        let mut entries = ArrayUnsized::new();
        if size == 0 {
            while (entries.len() as u32) < count && stream.left() >= 4 {
                entries.push(u32::from_bytes(stream)?);
            }
        }

        Ok(SampleSizeBox { size, count, entries })
    }

    fn min_size() -> usize {
        8
    }
}

impl ToBytes for SampleSizeBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        self.size.to_bytes(stream)?;
        if self.size != 0 {
            self.count.to_bytes(stream)?;
        } else {
            (self.entries.len() as u32).to_bytes(stream)?;
            for e in &self.entries {
                e.to_bytes(stream)?;
            }
        }

        stream.finalize()
    }
}

/// 8.7.3.3 Compact Sample Size Box (ISO/IEC 14496-12:2015(E))
///
/// Read-side alternative to `stsz` with 4, 8 or 16 bits per entry.
#[derive(Clone, Debug, Default)]
pub struct CompactSampleSizeBox {
    pub field_size: u8,
    pub entries:    ArrayUnsized<u32>,
}

impl CompactSampleSizeBox {
    pub fn iter(&self) -> SampleSizeIterator<'_> {
        SampleSizeIterator {
            size:    0,
            count:   self.entries.len() as u32,
            entries: &self.entries,
            index:   0,
        }
    }
}

impl FromBytes for CompactSampleSizeBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<CompactSampleSizeBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        stream.skip(3)?;
        let field_size = u8::from_bytes(stream)?;
        let count = u32::from_bytes(stream)?;
        let mut entries = ArrayUnsized::new();

        match field_size {
            4 => {
                let mut idx = 0;
                while idx < count && stream.left() > 0 {
                    let b = u8::from_bytes(stream)?;
                    entries.push((b >> 4) as u32);
                    idx += 1;
                    if idx < count {
                        entries.push((b & 0x0f) as u32);
                        idx += 1;
                    }
                }
            },
            8 => {
                while (entries.len() as u32) < count && stream.left() > 0 {
                    entries.push(u8::from_bytes(stream)? as u32);
                }
            },
            16 => {
                while (entries.len() as u32) < count && stream.left() >= 2 {
                    entries.push(u16::from_bytes(stream)? as u32);
                }
            },
            sz => return Err(ioerr!(InvalidData, "stz2: bad field_size {}", sz)),
        }

        Ok(CompactSampleSizeBox { field_size, entries })
    }

    fn min_size() -> usize {
        8
    }
}

impl ToBytes for CompactSampleSizeBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        stream.skip(3)?;
        self.field_size.to_bytes(stream)?;
        (self.entries.len() as u32).to_bytes(stream)?;
        match self.field_size {
            4 => {
                let mut iter = self.entries.iter();
                loop {
                    let hi = match iter.next() {
                        Some(&v) => v,
                        None => break,
                    };
                    let lo = iter.next().cloned().unwrap_or(0);
                    ((((hi & 0x0f) << 4) | (lo & 0x0f)) as u8).to_bytes(stream)?;
                }
            },
            8 => {
                for e in &self.entries {
                    (*e as u8).to_bytes(stream)?;
                }
            },
            16 => {
                for e in &self.entries {
                    (*e as u16).to_bytes(stream)?;
                }
            },
            sz => return Err(ioerr!(InvalidData, "stz2: bad field_size {}", sz)),
        }

        stream.finalize()
    }
}

impl BoxInfo for CompactSampleSizeBox {
    const FOURCC: &'static str = "stz2";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("stz2")
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(0)
    }
}

impl FullBox for CompactSampleSizeBox {
    fn version(&self) -> Option<u8> {
        Some(0)
    }
}
