//! Box primitives: headers, the reader/writer for one box, the
//! Unknown/Invalid sentinels, the fourcc registry, and the `MP4`
//! top-level container.
//!
use std::collections::HashMap;
use std::convert::TryInto;
use std::fmt::Debug;
use std::io;

use once_cell::sync::Lazy;

use crate::boxes::{MP4Box, MovieBox};
use crate::serialize::{BoxBytes, FromBytes, ReadBytes, ToBytes, WriteBytes};
use crate::types::FourCC;

/// Gets implemented for every box.
pub trait BoxInfo {
    /// The "fourcc" name of this box.
    const FOURCC: &'static str = "";

    fn fourcc(&self) -> FourCC;

    /// Highest FullBox version the parser understands, `None` for
    /// boxes without a version/flags header.
    fn max_version() -> Option<u8>
    where
        Self: Sized,
    {
        None
    }
}

/// Version and flags of a FullBox.
///
/// Boxes that are not a FullBox use the default implementation.
pub trait FullBox {
    fn version(&self) -> Option<u8> {
        None
    }
    fn flags(&self) -> u32 {
        0
    }
}

/// What the registry knows about a fourcc.
#[derive(Debug, Clone, Copy)]
pub struct BoxSpec {
    pub max_version: Option<u8>,
    pub container:   bool,
}

static REGISTRY: Lazy<HashMap<FourCC, BoxSpec>> = Lazy::new(crate::boxes::build_registry);

/// Look up a fourcc in the process-wide box registry.
pub fn registered(fourcc: FourCC) -> Option<&'static BoxSpec> {
    REGISTRY.get(&fourcc)
}

pub(crate) fn max_version_of(fourcc: FourCC) -> Option<u8> {
    registered(fourcc).and_then(|spec| spec.max_version)
}

/// The header of one box, as peeked from the stream.
#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub fourcc:      FourCC,
    pub version:     Option<u8>,
    pub flags:       u32,
    pub max_version: Option<u8>,
    /// Box had a 64-bit size field.
    pub large:       bool,
    /// Box size 0, runs to the end of the input.
    pub to_eof:      bool,
    /// Length of the header including version/flags if present.
    pub header_len:  u64,
    /// Payload size (box size minus header_len).
    pub payload:     u64,
}

impl BoxHeader {
    /// Peek at the next box header without consuming it.
    pub fn peek<R: ReadBytes>(stream: &mut R) -> io::Result<BoxHeader> {
        let left = stream.left();
        if left < 8 {
            return Err(ioerr!(UnexpectedEof, "short box header"));
        }
        let data = stream.peek(8)?;
        let size1 = u32::from_be_bytes(data[0..4].try_into().unwrap());
        let fourcc = FourCC::from(&data[4..8]);

        let mut header_len = 8u64;
        let mut large = false;
        let mut to_eof = false;
        let total = match size1 {
            0 => {
                to_eof = true;
                left
            },
            1 => {
                if left < 16 {
                    return Err(ioerr!(UnexpectedEof, "short box header"));
                }
                let data = stream.peek(16)?;
                large = true;
                header_len = 16;
                u64::from_be_bytes(data[8..16].try_into().unwrap())
            },
            x => x as u64,
        };

        let max_version = max_version_of(fourcc);
        let mut version = None;
        let mut flags = 0;
        if max_version.is_some() && left >= header_len + 4 && total >= header_len + 4 {
            let data = stream.peek(header_len + 4)?;
            let h = header_len as usize;
            let vf = u32::from_be_bytes(data[h..h + 4].try_into().unwrap());
            version = Some((vf >> 24) as u8);
            flags = vf & 0x00ffffff;
            header_len += 4;
        }

        let payload = total.saturating_sub(header_len);
        Ok(BoxHeader {
            fourcc,
            version,
            flags,
            max_version,
            large,
            to_eof,
            header_len,
            payload,
        })
    }
}

/// Reads one box: consumes the header, then acts as a size-limited
/// stream over the payload. Leftover payload is skipped on drop.
pub struct BoxReader<'a> {
    pub header: BoxHeader,
    maxsize:    u64,
    // Box it, since a BoxReader might contain a BoxReader.
    inner:      Box<dyn ReadBytes + 'a>,
}

impl<'a> BoxReader<'a> {
    /// Read the box header, then return a size-limited reader.
    pub fn new(stream: &'a mut impl ReadBytes) -> io::Result<BoxReader<'a>> {
        let header = BoxHeader::peek(stream)?;
        stream.skip(header.header_len)?;

        let mut maxsize = stream.pos() + header.payload;
        if maxsize > stream.size() {
            warn!(
                "{}: truncated box: {} bytes declared, {} available",
                header.fourcc,
                header.payload,
                stream.size() - stream.pos()
            );
            maxsize = stream.size();
        }
        trace!(
            "BoxReader::new: {} payload {} at {}",
            header.fourcc,
            header.payload,
            stream.pos()
        );
        Ok(BoxReader {
            header,
            maxsize,
            inner: Box::new(stream),
        })
    }
}

impl<'a> Drop for BoxReader<'a> {
    fn drop(&mut self) {
        let pos = self.inner.pos();
        if pos < self.maxsize {
            trace!(
                "BoxReader {} drop: skipping {}",
                self.header.fourcc,
                self.maxsize - pos
            );
            let _ = self.inner.skip(self.maxsize - pos);
        }
    }
}

impl<'a> ReadBytes for BoxReader<'a> {
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = if amount == 0 { self.left() } else { amount };
        if amount == 0 {
            return Ok(b"");
        }
        if self.inner.pos() + amount > self.maxsize {
            return Err(ioerr!(UnexpectedEof, "{}: read past end of box", self.header.fourcc));
        }
        self.inner.read(amount)
    }
    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        if self.inner.pos() + amount > self.maxsize {
            return Err(ioerr!(UnexpectedEof, "{}: peek past end of box", self.header.fourcc));
        }
        self.inner.peek(amount)
    }
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.inner.pos() + amount > self.maxsize {
            return Err(ioerr!(UnexpectedEof, "{}: skip past end of box", self.header.fourcc));
        }
        self.inner.skip(amount)
    }
    fn left(&mut self) -> u64 {
        let pos = self.inner.pos();
        if pos > self.maxsize {
            0
        } else {
            self.maxsize - pos
        }
    }
}

impl<'a> BoxBytes for BoxReader<'a> {
    fn pos(&mut self) -> u64 {
        self.inner.pos()
    }
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.maxsize {
            return Err(ioerr!(UnexpectedEof, "{}: seek past end of box", self.header.fourcc));
        }
        self.inner.seek(pos)
    }
    fn size(&self) -> u64 {
        self.maxsize
    }
    fn version(&self) -> u8 {
        self.header.version.unwrap_or(0)
    }
    fn flags(&self) -> u32 {
        self.header.flags
    }
    fn fourcc(&self) -> FourCC {
        self.header.fourcc
    }
}

/// Writes one box: writes a provisional header, then the payload; the
/// size field is patched when the writer is finalized.
pub struct BoxWriter<'a> {
    offset:    u64,
    version:   u8,
    flags:     u32,
    fourcc:    FourCC,
    inner:     Box<dyn WriteBytes + 'a>,
    finalized: bool,
}

impl<'a> BoxWriter<'a> {
    pub fn new<B>(mut stream: impl WriteBytes + 'a, b: &B) -> io::Result<BoxWriter<'a>>
    where
        B: BoxInfo + FullBox,
    {
        let offset = stream.pos();
        0u32.to_bytes(&mut stream)?;
        let fourcc = b.fourcc();
        fourcc.to_bytes(&mut stream)?;
        let version = b.version();
        let flags = b.flags();
        if let Some(version) = version {
            let vf = ((version as u32) << 24) | (flags & 0x00ffffff);
            vf.to_bytes(&mut stream)?;
        }
        Ok(BoxWriter {
            offset,
            version: version.unwrap_or(0),
            flags,
            fourcc,
            inner: Box::new(stream),
            finalized: false,
        })
    }

    /// Patch the box size into the provisional header.
    ///
    /// If you don't call this explicitly, it is done when the
    /// BoxWriter is dropped; errors are then only logged.
    pub fn finalize(&mut self) -> io::Result<()> {
        self.finalized = true;
        let pos = self.inner.pos();
        self.inner.seek(self.offset)?;
        let sz = (pos - self.offset) as u32;
        sz.to_bytes(&mut self.inner)?;
        self.inner.seek(pos)?;
        Ok(())
    }
}

impl<'a> Drop for BoxWriter<'a> {
    fn drop(&mut self) {
        if !self.finalized {
            if let Err(e) = self.finalize() {
                error!("BoxWriter {}: drop: finalize: {}", self.fourcc, e);
            }
        }
    }
}

impl<'a> WriteBytes for BoxWriter<'a> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write(data)
    }
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        self.inner.skip(amount)
    }
}

impl<'a> BoxBytes for BoxWriter<'a> {
    fn pos(&mut self) -> u64 {
        self.inner.pos()
    }
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.inner.seek(pos)
    }
    fn size(&self) -> u64 {
        self.inner.size()
    }
    fn version(&self) -> u8 {
        self.version
    }
    fn flags(&self) -> u32 {
        self.flags
    }
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
}

// Read a whole box verbatim: raw header bytes plus payload bytes.
fn read_raw_box<R: ReadBytes>(stream: &mut R) -> io::Result<(FourCC, Vec<u8>, Vec<u8>)> {
    let header = BoxHeader::peek(stream)?;
    // The raw basic header, without any version/flags interpretation.
    let basic_len = if header.large { 16 } else { 8 };
    let raw_header = stream.read(basic_len)?.to_vec();
    let mut todo = header.payload + (header.header_len - basic_len);
    let left = stream.left();
    if todo > left {
        warn!("{}: truncated box, keeping {} of {} bytes", header.fourcc, left, todo);
        todo = left;
    }
    let mut data = Vec::new();
    while todo > 0 {
        let chunk = std::cmp::min(todo, 128 * 1024);
        data.extend_from_slice(stream.read(chunk)?);
        todo -= chunk;
    }
    Ok((header.fourcc, raw_header, data))
}

/// Any unknown box we encounter is put into a GenericBox.
///
/// The bytes are retained verbatim so that re-serialization is
/// byte-exact.
#[derive(Clone)]
pub struct GenericBox {
    fourcc: FourCC,
    header: Vec<u8>,
    data:   Vec<u8>,
}

impl FromBytes for GenericBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<GenericBox> {
        let (fourcc, header, data) = read_raw_box(stream)?;
        Ok(GenericBox { fourcc, header, data })
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for GenericBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        stream.write(&self.header)?;
        stream.write(&self.data)
    }
}

impl BoxInfo for GenericBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
}

impl FullBox for GenericBox {}

struct U8Array(usize);

impl Debug for U8Array {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[u8; {}]", &self.0)
    }
}

impl Debug for GenericBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("GenericBox");
        dbg.field("fourcc", &self.fourcc);
        dbg.field("data", &U8Array(self.data.len()));
        dbg.finish()
    }
}

/// A box whose registered parser failed.
///
/// The bytes are retained verbatim from the start of the box, the
/// error is kept for inspection, and parsing continues at the next
/// sibling.
#[derive(Clone)]
pub struct InvalidBox {
    fourcc: FourCC,
    header: Vec<u8>,
    data:   Vec<u8>,
    error:  String,
}

impl InvalidBox {
    pub(crate) fn read<R: ReadBytes>(stream: &mut R, error: &io::Error) -> io::Result<InvalidBox> {
        let (fourcc, header, data) = read_raw_box(stream)?;
        Ok(InvalidBox {
            fourcc,
            header,
            data,
            error: error.to_string(),
        })
    }

    pub fn error(&self) -> &str {
        &self.error
    }
}

impl FromBytes for InvalidBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<InvalidBox> {
        InvalidBox::read(stream, &ioerr!(InvalidData, "invalid box"))
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for InvalidBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        stream.write(&self.header)?;
        stream.write(&self.data)
    }
}

impl BoxInfo for InvalidBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
}

impl FullBox for InvalidBox {}

impl Debug for InvalidBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("InvalidBox");
        dbg.field("fourcc", &self.fourcc);
        dbg.field("data", &U8Array(self.data.len()));
        dbg.field("error", &self.error);
        dbg.finish()
    }
}

/// Read a collection of boxes from a stream.
pub fn read_boxes<R: ReadBytes>(mut file: R) -> io::Result<Vec<MP4Box>> {
    let mut boxes = Vec::new();
    while file.left() >= 8 {
        let b = MP4Box::from_bytes(&mut file)?;
        boxes.push(b);
    }
    if file.left() > 0 {
        warn!("{} trailing bytes ignored", file.left());
    }
    Ok(boxes)
}

/// The top-level of a parsed file: an ordered list of boxes.
#[derive(Clone, Default)]
pub struct MP4 {
    pub boxes: Vec<MP4Box>,
}

impl MP4 {
    /// Read the whole file, `mdat` payload included.
    pub fn read<R: ReadBytes>(file: &mut R) -> io::Result<MP4> {
        crate::boxes::set_mdat_skip(false);
        let boxes = read_boxes(file)?;
        Ok(MP4 { boxes })
    }

    /// Read the box structure but skip over `mdat` payload. The
    /// payload position in the input is recorded instead, so that
    /// sample data can be read through `ReadAt` later.
    pub fn read_skip_mdat<R: ReadBytes>(file: &mut R) -> io::Result<MP4> {
        crate::boxes::set_mdat_skip(true);
        let r = read_boxes(file);
        crate::boxes::set_mdat_skip(false);
        Ok(MP4 { boxes: r? })
    }

    /// Serialize the whole tree.
    pub fn write<W: WriteBytes>(&self, mut file: W) -> io::Result<()> {
        self.boxes.to_bytes(&mut file)
    }

    /// Number of bytes the serialization produces.
    pub fn size(&self) -> u64 {
        self.boxes.iter().map(|b| b.size()).sum()
    }

    /// Get a reference to the MovieBox.
    pub fn movie(&self) -> &MovieBox {
        first_box!(&self.boxes, MovieBox).expect("no moov box")
    }

    /// Get an optional reference to the MovieBox.
    pub fn movie_opt(&self) -> Option<&MovieBox> {
        first_box!(&self.boxes, MovieBox)
    }

    pub fn movie_mut(&mut self) -> &mut MovieBox {
        first_box_mut!(&mut self.boxes, MovieBox).expect("no moov box")
    }
}

impl Debug for MP4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_list().entries(self.boxes.iter()).finish()
    }
}
