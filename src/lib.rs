//! Read and write ISO BMFF / MP4 containers.
//!
//! The crate parses a whole file (or a streamed init + media segment
//! sequence) into a tree of typed boxes, gives per-track access to the
//! samples described by the sample tables or by movie fragments, and
//! does the reverse: it builds such trees from user-supplied samples
//! and per-track configuration and serializes them as a plain file, a
//! fragmented file, or a series of init + media segments.
//!
//! Reading:
//!
//! ```no_run
//! use bmff::Mp4Reader;
//!
//! fn main() -> std::io::Result<()> {
//!     let reader = Mp4Reader::open("movie.mp4")?;
//!     for info in reader.track_infos() {
//!         println!("{:#?}", info);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Writing starts with a [`MovieConfig`](crate::writer::MovieConfig)
//! and one track config per track, after which samples are pushed
//! through `add_sample` and the file is finalized with `close()`.
//!
#[macro_use]
extern crate log;

#[macro_use]
mod ioerr;
#[macro_use]
#[doc(hidden)]
pub mod macros;
#[macro_use]
pub mod serialize;
#[macro_use]
pub mod types;
mod bitreader;
pub mod boxes;
pub mod debug;
pub mod fragment;
pub mod io;
pub mod mp4box;
pub mod reader;
pub mod sample_info;
pub mod sample_store;
pub mod specific_info;
pub mod track;
pub mod writer;

pub use crate::io::Mp4File;
pub use crate::mp4box::MP4;
pub use crate::reader::Mp4Reader;
