//! # widestream-core
//!
//! Buffered, seekable byte streams over a single native file handle.
//!
//! The crate replaces platform stream facilities that disagree on Unicode
//! pathnames, 64-bit offsets, and read/write interleaving on one handle.
//! No `unsafe` code is permitted at the crate level; the file-descriptor
//! backend in [`native`] is the only exception.

#![deny(unsafe_code)]

pub mod config;
pub mod native;
pub mod offset;
pub mod path;
pub mod stream;

pub use native::{MemFile, NativeFile, Whence};
#[cfg(unix)]
pub use native::FdFile;
pub use offset::OffsetWidth;
pub use path::{NativePath, PathError, narrow, narrow_into, widen, widen_into};
pub use stream::{
    Access, BufferedFileStream, OpenFlags, OpenMode, StreamError, StreamStats, parse_mode,
};
#[cfg(unix)]
pub use stream::FileStream;
