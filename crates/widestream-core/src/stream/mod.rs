//! Buffered stream over a native file handle.

mod buffer;
mod error;
mod file;
mod mode;

pub use buffer::StreamBuffer;
pub use error::StreamError;
#[cfg(unix)]
pub use file::FileStream;
pub use file::{BufferedFileStream, StreamStats};
pub use mode::{Access, OpenFlags, OpenMode, parse_mode};
