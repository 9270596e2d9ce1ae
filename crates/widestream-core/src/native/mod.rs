//! Native file handles.
//!
//! [`NativeFile`] is the only system-call surface the stream uses: open,
//! read, write, seek, close, plus the offset-width capability. Two backends
//! ship with the crate:
//! - [`FdFile`]: POSIX file descriptors through `libc` (unix only).
//! - [`MemFile`]: an in-memory file whose offset width and failures can be
//!   chosen, for deterministic tests.

#[cfg(unix)]
#[allow(unsafe_code)]
mod fd;
mod mem;

use std::io;

#[cfg(unix)]
pub use fd::FdFile;
pub use mem::MemFile;

use crate::offset::OffsetWidth;
use crate::path::NativePath;
use crate::stream::OpenFlags;

/// Seek origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    Start,
    Current,
    End,
}

/// An exclusively owned native file handle.
///
/// Dropping a handle releases it; [`close`](NativeFile::close) does the same
/// but reports the result.
pub trait NativeFile: Sized {
    /// Open `path` with `flags`.
    fn open(path: &NativePath, flags: &OpenFlags) -> io::Result<Self>;

    /// One read call. `Ok(0)` is end of file.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// One write call; may accept fewer bytes than offered.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Reposition and return the new absolute position.
    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<u64>;

    /// Release the handle.
    fn close(self) -> io::Result<()>;

    /// Offset representation this handle supports.
    fn offset_width(&mut self) -> OffsetWidth;

    /// Write all of `buf`, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
