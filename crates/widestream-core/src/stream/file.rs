//! Buffered file stream.
//!
//! One native handle, one buffer, and a region describing what the buffer
//! currently holds:
//! - `Neutral`: nothing; the native position equals `base`.
//! - `Reading { pos, end }`: bytes `pos..end` were fetched but not consumed.
//!   The native position is `base + end`, the logical one `base + pos`.
//! - `Writing { len }`: `len` bytes are staged for the native position `base`.
//!
//! Reading never leaves an exhausted `Reading` region behind: once `pos`
//! reaches `end` the region is retired and `base` moves forward, so
//! `Reading` always implies `pos < end`.

use std::io;
use std::mem;
#[cfg(unix)]
use std::path::Path;

#[cfg(unix)]
use crate::native::FdFile;
use crate::native::{NativeFile, Whence};
use crate::path::NativePath;

use super::buffer::StreamBuffer;
use super::error::StreamError;
use super::mode::{Access, OpenFlags, OpenMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Neutral,
    Reading { pos: usize, end: usize },
    Writing { len: usize },
}

/// Native calls made by one stream since it was opened or attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub native_reads: u64,
    pub native_writes: u64,
    pub native_seeks: u64,
    /// Buffer refills (a subset of `native_reads`).
    pub refills: u64,
    /// Put-region flushes (a subset of `native_writes`).
    pub flushes: u64,
    /// Reads that bypassed the buffer.
    pub direct_reads: u64,
    /// Writes that bypassed the buffer.
    pub direct_writes: u64,
}

impl StreamStats {
    /// Total native reads, writes and seeks.
    #[must_use]
    pub fn native_calls(&self) -> u64 {
        self.native_reads + self.native_writes + self.native_seeks
    }
}

/// Buffered, seekable stream over a single native file handle.
///
/// `'buf` is the lifetime of a caller-supplied buffer, if one is installed
/// with [`with_buffer`](Self::with_buffer) or [`set_buffer`](Self::set_buffer).
#[derive(Debug)]
pub struct BufferedFileStream<'buf, F: NativeFile> {
    handle: Option<F>,
    flags: OpenFlags,
    buffer: StreamBuffer<'buf>,
    region: Region,
    /// Native position of the start of `region`.
    base: u64,
    stats: StreamStats,
}

/// Stream over a POSIX file descriptor.
#[cfg(unix)]
pub type FileStream<'buf> = BufferedFileStream<'buf, FdFile>;

impl<'buf, F: NativeFile> BufferedFileStream<'buf, F> {
    /// Closed stream with a default owned buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_storage(StreamBuffer::default_owned())
    }

    /// Closed stream using `buf` as its buffer.
    #[must_use]
    pub fn with_buffer(buf: &'buf mut [u8]) -> Self {
        Self::with_storage(StreamBuffer::borrowed(buf))
    }

    /// Closed stream with no buffer.
    #[must_use]
    pub fn unbuffered() -> Self {
        Self::with_storage(StreamBuffer::unbuffered())
    }

    fn with_storage(buffer: StreamBuffer<'buf>) -> Self {
        Self {
            handle: None,
            flags: OpenFlags::default(),
            buffer,
            region: Region::Neutral,
            base: 0,
            stats: StreamStats::default(),
        }
    }

    // ---------------------------------------------------------------
    // Open / close
    // ---------------------------------------------------------------

    /// Open `path` with classic mode bits.
    ///
    /// Fails with `AlreadyOpen` before touching the file system when a handle
    /// is already bound, so no file is created or truncated.
    pub fn open(&mut self, path: impl AsRef<[u8]>, mode: OpenMode) -> Result<(), StreamError> {
        if self.handle.is_some() {
            return Err(StreamError::AlreadyOpen);
        }
        let flags = mode.to_flags().ok_or(StreamError::InvalidMode(mode))?;
        self.open_with(path, flags)
    }

    /// Open `path` with resolved flags, e.g. from [`parse_mode`](super::parse_mode).
    pub fn open_with(
        &mut self,
        path: impl AsRef<[u8]>,
        flags: OpenFlags,
    ) -> Result<(), StreamError> {
        if self.handle.is_some() {
            return Err(StreamError::AlreadyOpen);
        }
        let raw = path.as_ref();
        let native = NativePath::encode(raw).map_err(|e| StreamError::OpenFailed {
            path: String::from_utf8_lossy(raw).into_owned(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;
        self.open_native(&native, flags)
    }

    /// Open a platform path.
    #[cfg(unix)]
    pub fn open_path(&mut self, path: &Path, mode: OpenMode) -> Result<(), StreamError> {
        if self.handle.is_some() {
            return Err(StreamError::AlreadyOpen);
        }
        let flags = mode.to_flags().ok_or(StreamError::InvalidMode(mode))?;
        let native = NativePath::from_path(path).map_err(|e| StreamError::OpenFailed {
            path: path.display().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;
        self.open_native(&native, flags)
    }

    fn open_native(&mut self, path: &NativePath, flags: OpenFlags) -> Result<(), StreamError> {
        if flags.access().is_none() {
            return Err(StreamError::OpenFailed {
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "neither readable nor writable"),
            });
        }
        let handle = F::open(path, &flags).map_err(|source| StreamError::OpenFailed {
            path: path.to_string(),
            source,
        })?;
        self.attach(handle, flags)
    }

    /// Bind an already-open native handle.
    ///
    /// On an open stream this fails with `AlreadyOpen` and `handle` is
    /// dropped, which releases it. The same happens when the handle cannot
    /// report its position; an unseekable handle starts at 0.
    pub fn attach(&mut self, mut handle: F, flags: OpenFlags) -> Result<(), StreamError> {
        if self.handle.is_some() {
            return Err(StreamError::AlreadyOpen);
        }
        let whence = if flags.append {
            Whence::End
        } else {
            Whence::Current
        };
        self.base = match handle.seek(0, whence) {
            Ok(pos) => pos,
            // Pipes and terminals have no position.
            Err(e) if e.kind() == io::ErrorKind::NotSeekable => 0,
            Err(e) => return Err(e.into()),
        };
        self.handle = Some(handle);
        self.flags = flags;
        self.region = Region::Neutral;
        self.stats = StreamStats::default();
        Ok(())
    }

    /// Flush pending output and release the handle.
    ///
    /// The stream is closed on return even when the flush or the native close
    /// fails; the first failure is reported. A borrowed buffer is released
    /// and replaced by a default owned one.
    pub fn close(&mut self) -> Result<(), StreamError> {
        if self.handle.is_none() {
            return Err(StreamError::NotOpen);
        }
        let flushed = self.flush_put();
        let closed = match self.handle.take() {
            Some(handle) => handle.close().map_err(StreamError::from),
            None => Ok(()),
        };
        self.region = Region::Neutral;
        self.base = 0;
        self.flags = OpenFlags::default();
        self.buffer.release_borrowed();
        flushed.and(closed)
    }

    // ---------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------

    /// Next byte without consuming it, or `None` at end of file.
    pub fn peek_byte(&mut self) -> Result<Option<u8>, StreamError> {
        self.begin_read()?;
        if self.region == Region::Neutral && !self.underflow()? {
            return Ok(None);
        }
        match self.region {
            Region::Reading { pos, .. } => Ok(Some(self.buffer.read_area()[pos])),
            _ => Ok(None),
        }
    }

    /// Consume one byte, or `None` at end of file.
    pub fn read_byte(&mut self) -> Result<Option<u8>, StreamError> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.consume(1);
        }
        Ok(byte)
    }

    /// Fill `dest` as far as the file allows.
    ///
    /// A short count means end of file, or a native failure after some bytes
    /// were already transferred; in the latter case the next call reports it.
    pub fn read_block(&mut self, dest: &mut [u8]) -> Result<usize, StreamError> {
        self.begin_read()?;
        let mut done = 0;
        while done < dest.len() {
            if let Region::Reading { pos, end } = self.region {
                let n = (end - pos).min(dest.len() - done);
                dest[done..done + n].copy_from_slice(&self.buffer.read_area()[pos..pos + n]);
                self.consume(n);
                done += n;
                continue;
            }
            let step = if dest.len() - done >= self.buffer.capacity().max(1) {
                match self.read_direct(&mut dest[done..]) {
                    Ok(n) => {
                        done += n;
                        Ok(n > 0)
                    }
                    Err(e) => Err(e),
                }
            } else {
                self.underflow()
            };
            match step {
                Ok(true) => {}
                Ok(false) => break,
                // Delivered bytes are reported; the failure repeats on the next call.
                Err(_) if done > 0 => break,
                Err(e) => return Err(e),
            }
        }
        Ok(done)
    }

    fn begin_read(&mut self) -> Result<(), StreamError> {
        if self.handle.is_none() {
            return Err(StreamError::NotOpen);
        }
        if !self.flags.readable {
            return Err(StreamError::NotReadable);
        }
        self.flush_put()
    }

    /// Refill from the handle. `Ok(false)` is end of file.
    fn underflow(&mut self) -> Result<bool, StreamError> {
        self.flush_put()?;
        let handle = self.handle.as_mut().ok_or(StreamError::NotOpen)?;
        self.stats.native_reads += 1;
        self.stats.refills += 1;
        self.region = Region::Neutral;
        let n = handle.read(self.buffer.read_area_mut())?;
        if n == 0 {
            return Ok(false);
        }
        self.region = Region::Reading { pos: 0, end: n };
        Ok(true)
    }

    fn read_direct(&mut self, dest: &mut [u8]) -> Result<usize, StreamError> {
        let handle = self.handle.as_mut().ok_or(StreamError::NotOpen)?;
        self.stats.native_reads += 1;
        self.stats.direct_reads += 1;
        let n = handle.read(dest)?;
        self.base += n as u64;
        Ok(n)
    }

    fn consume(&mut self, n: usize) {
        if let Region::Reading { pos, end } = self.region {
            let pos = pos + n;
            if pos >= end {
                self.base += end as u64;
                self.region = Region::Neutral;
            } else {
                self.region = Region::Reading { pos, end };
            }
        }
    }

    /// Drop unread look-ahead and move the native position back to the
    /// logical one. The region survives a failed seek.
    fn stop_reading(&mut self) -> Result<(), StreamError> {
        let Region::Reading { pos, end } = self.region else {
            return Ok(());
        };
        let handle = self.handle.as_mut().ok_or(StreamError::NotOpen)?;
        self.stats.native_seeks += 1;
        // Buffers never exceed isize::MAX bytes.
        let back = (end - pos) as i64;
        self.base = handle.seek(-back, Whence::Current)?;
        self.region = Region::Neutral;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Writing
    // ---------------------------------------------------------------

    /// Write one byte.
    pub fn write_byte(&mut self, byte: u8) -> Result<(), StreamError> {
        self.begin_write()?;
        let cap = self.buffer.capacity();
        if cap == 0 {
            return self.write_direct(&[byte]);
        }
        let mut len = self.staged();
        if len == cap {
            self.flush_put()?;
            len = 0;
        }
        self.buffer.write_area_mut()[len] = byte;
        self.region = Region::Writing { len: len + 1 };
        Ok(())
    }

    /// Write all of `src`; returns `src.len()`.
    pub fn write_block(&mut self, src: &[u8]) -> Result<usize, StreamError> {
        self.begin_write()?;
        let cap = self.buffer.capacity();
        let mut rest = src;
        while !rest.is_empty() {
            let len = self.staged();
            if len + rest.len() > cap && rest.len() >= cap {
                self.flush_put()?;
                self.write_direct(rest)?;
                break;
            }
            if len == cap {
                self.flush_put()?;
                continue;
            }
            let n = (cap - len).min(rest.len());
            self.buffer.write_area_mut()[len..len + n].copy_from_slice(&rest[..n]);
            self.region = Region::Writing { len: len + n };
            rest = &rest[n..];
        }
        Ok(src.len())
    }

    fn begin_write(&mut self) -> Result<(), StreamError> {
        if self.handle.is_none() {
            return Err(StreamError::NotOpen);
        }
        if !self.flags.writable {
            return Err(StreamError::NotWritable);
        }
        self.stop_reading()
    }

    fn staged(&self) -> usize {
        match self.region {
            Region::Writing { len } => len,
            _ => 0,
        }
    }

    fn write_direct(&mut self, src: &[u8]) -> Result<(), StreamError> {
        let handle = self.handle.as_mut().ok_or(StreamError::NotOpen)?;
        self.stats.native_writes += 1;
        self.stats.direct_writes += 1;
        if let Err(e) = handle.write_all(src) {
            self.resync_base();
            return Err(e.into());
        }
        self.advance_written(src.len());
        Ok(())
    }

    /// Write out the put region.
    ///
    /// On failure the bytes the handle did not take stay staged, moved to the
    /// front of the buffer, so a later sync or close can retry them.
    fn flush_put(&mut self) -> Result<(), StreamError> {
        let Region::Writing { len } = self.region else {
            return Ok(());
        };
        let handle = self.handle.as_mut().ok_or(StreamError::NotOpen)?;
        self.stats.native_writes += 1;
        self.stats.flushes += 1;
        let mut written = 0;
        let mut failure = None;
        while written < len {
            match handle.write(&self.buffer.pending(len)[written..]) {
                Ok(0) => {
                    failure = Some(io::Error::from(io::ErrorKind::WriteZero));
                    break;
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if written > 0 {
            self.advance_written(written);
        }
        match failure {
            None => {
                self.region = Region::Neutral;
                Ok(())
            }
            Some(e) => {
                self.buffer.write_area_mut().copy_within(written..len, 0);
                self.region = Region::Writing {
                    len: len - written,
                };
                Err(e.into())
            }
        }
    }

    fn advance_written(&mut self, n: usize) {
        if self.flags.append {
            // The handle wrote at end of file, wherever that was.
            self.resync_base();
        } else {
            self.base += n as u64;
        }
    }

    fn resync_base(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            self.stats.native_seeks += 1;
            if let Ok(pos) = handle.seek(0, Whence::Current) {
                self.base = pos;
            }
        }
    }

    // ---------------------------------------------------------------
    // Positioning
    // ---------------------------------------------------------------

    /// Flush pending output, or rewind the handle over unread look-ahead.
    pub fn sync(&mut self) -> Result<(), StreamError> {
        if self.handle.is_none() {
            return Err(StreamError::NotOpen);
        }
        match self.region {
            Region::Neutral => Ok(()),
            Region::Reading { .. } => self.stop_reading(),
            Region::Writing { .. } => self.flush_put(),
        }
    }

    /// Logical position. Same as `seek(0, Whence::Current)`.
    pub fn position(&mut self) -> Result<u64, StreamError> {
        if self.handle.is_none() {
            return Err(StreamError::NotOpen);
        }
        match self.region {
            Region::Neutral => Ok(self.base),
            Region::Reading { pos, .. } => Ok(self.base + pos as u64),
            Region::Writing { len } if !self.flags.append => Ok(self.base + len as u64),
            Region::Writing { .. } => {
                self.flush_put()?;
                Ok(self.base)
            }
        }
    }

    /// Reposition and return the new logical position.
    ///
    /// `seek(0, Whence::Current)` only reports the position: buffered
    /// look-ahead survives and no native call is made unless append-mode
    /// output must be flushed to learn where it landed. Targets that are
    /// negative or unrepresentable by the handle's offset width fail with
    /// `SeekOutOfRange` and leave the stream untouched.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, StreamError> {
        if whence == Whence::Current && offset == 0 {
            return self.position();
        }
        let width = match self.handle.as_mut() {
            Some(handle) => handle.offset_width(),
            None => return Err(StreamError::NotOpen),
        };

        let target = match whence {
            Whence::Start => Some(i128::from(offset)),
            Whence::Current => Some(i128::from(self.position()?) + i128::from(offset)),
            Whence::End => None,
        };
        if let Some(t) = target {
            let representable = u64::try_from(t)
                .map(|pos| width.contains(pos))
                .unwrap_or(false);
            if !representable {
                return Err(StreamError::SeekOutOfRange { target: t });
            }
        }

        self.sync()?;
        let handle = self.handle.as_mut().ok_or(StreamError::NotOpen)?;
        self.stats.native_seeks += 1;
        let landed = match target {
            // Range-checked above.
            Some(t) => handle.seek(t as i64, Whence::Start)?,
            None => handle.seek(offset, Whence::End)?,
        };
        if !width.contains(landed) {
            let restore = self.base as i64;
            self.stats.native_seeks += 1;
            handle.seek(restore, Whence::Start)?;
            return Err(StreamError::SeekOutOfRange {
                target: i128::from(landed),
            });
        }
        self.base = landed;
        Ok(landed)
    }

    // ---------------------------------------------------------------
    // Ownership and buffer configuration
    // ---------------------------------------------------------------

    /// Exchange the complete state of two streams. No native call is made.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Install caller storage as the buffer. Pending data is synced first.
    pub fn set_buffer(&mut self, buf: &'buf mut [u8]) -> Result<(), StreamError> {
        self.settle()?;
        self.buffer = StreamBuffer::borrowed(buf);
        Ok(())
    }

    /// Switch to unbuffered operation. Pending data is synced first.
    pub fn set_unbuffered(&mut self) -> Result<(), StreamError> {
        self.settle()?;
        self.buffer = StreamBuffer::unbuffered();
        Ok(())
    }

    /// Switch to an owned buffer of `capacity` bytes. Pending data is synced
    /// first.
    pub fn set_buffer_capacity(&mut self, capacity: usize) -> Result<(), StreamError> {
        self.settle()?;
        self.buffer = StreamBuffer::owned(capacity);
        Ok(())
    }

    fn settle(&mut self) -> Result<(), StreamError> {
        if self.region == Region::Neutral {
            return Ok(());
        }
        self.sync().map_err(|e| StreamError::InvalidTransition {
            source: Box::new(e),
        })
    }

    // ---------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Flags of the current session; all false when closed.
    #[must_use]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    #[must_use]
    pub fn access(&self) -> Option<Access> {
        self.handle.as_ref().and(self.flags.access())
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.flags.binary
    }

    #[must_use]
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    #[must_use]
    pub fn owns_buffer(&self) -> bool {
        self.buffer.is_owned()
    }

    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.stats
    }
}

impl<F: NativeFile> Default for BufferedFileStream<'_, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: NativeFile> Drop for BufferedFileStream<'_, F> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.close();
        }
    }
}

impl<F: NativeFile> io::Read for BufferedFileStream<'_, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_block(buf)?)
    }
}

impl<F: NativeFile> io::Write for BufferedFileStream<'_, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_block(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.sync()?)
    }
}

impl<F: NativeFile> io::Seek for BufferedFileStream<'_, F> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(n) => {
                let n = i64::try_from(n).map_err(|_| StreamError::SeekOutOfRange {
                    target: i128::from(n),
                })?;
                (n, Whence::Start)
            }
            io::SeekFrom::Current(n) => (n, Whence::Current),
            io::SeekFrom::End(n) => (n, Whence::End),
        };
        Ok(BufferedFileStream::seek(self, offset, whence)?)
    }
}
