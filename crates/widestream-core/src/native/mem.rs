//! In-memory native file.
//!
//! Clones share the same contents, so a test can keep one handle to inspect
//! what a stream wrote through another.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use super::{NativeFile, Whence};
use crate::offset::OffsetWidth;
use crate::path::NativePath;
use crate::stream::OpenFlags;

#[derive(Debug)]
struct MemState {
    data: Vec<u8>,
    pos: u64,
    width: OffsetWidth,
    append: bool,
    fail_reads: bool,
    fail_writes: bool,
    fail_seeks: bool,
    /// Seeks fail the way they do on a pipe.
    unseekable: bool,
    /// Cap on bytes accepted per write call, to exercise short writes.
    write_chunk: Option<usize>,
}

/// Shared in-memory file with a configurable offset width and fault injection.
#[derive(Debug, Clone)]
pub struct MemFile {
    state: Rc<RefCell<MemState>>,
}

impl MemFile {
    /// Empty wide-offset file positioned at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(Vec::new())
    }

    /// File with initial contents, positioned at 0.
    #[must_use]
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        Self {
            state: Rc::new(RefCell::new(MemState {
                data: data.into(),
                pos: 0,
                width: OffsetWidth::Wide,
                append: false,
                fail_reads: false,
                fail_writes: false,
                fail_seeks: false,
                unseekable: false,
                write_chunk: None,
            })),
        }
    }

    /// Restrict offsets to the narrow range.
    #[must_use]
    pub fn narrow(self) -> Self {
        self.state.borrow_mut().width = OffsetWidth::Narrow;
        self
    }

    /// Route every write to the end of the file.
    #[must_use]
    pub fn append_only(self) -> Self {
        self.state.borrow_mut().append = true;
        self
    }

    /// Reject every seek with `NotSeekable`, like a pipe.
    #[must_use]
    pub fn unseekable(self) -> Self {
        self.state.borrow_mut().unseekable = true;
        self
    }

    /// Accept at most `n` bytes per write call.
    #[must_use]
    pub fn short_writes(self, n: usize) -> Self {
        self.state.borrow_mut().write_chunk = Some(n.max(1));
        self
    }

    /// Snapshot of the current contents.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.state.borrow().data.clone()
    }

    /// Current native position.
    #[must_use]
    pub fn native_position(&self) -> u64 {
        self.state.borrow().pos
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    pub fn set_fail_seeks(&self, fail: bool) {
        self.state.borrow_mut().fail_seeks = fail;
    }
}

impl Default for MemFile {
    fn default() -> Self {
        Self::new()
    }
}

fn injected(op: &str) -> io::Error {
    io::Error::other(format!("injected {op} failure"))
}

impl NativeFile for MemFile {
    fn open(path: &NativePath, _flags: &OpenFlags) -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("memory files have no namespace: {path}"),
        ))
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut st = self.state.borrow_mut();
        if st.fail_reads {
            return Err(injected("read"));
        }
        let len = st.data.len() as u64;
        if st.pos >= len {
            return Ok(0);
        }
        let start = st.pos as usize;
        let n = buf.len().min(st.data.len() - start);
        buf[..n].copy_from_slice(&st.data[start..start + n]);
        st.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut st = self.state.borrow_mut();
        if st.fail_writes {
            return Err(injected("write"));
        }
        if st.append {
            st.pos = st.data.len() as u64;
        }
        let n = st.write_chunk.map_or(buf.len(), |c| c.min(buf.len()));
        let end = st.pos + n as u64;
        if !st.width.contains(end) {
            return Err(io::Error::new(
                io::ErrorKind::FileTooLarge,
                "write past the offset limit",
            ));
        }
        let start = st.pos as usize;
        let end = end as usize;
        if st.data.len() < end {
            st.data.resize(end, 0);
        }
        st.data[start..end].copy_from_slice(&buf[..n]);
        st.pos = end as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<u64> {
        let mut st = self.state.borrow_mut();
        if st.fail_seeks {
            return Err(injected("seek"));
        }
        if st.unseekable {
            return Err(io::Error::from(io::ErrorKind::NotSeekable));
        }
        let origin = match whence {
            Whence::Start => 0,
            Whence::Current => i128::from(st.pos),
            Whence::End => st.data.len() as i128,
        };
        let target = origin + i128::from(offset);
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of file",
            ));
        }
        let target = target as u64;
        if target > i64::MAX as u64 || !st.width.contains(target) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek past the offset limit",
            ));
        }
        st.pos = target;
        Ok(target)
    }

    fn close(self) -> io::Result<()> {
        Ok(())
    }

    fn offset_width(&mut self) -> OffsetWidth {
        self.state.borrow().width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_contents() {
        let mut a = MemFile::new();
        let b = a.clone();
        a.write_all(b"hello").unwrap();
        assert_eq!(b.contents(), b"hello");
        assert_eq!(b.native_position(), 5);
    }

    #[test]
    fn seek_past_end_then_write_fills_gap() {
        let mut f = MemFile::with_data(b"ab".to_vec());
        assert_eq!(f.seek(2, Whence::End).unwrap(), 4);
        f.write_all(b"z").unwrap();
        assert_eq!(f.contents(), b"ab\0\0z");
    }

    #[test]
    fn narrow_rejects_large_seek() {
        let mut f = MemFile::new().narrow();
        assert_eq!(f.offset_width(), OffsetWidth::Narrow);
        assert!(f.seek(1 << 33, Whence::Start).is_err());
        assert_eq!(f.seek(0, Whence::Current).unwrap(), 0);
    }

    #[test]
    fn unseekable_rejects_every_seek() {
        let mut f = MemFile::with_data(b"abc".to_vec()).unseekable();
        let err = f.seek(0, Whence::Current).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotSeekable);
        let mut buf = [0u8; 3];
        assert_eq!(f.read(&mut buf).unwrap(), 3);
    }

    #[test]
    fn negative_seek_is_rejected() {
        let mut f = MemFile::with_data(b"abc".to_vec());
        assert!(f.seek(-1, Whence::Start).is_err());
        assert_eq!(f.seek(-1, Whence::End).unwrap(), 2);
    }

    #[test]
    fn append_only_writes_at_end() {
        let mut f = MemFile::with_data(b"abc".to_vec()).append_only();
        f.seek(0, Whence::Start).unwrap();
        f.write_all(b"d").unwrap();
        assert_eq!(f.contents(), b"abcd");
        assert_eq!(f.native_position(), 4);
    }

    #[test]
    fn short_writes_are_completed_by_write_all() {
        let mut f = MemFile::new().short_writes(2);
        assert_eq!(f.write(b"hello").unwrap(), 2);
        f.write_all(b"llo").unwrap();
        assert_eq!(f.contents(), b"hello");
    }

    #[test]
    fn injected_faults() {
        let mut f = MemFile::with_data(b"abc".to_vec());
        f.set_fail_reads(true);
        let mut buf = [0u8; 2];
        assert!(f.read(&mut buf).is_err());
        f.set_fail_reads(false);
        assert_eq!(f.read(&mut buf).unwrap(), 2);
        f.set_fail_seeks(true);
        assert!(f.seek(0, Whence::Start).is_err());
        f.set_fail_writes(true);
        assert!(f.write(b"x").is_err());
    }

    #[test]
    fn open_is_unsupported() {
        let path = NativePath::encode(b"mem").unwrap();
        let err = MemFile::open(&path, &OpenFlags::default()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
