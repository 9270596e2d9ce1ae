//! Stream buffer storage.
//!
//! A stream buffer is either owned (allocated on first use, sized from
//! configuration) or borrowed from the caller for `'buf`. Capacity 0 means
//! unbuffered: block transfers go straight to the handle, and reads land in a
//! one-byte look-ahead slot so peeking still works.
//!
//! The buffer only stores bytes. Which part of it holds unread or unflushed
//! data is tracked by the stream's region, so the two can never disagree
//! about direction.

use std::fmt;

use crate::config;

enum Storage<'buf> {
    /// Allocated lazily; empty until the first transfer.
    Owned(Vec<u8>),
    /// Caller storage. Never resized or freed by the stream.
    Borrowed(&'buf mut [u8]),
}

/// Fixed-capacity byte storage for one stream.
///
/// Invariants:
/// - `capacity` never changes for the lifetime of the value
/// - owned storage is either empty or exactly `capacity` bytes
pub struct StreamBuffer<'buf> {
    storage: Storage<'buf>,
    capacity: usize,
    /// Look-ahead for unbuffered reads.
    slot: [u8; 1],
}

impl<'buf> StreamBuffer<'buf> {
    /// Owned buffer of `capacity` bytes. Nothing is allocated yet.
    #[must_use]
    pub fn owned(capacity: usize) -> Self {
        Self {
            storage: Storage::Owned(Vec::new()),
            capacity,
            slot: [0],
        }
    }

    /// Owned buffer with the configured default capacity.
    #[must_use]
    pub fn default_owned() -> Self {
        Self::owned(config::default_buffer_capacity())
    }

    /// Zero-capacity buffer.
    #[must_use]
    pub fn unbuffered() -> Self {
        Self::owned(0)
    }

    /// Caller-provided storage. Its length is the capacity.
    #[must_use]
    pub fn borrowed(buf: &'buf mut [u8]) -> Self {
        Self {
            capacity: buf.len(),
            storage: Storage::Borrowed(buf),
            slot: [0],
        }
    }

    /// Buffer capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the storage belongs to the stream.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    /// Full-capacity storage, allocating owned storage on first use.
    fn bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Owned(data) => {
                if data.len() != self.capacity {
                    *data = vec![0u8; self.capacity];
                }
                data.as_mut_slice()
            }
            Storage::Borrowed(buf) => &mut buf[..],
        }
    }

    fn bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Owned(data) => data.as_slice(),
            Storage::Borrowed(buf) => &buf[..],
        }
    }

    /// Area a refill reads into: the whole buffer, or the look-ahead slot.
    pub fn read_area_mut(&mut self) -> &mut [u8] {
        if self.capacity == 0 {
            &mut self.slot[..]
        } else {
            self.bytes_mut()
        }
    }

    /// Bytes previously filled through [`read_area_mut`](Self::read_area_mut).
    #[must_use]
    pub fn read_area(&self) -> &[u8] {
        if self.capacity == 0 {
            &self.slot[..]
        } else {
            self.bytes()
        }
    }

    /// Area writes are staged in. Empty when unbuffered.
    pub fn write_area_mut(&mut self) -> &mut [u8] {
        self.bytes_mut()
    }

    /// The first `len` staged bytes.
    #[must_use]
    pub fn pending(&self, len: usize) -> &[u8] {
        &self.bytes()[..len]
    }

    /// Drop a borrowed buffer, reverting to a default owned one.
    ///
    /// Returns whether anything was released.
    pub fn release_borrowed(&mut self) -> bool {
        if self.is_owned() {
            return false;
        }
        *self = Self::default_owned();
        true
    }
}

impl Default for StreamBuffer<'_> {
    fn default() -> Self {
        Self::default_owned()
    }
}

impl fmt::Debug for StreamBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.storage {
            Storage::Owned(data) if data.is_empty() => "owned (unallocated)",
            Storage::Owned(_) => "owned",
            Storage::Borrowed(_) => "borrowed",
        };
        f.debug_struct("StreamBuffer")
            .field("storage", &kind)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_allocates_on_first_use() {
        let mut buf = StreamBuffer::owned(16);
        assert_eq!(buf.capacity(), 16);
        assert!(buf.read_area().is_empty());
        assert_eq!(buf.read_area_mut().len(), 16);
        assert_eq!(buf.read_area().len(), 16);
        assert!(buf.is_owned());
    }

    #[test]
    fn unbuffered_reads_through_slot() {
        let mut buf = StreamBuffer::unbuffered();
        assert_eq!(buf.capacity(), 0);
        buf.read_area_mut()[0] = b'x';
        assert_eq!(buf.read_area(), b"x");
        assert!(buf.write_area_mut().is_empty());
    }

    #[test]
    fn borrowed_uses_caller_storage() {
        let mut storage = [0u8; 3];
        {
            let mut buf = StreamBuffer::borrowed(&mut storage);
            assert_eq!(buf.capacity(), 3);
            assert!(!buf.is_owned());
            buf.write_area_mut().copy_from_slice(b"abc");
            assert_eq!(buf.pending(2), b"ab");
        }
        assert_eq!(&storage, b"abc");
    }

    #[test]
    fn release_borrowed_reverts_to_owned() {
        let mut storage = [0u8; 3];
        let mut buf = StreamBuffer::borrowed(&mut storage);
        assert!(buf.release_borrowed());
        assert!(buf.is_owned());
        assert_eq!(buf.capacity(), config::default_buffer_capacity());
        assert!(!buf.release_borrowed());
    }

    #[test]
    fn debug_hides_contents() {
        let buf = StreamBuffer::owned(4);
        let text = format!("{buf:?}");
        assert!(text.contains("unallocated"));
        assert!(text.contains("capacity: 4"));
    }
}
