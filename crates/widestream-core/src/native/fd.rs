//! POSIX file-descriptor backend.
//!
//! # Safety
//!
//! Every `unsafe` block here is a single libc call on a descriptor this
//! module owns, with pointer/length pairs taken from live Rust slices.

use std::ffi::{c_int, c_uint};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use super::{NativeFile, Whence};
use crate::offset::{self, OffsetWidth, PROBE_DISTANCE};
use crate::path::NativePath;
use crate::stream::OpenFlags;

/// Mode bits for newly created files, before the umask.
const CREATE_MODE: c_uint = 0o666;

/// Convert open flags to `O_*` bits.
pub(crate) fn flags_to_oflags(flags: &OpenFlags) -> c_int {
    let mut oflags = if flags.readable && flags.writable {
        libc::O_RDWR
    } else if flags.writable {
        libc::O_WRONLY
    } else {
        libc::O_RDONLY
    };

    if flags.create {
        oflags |= libc::O_CREAT;
    }
    if flags.truncate {
        oflags |= libc::O_TRUNC;
    }
    if flags.append {
        oflags |= libc::O_APPEND;
    }
    if flags.exclusive {
        oflags |= libc::O_EXCL;
    }

    oflags | libc::O_CLOEXEC
}

fn whence_to_raw(whence: Whence) -> c_int {
    match whence {
        Whence::Start => libc::SEEK_SET,
        Whence::Current => libc::SEEK_CUR,
        Whence::End => libc::SEEK_END,
    }
}

/// Owned POSIX file descriptor.
#[derive(Debug)]
pub struct FdFile {
    fd: OwnedFd,
}

impl FdFile {
    /// Take ownership of an already-open descriptor.
    #[must_use]
    pub fn from_owned_fd(fd: OwnedFd) -> Self {
        Self { fd }
    }

    /// Give the descriptor back without closing it.
    #[must_use]
    pub fn into_owned_fd(self) -> OwnedFd {
        self.fd
    }

    fn probe_width(&mut self) -> OffsetWidth {
        if std::mem::size_of::<libc::off_t>() < 8 {
            return OffsetWidth::Narrow;
        }
        let Ok(start) = self.seek(0, Whence::Current) else {
            // Unseekable (pipe, tty): trust the type width.
            return OffsetWidth::Wide;
        };
        let landed = self.seek(PROBE_DISTANCE, Whence::Current).ok();
        let restored = i64::try_from(start)
            .ok()
            .and_then(|s| self.seek(s, Whence::Start).ok());
        if restored != Some(start) {
            return OffsetWidth::Narrow;
        }
        offset::classify_probe(start, landed)
    }
}

impl AsRawFd for FdFile {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl NativeFile for FdFile {
    fn open(path: &NativePath, flags: &OpenFlags) -> io::Result<Self> {
        let oflags = flags_to_oflags(flags);
        loop {
            // SAFETY: path is a valid NUL-terminated string for the call.
            let fd = unsafe { libc::open(path.as_c_str().as_ptr(), oflags, CREATE_MODE) };
            if fd >= 0 {
                // SAFETY: open returned a fresh descriptor nobody else owns.
                let fd = unsafe { OwnedFd::from_raw_fd(fd) };
                return Ok(Self { fd });
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            // SAFETY: buf is valid for writes of buf.len() bytes.
            let rc = unsafe { libc::read(self.fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
            if rc >= 0 {
                return Ok(rc as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            // SAFETY: buf is valid for reads of buf.len() bytes.
            let rc = unsafe { libc::write(self.fd.as_raw_fd(), buf.as_ptr().cast(), buf.len()) };
            if rc >= 0 {
                return Ok(rc as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<u64> {
        let off = libc::off_t::try_from(offset)
            .map_err(|_| io::Error::from_raw_os_error(libc::EOVERFLOW))?;
        // SAFETY: lseek takes no pointers.
        let rc = unsafe { libc::lseek(self.fd.as_raw_fd(), off, whence_to_raw(whence)) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(rc as u64)
    }

    fn close(self) -> io::Result<()> {
        let raw = self.fd.into_raw_fd();
        // SAFETY: raw was owned by self and is closed exactly once here.
        // EINTR is not retried: the descriptor is gone either way on Linux.
        let rc = unsafe { libc::close(raw) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn offset_width(&mut self) -> OffsetWidth {
        offset::process_width(|| self.probe_width())
    }
}
