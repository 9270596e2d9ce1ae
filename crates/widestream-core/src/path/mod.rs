//! Portable pathnames.
//!
//! Callers hand the stream UTF-8 paths. [`NativePath::encode`] turns them
//! into what the platform open call wants. On POSIX that is the narrow bytes
//! unchanged, so any name the file system holds can be opened. The text and
//! wide forms substitute U+FFFD for invalid sequences instead of rejecting
//! the whole path.

mod convert;

#[cfg(unix)]
use std::ffi::{CStr, CString};
use std::fmt;

use thiserror::Error;

pub use convert::{REPLACEMENT, narrow, narrow_into, widen, widen_into};

/// Reasons a path cannot be turned into a native path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("path contains a NUL byte at offset {position}")]
    InteriorNul { position: usize },
}

/// A path converted for the native open call.
#[derive(Clone, PartialEq, Eq)]
pub struct NativePath {
    text: String,
    substituted: bool,
    #[cfg(unix)]
    c_path: CString,
}

impl NativePath {
    /// Encode a narrow (UTF-8) path.
    ///
    /// The POSIX form keeps `raw` byte for byte; only [`as_str`](Self::as_str)
    /// and [`to_wide`](Self::to_wide) see replacement characters.
    pub fn encode(raw: &[u8]) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(position) = raw.iter().position(|&b| b == 0) {
            return Err(PathError::InteriorNul { position });
        }
        let text = String::from_utf8_lossy(raw).into_owned();
        let substituted = text.as_bytes() != raw;
        Ok(Self {
            #[cfg(unix)]
            c_path: CString::new(raw)
                .map_err(|e| PathError::InteriorNul { position: e.nul_position() })?,
            text,
            substituted,
        })
    }

    /// Encode a standard library path.
    #[cfg(unix)]
    pub fn from_path(path: &std::path::Path) -> Result<Self, PathError> {
        use std::os::unix::ffi::OsStrExt;
        Self::encode(path.as_os_str().as_bytes())
    }

    /// The path as (possibly substituted) UTF-8.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether any invalid input was replaced with U+FFFD.
    #[must_use]
    pub fn was_substituted(&self) -> bool {
        self.substituted
    }

    /// NUL-terminated wide form, as wide-character platforms expect.
    #[must_use]
    pub fn to_wide(&self) -> Vec<u16> {
        let mut wide: Vec<u16> = self.text.encode_utf16().collect();
        wide.push(0);
        wide
    }

    /// NUL-terminated narrow form for POSIX open.
    #[cfg(unix)]
    #[must_use]
    pub fn as_c_str(&self) -> &CStr {
        &self.c_path
    }
}

impl fmt::Debug for NativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativePath").field(&self.text).finish()
    }
}

impl fmt::Display for NativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_valid_utf8() {
        let p = NativePath::encode("\u{5e9}-\u{43c}-\u{3bd}.txt".as_bytes()).unwrap();
        assert_eq!(p.as_str(), "\u{5e9}-\u{43c}-\u{3bd}.txt");
        assert!(!p.was_substituted());
        assert_eq!(
            p.to_wide(),
            [0x05e9, 0x2d, 0x043c, 0x2d, 0x03bd, 0x2e, 0x74, 0x78, 0x74, 0]
        );
    }

    #[test]
    fn encode_substitutes_invalid_sequences() {
        let p = NativePath::encode(b"a\xFFb").unwrap();
        assert_eq!(p.as_str(), "a\u{fffd}b");
        assert!(p.was_substituted());
        assert_eq!(p.to_wide(), [0x61, 0xfffd, 0x62, 0]);
    }

    #[cfg(unix)]
    #[test]
    fn c_str_keeps_invalid_bytes() {
        let p = NativePath::encode(b"caf\xe9.txt").unwrap();
        assert_eq!(p.as_c_str().to_bytes(), b"caf\xe9.txt");
        assert_eq!(p.as_str(), "caf\u{fffd}.txt");
    }

    #[test]
    fn encode_rejects_empty_and_nul() {
        assert_eq!(NativePath::encode(b""), Err(PathError::Empty));
        assert_eq!(
            NativePath::encode(b"ab\0c"),
            Err(PathError::InteriorNul { position: 2 })
        );
    }

    #[cfg(unix)]
    #[test]
    fn c_str_matches_text() {
        let p = NativePath::encode(b"/tmp/x").unwrap();
        assert_eq!(p.as_c_str().to_bytes(), b"/tmp/x");
    }
}
