//! Open modes.
//!
//! Two spellings are accepted: the classic stream flag set
//! (`in | out | trunc | app | binary`, see [`OpenMode`]) and fopen-style mode
//! strings (`"r"`, `"w+"`, `"a+b"`, see [`parse_mode`]). Both resolve to
//! [`OpenFlags`], which is what the native layer consumes.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Resolved open flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub readable: bool,
    pub writable: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub binary: bool,
    pub exclusive: bool,
}

/// Which directions a stream may transfer data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl OpenFlags {
    /// Access directions, or `None` for flags that allow neither.
    #[must_use]
    pub fn access(&self) -> Option<Access> {
        match (self.readable, self.writable) {
            (true, true) => Some(Access::ReadWrite),
            (true, false) => Some(Access::ReadOnly),
            (false, true) => Some(Access::WriteOnly),
            (false, false) => None,
        }
    }
}

/// Parse an fopen mode string (e.g. "r", "w+", "rb", "a+b", "wx").
///
/// Returns `None` if the mode string is invalid.
pub fn parse_mode(mode: &[u8]) -> Option<OpenFlags> {
    let (&first, modifiers) = mode.split_first()?;
    let mut flags = OpenFlags::default();

    match first {
        b'r' => {
            flags.readable = true;
        }
        b'w' => {
            flags.writable = true;
            flags.create = true;
            flags.truncate = true;
        }
        b'a' => {
            flags.writable = true;
            flags.create = true;
            flags.append = true;
        }
        _ => return None,
    }

    for &m in modifiers {
        match m {
            b'+' => {
                flags.readable = true;
                flags.writable = true;
            }
            b'b' => flags.binary = true,
            b't' => flags.binary = false,
            b'x' if flags.create => flags.exclusive = true,
            _ => return None,
        }
    }

    Some(flags)
}

/// Classic stream open mode bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OpenMode(u8);

impl OpenMode {
    pub const IN: Self = Self(1);
    pub const OUT: Self = Self(1 << 1);
    pub const TRUNC: Self = Self(1 << 2);
    pub const APP: Self = Self(1 << 3);
    pub const BINARY: Self = Self(1 << 4);

    /// No bits set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Resolve to open flags using the classic filebuf table.
    ///
    /// Only the combinations the classic stream buffer accepts are valid;
    /// `binary` may be added to any of them.
    #[must_use]
    pub fn to_flags(self) -> Option<OpenFlags> {
        let binary = self.contains(Self::BINARY);
        let base = Self(self.0 & !Self::BINARY.0);
        let (i, o, t, a) = (Self::IN, Self::OUT, Self::TRUNC, Self::APP);

        let fopen: &[u8] = if base == o || base == o | t {
            b"w"
        } else if base == a || base == o | a {
            b"a"
        } else if base == i {
            b"r"
        } else if base == i | o {
            b"r+"
        } else if base == i | o | t {
            b"w+"
        } else if base == i | a || base == i | o | a {
            b"a+"
        } else {
            return None;
        };

        let mut flags = parse_mode(fopen)?;
        flags.binary = binary;
        Some(flags)
    }
}

impl BitOr for OpenMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::IN, "in"),
            (Self::OUT, "out"),
            (Self::TRUNC, "trunc"),
            (Self::APP, "app"),
            (Self::BINARY, "binary"),
        ];
        let mut first = true;
        for (bit, name) in names {
            if self.contains(bit) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("(empty)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_read() {
        let f = parse_mode(b"r").unwrap();
        assert!(f.readable);
        assert!(!f.writable);
        assert!(!f.append);
        assert_eq!(f.access(), Some(Access::ReadOnly));
    }

    #[test]
    fn test_parse_mode_write() {
        let f = parse_mode(b"w").unwrap();
        assert!(!f.readable);
        assert!(f.writable);
        assert!(f.truncate);
        assert!(f.create);
        assert_eq!(f.access(), Some(Access::WriteOnly));
    }

    #[test]
    fn test_parse_mode_append_plus() {
        let f = parse_mode(b"a+").unwrap();
        assert!(f.readable);
        assert!(f.writable);
        assert!(f.append);
        assert_eq!(f.access(), Some(Access::ReadWrite));
    }

    #[test]
    fn test_parse_mode_binary_and_text() {
        assert!(parse_mode(b"rb").unwrap().binary);
        assert!(parse_mode(b"r+b").unwrap().binary);
        assert!(!parse_mode(b"rt").unwrap().binary);
    }

    #[test]
    fn test_parse_mode_exclusive() {
        let f = parse_mode(b"wx").unwrap();
        assert!(f.writable);
        assert!(f.exclusive);
        assert!(parse_mode(b"rx").is_none());
    }

    #[test]
    fn test_parse_mode_invalid() {
        assert!(parse_mode(b"").is_none());
        assert!(parse_mode(b"z").is_none());
        assert!(parse_mode(b"r?").is_none());
    }

    #[test]
    fn test_open_mode_table() {
        let (i, o, t, a, b) = (
            OpenMode::IN,
            OpenMode::OUT,
            OpenMode::TRUNC,
            OpenMode::APP,
            OpenMode::BINARY,
        );
        assert_eq!(o.to_flags(), parse_mode(b"w"));
        assert_eq!((o | t).to_flags(), parse_mode(b"w"));
        assert_eq!(a.to_flags(), parse_mode(b"a"));
        assert_eq!((o | a).to_flags(), parse_mode(b"a"));
        assert_eq!(i.to_flags(), parse_mode(b"r"));
        assert_eq!((i | o).to_flags(), parse_mode(b"r+"));
        assert_eq!((i | o | t).to_flags(), parse_mode(b"w+"));
        assert_eq!((i | a).to_flags(), parse_mode(b"a+"));
        assert_eq!((i | o | a).to_flags(), parse_mode(b"a+"));
        assert_eq!((i | b).to_flags(), parse_mode(b"rb"));
    }

    #[test]
    fn test_open_mode_rejects_unknown_combinations() {
        assert!(OpenMode::empty().to_flags().is_none());
        assert!(OpenMode::BINARY.to_flags().is_none());
        assert!(OpenMode::TRUNC.to_flags().is_none());
        assert!((OpenMode::IN | OpenMode::TRUNC).to_flags().is_none());
        assert!((OpenMode::OUT | OpenMode::TRUNC | OpenMode::APP).to_flags().is_none());
    }

    #[test]
    fn test_open_mode_debug() {
        assert_eq!(format!("{:?}", OpenMode::IN | OpenMode::BINARY), "in | binary");
        assert_eq!(format!("{:?}", OpenMode::empty()), "(empty)");
    }
}
