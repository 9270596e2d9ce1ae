//! UTF-8 / UTF-16 conversion with replacement.
//!
//! Invalid input is never an error here. Each maximal invalid UTF-8
//! subsequence, and each unpaired UTF-16 surrogate, becomes exactly one
//! U+FFFD in the output.

use std::borrow::Cow;

/// The substitution code point.
pub const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Decode narrow UTF-8 into wide UTF-16 code units.
#[must_use]
pub fn widen(src: &[u8]) -> Vec<u16> {
    String::from_utf8_lossy(src).encode_utf16().collect()
}

/// Encode wide UTF-16 code units as narrow UTF-8.
#[must_use]
pub fn narrow(src: &[u16]) -> String {
    char::decode_utf16(src.iter().copied())
        .map(|unit| unit.unwrap_or(REPLACEMENT))
        .collect()
}

/// Widen into caller storage, followed by a NUL terminator.
///
/// Returns the number of code units written before the terminator, or
/// `None` when `dst` cannot hold the result plus terminator. Units past the
/// terminator are left as they were. On `None` the contents of `dst` are
/// unspecified.
pub fn widen_into(dst: &mut [u16], src: &[u8]) -> Option<usize> {
    let text: Cow<'_, str> = String::from_utf8_lossy(src);
    let mut written = 0;
    for unit in text.encode_utf16() {
        // Leave room for the terminator.
        if written + 1 >= dst.len() {
            return None;
        }
        dst[written] = unit;
        written += 1;
    }
    *dst.get_mut(written)? = 0;
    Some(written)
}

/// Narrow into caller storage, followed by a NUL terminator.
///
/// Same contract as [`widen_into`], counted in bytes.
pub fn narrow_into(dst: &mut [u8], src: &[u16]) -> Option<usize> {
    let mut written = 0;
    let mut scratch = [0u8; 4];
    for unit in char::decode_utf16(src.iter().copied()) {
        let encoded = unit.unwrap_or(REPLACEMENT).encode_utf8(&mut scratch);
        let end = written + encoded.len();
        if end >= dst.len() {
            return None;
        }
        dst[written..end].copy_from_slice(encoded.as_bytes());
        written = end;
    }
    *dst.get_mut(written)? = 0;
    Some(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &[u8] = b"\xd7\xa9\xd7\x9c\xd7\x95\xd7\x9d";
    const WHELLO: [u16; 4] = [0x05e9, 0x05dc, 0x05d5, 0x05dd];

    #[test]
    fn widen_valid() {
        assert_eq!(widen(HELLO), WHELLO);
        assert_eq!(widen(b""), Vec::<u16>::new());
    }

    #[test]
    fn widen_truncated_tail_substitutes_once() {
        let out = widen(&HELLO[..7]);
        assert_eq!(out, [0x05e9, 0x05dc, 0x05d5, 0xfffd]);
        let out = widen(&HELLO[..6]);
        assert_eq!(out, [0x05e9, 0x05dc, 0x05d5]);
    }

    #[test]
    fn widen_invalid_bytes() {
        assert_eq!(widen(b"\xFF\xFF"), [0xfffd, 0xfffd]);
        assert_eq!(widen(b"\xd7\xa9\xFF"), [0x05e9, 0xfffd]);
        assert_eq!(widen(b"\xd7"), [0xfffd]);
        assert_eq!(widen(b"\xFF\xd7\xa9"), [0xfffd, 0x05e9]);
    }

    #[test]
    fn narrow_valid_and_surrogates() {
        assert_eq!(narrow(&WHELLO).as_bytes(), HELLO);
        assert_eq!(
            narrow(&[0xDC01, 0x05e9]).as_bytes(),
            b"\xEF\xBF\xBD\xd7\xa9"
        );
        assert_eq!(
            narrow(&[0x05e9, 0xD800]).as_bytes(),
            b"\xd7\xa9\xEF\xBF\xBD"
        );
    }

    #[test]
    fn widen_into_respects_capacity() {
        let mut buf = [0u16, 0, 0, 0, 0, 1];
        assert_eq!(widen_into(&mut buf[..5], HELLO), Some(4));
        assert_eq!(&buf[..4], &WHELLO);
        assert_eq!(buf[4], 0);
        assert_eq!(buf[5], 1);
        assert_eq!(widen_into(&mut buf[..4], HELLO), None);
        assert_eq!(widen_into(&mut buf[..5], b""), Some(0));
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn narrow_into_respects_capacity() {
        let mut buf = [0u8; 10];
        buf[9] = 1;
        assert_eq!(narrow_into(&mut buf[..9], &WHELLO), Some(8));
        assert_eq!(&buf[..8], HELLO);
        assert_eq!(buf[8], 0);
        assert_eq!(buf[9], 1);
        assert_eq!(narrow_into(&mut buf[..8], &WHELLO), None);
        assert_eq!(narrow_into(&mut buf[..7], &WHELLO[..3]), Some(6));
    }

    #[test]
    fn into_variants_reject_empty_destination() {
        assert_eq!(widen_into(&mut [], b"x"), None);
        assert_eq!(narrow_into(&mut [], &[0x78]), None);
        assert_eq!(widen_into(&mut [], b""), None);
    }
}
