//! Runtime configuration.
//!
//! Read from the environment once per process:
//! - `WIDESTREAM_BUFSIZ`: default capacity of owned stream buffers, in bytes.
//!   Values are clamped to `[MIN_BUFSIZ, MAX_BUFSIZ]`; anything unparsable
//!   falls back to [`DEFAULT_BUFSIZ`].
//! - `WIDESTREAM_OFFSETS`: `auto` (default) probes the native offset width,
//!   `wide` and `narrow` skip the probe and force the result.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Default owned buffer capacity (POSIX BUFSIZ on glibc).
pub const DEFAULT_BUFSIZ: usize = 8192;
/// Smallest owned buffer the environment may select.
pub const MIN_BUFSIZ: usize = 512;
/// Largest owned buffer the environment may select.
pub const MAX_BUFSIZ: usize = 16 * 1024 * 1024;

/// How the native offset width is determined.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetPolicy {
    /// Probe the handle with a large relative seek on first use.
    #[default]
    Auto,
    /// Assume 64-bit offsets without probing.
    Wide,
    /// Enforce the 32-bit contract even when the platform could do more.
    Narrow,
}

impl OffsetPolicy {
    /// Parse from string (case-insensitive). Unknown values select `Auto`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "wide" | "64" | "large" => Self::Wide,
            "narrow" | "32" | "small" => Self::Narrow,
            _ => Self::Auto,
        }
    }
}

/// Parse a buffer size value, clamping to the accepted range.
#[must_use]
pub fn parse_bufsiz(raw: &str) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(n) => n.clamp(MIN_BUFSIZ, MAX_BUFSIZ),
        Err(_) => DEFAULT_BUFSIZ,
    }
}

// 0 = unresolved, usize::MAX = resolving, anything else is the value.
static CACHED_BUFSIZ: AtomicUsize = AtomicUsize::new(0);

const BUFSIZ_UNRESOLVED: usize = 0;
const BUFSIZ_RESOLVING: usize = usize::MAX;

/// Default capacity for owned stream buffers.
///
/// Resolved from `WIDESTREAM_BUFSIZ` on the first call and cached. A caller
/// that races the resolution gets [`DEFAULT_BUFSIZ`] instead of blocking.
#[must_use]
pub fn default_buffer_capacity() -> usize {
    let cached = CACHED_BUFSIZ.load(Ordering::Relaxed);
    if cached != BUFSIZ_UNRESOLVED && cached != BUFSIZ_RESOLVING {
        return cached;
    }
    if cached == BUFSIZ_RESOLVING {
        return DEFAULT_BUFSIZ;
    }

    if CACHED_BUFSIZ
        .compare_exchange(
            BUFSIZ_UNRESOLVED,
            BUFSIZ_RESOLVING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        let v = CACHED_BUFSIZ.load(Ordering::Relaxed);
        return if v != BUFSIZ_UNRESOLVED && v != BUFSIZ_RESOLVING {
            v
        } else {
            DEFAULT_BUFSIZ
        };
    }

    let size = std::env::var("WIDESTREAM_BUFSIZ")
        .map(|v| parse_bufsiz(&v))
        .unwrap_or(DEFAULT_BUFSIZ);
    CACHED_BUFSIZ.store(size, Ordering::Release);
    size
}

static CACHED_POLICY: AtomicU8 = AtomicU8::new(0);

const POLICY_UNRESOLVED: u8 = 0;
const POLICY_AUTO: u8 = 1;
const POLICY_WIDE: u8 = 2;
const POLICY_NARROW: u8 = 3;
const POLICY_RESOLVING: u8 = 255;

fn policy_to_u8(policy: OffsetPolicy) -> u8 {
    match policy {
        OffsetPolicy::Auto => POLICY_AUTO,
        OffsetPolicy::Wide => POLICY_WIDE,
        OffsetPolicy::Narrow => POLICY_NARROW,
    }
}

fn u8_to_policy(v: u8) -> OffsetPolicy {
    match v {
        POLICY_WIDE => OffsetPolicy::Wide,
        POLICY_NARROW => OffsetPolicy::Narrow,
        _ => OffsetPolicy::Auto,
    }
}

/// Configured offset policy (reads `WIDESTREAM_OFFSETS` on first call).
#[must_use]
pub fn offset_policy() -> OffsetPolicy {
    let cached = CACHED_POLICY.load(Ordering::Relaxed);
    if cached != POLICY_UNRESOLVED && cached != POLICY_RESOLVING {
        return u8_to_policy(cached);
    }
    if cached == POLICY_RESOLVING {
        return OffsetPolicy::Auto;
    }

    if CACHED_POLICY
        .compare_exchange(
            POLICY_UNRESOLVED,
            POLICY_RESOLVING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        let v = CACHED_POLICY.load(Ordering::Relaxed);
        return if v != POLICY_UNRESOLVED && v != POLICY_RESOLVING {
            u8_to_policy(v)
        } else {
            OffsetPolicy::Auto
        };
    }

    let policy = std::env::var("WIDESTREAM_OFFSETS")
        .map(|v| OffsetPolicy::from_str_loose(&v))
        .unwrap_or_default();
    CACHED_POLICY.store(policy_to_u8(policy), Ordering::Release);
    policy
}
