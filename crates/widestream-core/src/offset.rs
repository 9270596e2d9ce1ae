//! Native offset width.
//!
//! Some native libraries only accept 32-bit offsets even on hosts whose
//! files can grow larger. The width is a runtime capability: it is probed
//! once per process (a large relative seek on the first handle that asks)
//! and the answer is cached.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::config::{self, OffsetPolicy};

/// Largest position representable on a narrow-offset platform.
pub const NARROW_MAX: u64 = i32::MAX as u64;

/// Relative distance used by probes. Needs more than 32 bits.
pub const PROBE_DISTANCE: i64 = 1 << 33;

/// Offset representation supported by a native handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetWidth {
    /// Positions are limited to `0..=i32::MAX`.
    Narrow,
    /// Positions use the full signed 64-bit range.
    Wide,
}

impl OffsetWidth {
    /// Whether `pos` can be represented with this width.
    #[must_use]
    pub const fn contains(self, pos: u64) -> bool {
        match self {
            Self::Narrow => pos <= NARROW_MAX,
            Self::Wide => pos <= i64::MAX as u64,
        }
    }
}

// 0=unresolved, 1=Narrow, 2=Wide, 255=probing.
static CACHED_WIDTH: AtomicU8 = AtomicU8::new(0);

const WIDTH_UNRESOLVED: u8 = 0;
const WIDTH_NARROW: u8 = 1;
const WIDTH_WIDE: u8 = 2;
const WIDTH_PROBING: u8 = 255;

fn width_to_u8(width: OffsetWidth) -> u8 {
    match width {
        OffsetWidth::Narrow => WIDTH_NARROW,
        OffsetWidth::Wide => WIDTH_WIDE,
    }
}

/// Process-wide offset width, running `probe` only if nothing is cached yet.
///
/// The configured [`OffsetPolicy`] wins over probing. While another caller is
/// mid-probe the narrow answer is returned: it is always safe to refuse a
/// large seek, never safe to attempt one that truncates.
pub fn process_width(probe: impl FnOnce() -> OffsetWidth) -> OffsetWidth {
    resolve_width(&CACHED_WIDTH, config::offset_policy(), probe)
}

fn resolve_width(
    cell: &AtomicU8,
    policy: OffsetPolicy,
    probe: impl FnOnce() -> OffsetWidth,
) -> OffsetWidth {
    match policy {
        OffsetPolicy::Wide => return OffsetWidth::Wide,
        OffsetPolicy::Narrow => return OffsetWidth::Narrow,
        OffsetPolicy::Auto => {}
    }

    match cell.load(Ordering::Acquire) {
        WIDTH_NARROW => return OffsetWidth::Narrow,
        WIDTH_WIDE => return OffsetWidth::Wide,
        WIDTH_PROBING => return OffsetWidth::Narrow,
        _ => {}
    }

    if cell
        .compare_exchange(
            WIDTH_UNRESOLVED,
            WIDTH_PROBING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        return match cell.load(Ordering::Acquire) {
            WIDTH_WIDE => OffsetWidth::Wide,
            _ => OffsetWidth::Narrow,
        };
    }

    let width = probe();
    cell.store(width_to_u8(width), Ordering::Release);
    width
}

/// Interpret the outcome of a probe seek of [`PROBE_DISTANCE`] from `start`.
#[must_use]
pub fn classify_probe(start: u64, landed: Option<u64>) -> OffsetWidth {
    match landed {
        Some(pos) if Some(pos) == start.checked_add(PROBE_DISTANCE as u64) => OffsetWidth::Wide,
        _ => OffsetWidth::Narrow,
    }
}
