//! Pulse and event regions of interest.
//!
//! A [`PulseRoi`] selects a contiguous span of pulses by index into a
//! bank's `event_index` dataset; an [`EventRoi`] is the derived half-open
//! range of raw event indices. Event ROIs for one bank are kept in a
//! `Vec` used as a LIFO stack, produced so the earliest-in-file range is
//! on top; chunk scheduling pops ranges, splits oversized ones, and
//! pushes the remainder back.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A contiguous span of pulses selected by a time filter.
///
/// `first` and `second` index into the bank's per-pulse `event_index`
/// array. `second == PulseRoi::TO_END` selects through the last event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PulseRoi {
    pub first: usize,
    pub second: usize,
}

impl PulseRoi {
    /// Sentinel for "through the end of the run".
    pub const TO_END: usize = usize::MAX;

    #[must_use]
    pub fn new(first: usize, second: usize) -> Self {
        Self { first, second }
    }

    /// Selects from `first` through the last event of the run.
    #[must_use]
    pub fn to_end(first: usize) -> Self {
        Self {
            first,
            second: Self::TO_END,
        }
    }
}

/// A half-open `[start, stop)` range of raw event indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventRoi {
    pub start: u64,
    pub stop: u64,
}

impl EventRoi {
    #[must_use]
    pub fn new(start: u64, stop: u64) -> Self {
        debug_assert!(start <= stop, "inverted event range [{start}, {stop})");
        Self { start, stop }
    }

    /// Number of events in the range.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.stop - self.start
    }

    /// Returns true if the range selects no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }

    /// Splits off the first `count` events.
    ///
    /// Returns the consumed prefix and the remainder. `count` must not
    /// exceed `len()`; the remainder keeps the original stop so no event
    /// is lost or duplicated across the split.
    #[must_use]
    pub fn split_at(&self, count: u64) -> (EventRoi, EventRoi) {
        debug_assert!(count <= self.len());
        let mid = self.start + count;
        (EventRoi::new(self.start, mid), EventRoi::new(mid, self.stop))
    }
}
