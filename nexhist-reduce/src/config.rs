//! Reduction configuration.

use nexhist_core::PulseRoi;

/// Tunable parameters for bank processing.
#[derive(Clone, Debug)]
pub struct ReduceConfig {
    /// Event budget per disk read chunk.
    pub events_per_chunk: usize,
    /// Subrange size for the event-level parallel reduction.
    pub grainsize_event: usize,
    /// Optional ordered pulse time filter. `None` histograms every event.
    pub time_filter: Option<Vec<PulseRoi>>,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            events_per_chunk: 10_000_000,
            grainsize_event: 100_000,
            time_filter: None,
        }
    }
}

impl ReduceConfig {
    /// Set the event budget per read chunk. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_events_per_chunk(mut self, events: usize) -> Self {
        self.events_per_chunk = events.max(1);
        self
    }

    /// Set the reduction grain size. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_grainsize_event(mut self, grainsize: usize) -> Self {
        self.grainsize_event = grainsize.max(1);
        self
    }

    /// Set the pulse time filter.
    #[must_use]
    pub fn with_time_filter(mut self, rois: Vec<PulseRoi>) -> Self {
        self.time_filter = Some(rois);
        self
    }
}
