//! Splittable event-histogramming reduction.

use nexhist_core::{bin_index, BankCalibration, IGNORE_PIXEL};
use rayon::prelude::*;
use std::ops::Range;

/// Reduction body histogramming one chunk's events.
///
/// Holds read-only views of the chunk's parallel arrays and owns a
/// private count buffer, so concurrent splits never touch shared
/// memory; splits combine with [`EventHistogram::join`], which is
/// associative and order-independent.
pub struct EventHistogram<'a> {
    detids: &'a [u32],
    tofs: &'a [f32],
    calibration: &'a BankCalibration,
    edges: &'a [f64],
    y_temp: Vec<u32>,
}

impl<'a> EventHistogram<'a> {
    /// Creates a body with a zeroed private histogram.
    #[must_use]
    pub fn new(
        detids: &'a [u32],
        tofs: &'a [f32],
        calibration: &'a BankCalibration,
        edges: &'a [f64],
    ) -> Self {
        Self {
            detids,
            tofs,
            calibration,
            edges,
            y_temp: vec![0; edges.len() - 1],
        }
    }

    /// Histograms the events in `range`.
    ///
    /// Events whose calibration factor is the [`IGNORE_PIXEL`] sentinel
    /// (masked or uncalibrated pixels) are dropped, as are calibrated
    /// TOFs outside the edge span.
    pub fn accumulate(&mut self, range: Range<usize>) {
        for i in range {
            let factor = self.calibration.value(self.detids[i]);
            if factor >= IGNORE_PIXEL {
                continue;
            }
            let tof = f64::from(self.tofs[i]) * factor;
            if let Some(bin) = bin_index(self.edges, tof) {
                self.y_temp[bin] += 1;
            }
        }
    }

    /// Element-wise merge of another split's counts into this one.
    pub fn join(&mut self, other: &EventHistogram) {
        for (dst, src) in self.y_temp.iter_mut().zip(&other.y_temp) {
            *dst += src;
        }
    }

    /// The accumulated counts.
    #[must_use]
    pub fn counts(&self) -> &[u32] {
        &self.y_temp
    }

    /// Consumes the body, returning its counts.
    #[must_use]
    pub fn into_counts(self) -> Vec<u32> {
        self.y_temp
    }
}

/// Histograms a chunk in parallel, split at `grainsize` events.
///
/// Each subrange runs its own [`EventHistogram`] with a private count
/// buffer; subresults merge pairwise. Totals are identical regardless of
/// how rayon schedules or nests the splits.
#[must_use]
pub fn histogram_events(
    detids: &[u32],
    tofs: &[f32],
    calibration: &BankCalibration,
    edges: &[f64],
    grainsize: usize,
) -> Vec<u32> {
    debug_assert_eq!(detids.len(), tofs.len());
    let nbins = edges.len() - 1;
    let grain = grainsize.max(1);

    detids
        .par_chunks(grain)
        .zip(tofs.par_chunks(grain))
        .map(|(ids, raw)| {
            let mut body = EventHistogram::new(ids, raw, calibration, edges);
            body.accumulate(0..ids.len());
            body.into_counts()
        })
        .reduce(
            || vec![0u32; nbins],
            |mut acc, local| {
                for (dst, src) in acc.iter_mut().zip(&local) {
                    *dst += src;
                }
                acc
            },
        )
}
