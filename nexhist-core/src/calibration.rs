//! Per-bank detector calibration tables.

use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Sentinel calibration factor marking a masked or uncalibrated pixel.
///
/// Legitimate factors are several orders of magnitude smaller, so
/// `factor < IGNORE_PIXEL` distinguishes usable pixels without a
/// separate flag.
pub const IGNORE_PIXEL: f64 = 1.0e6;

/// A dense calibration lookup covering a contiguous detector id range.
///
/// Each id in `[idmin, idmax]` maps to either a finite calibration
/// factor (the global per-pixel factor scaled by the bank's TOF unit
/// conversion) or [`IGNORE_PIXEL`] when the id is masked or absent from
/// the calibration map. Instances are built per bank and reused across
/// chunks whose id range they already cover.
#[derive(Clone, Debug)]
pub struct BankCalibration {
    factors: Vec<f64>,
    idmin: u32,
}

impl BankCalibration {
    /// Builds a table covering `[idmin, idmax]` inclusive.
    ///
    /// `time_conversion` is the multiplicative factor from the bank's
    /// TOF storage unit to microseconds and is folded into every entry.
    ///
    /// # Errors
    /// Returns an error if `idmax < idmin`.
    pub fn new(
        idmin: u32,
        idmax: u32,
        time_conversion: f64,
        calibration: &HashMap<u32, f64>,
        masked: &HashSet<u32>,
    ) -> Result<Self> {
        if idmax < idmin {
            return Err(Error::InvertedIdRange { idmin, idmax });
        }
        let size = (idmax - idmin) as usize + 1;
        let mut factors = Vec::with_capacity(size);
        for id in idmin..=idmax {
            if masked.contains(&id) {
                factors.push(IGNORE_PIXEL);
            } else {
                match calibration.get(&id) {
                    Some(factor) => factors.push(factor * time_conversion),
                    None => factors.push(IGNORE_PIXEL),
                }
            }
        }
        Ok(Self { factors, idmin })
    }

    /// Calibration factor for `detid`.
    ///
    /// O(1) lookup. The caller must have confirmed the table covers
    /// `detid` (see [`Self::covers`]); an out-of-range id panics.
    #[inline]
    #[must_use]
    pub fn value(&self, detid: u32) -> f64 {
        self.factors[(detid - self.idmin) as usize]
    }

    /// Smallest detector id covered.
    #[must_use]
    pub fn idmin(&self) -> u32 {
        self.idmin
    }

    /// Largest detector id covered.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn idmax(&self) -> u32 {
        self.idmin + (self.factors.len() - 1) as u32
    }

    /// Returns true if `[lo, hi]` lies within the covered range.
    ///
    /// This is the chunk-reuse predicate: a chunk whose detector ids all
    /// fall inside an existing table does not force a rebuild.
    #[must_use]
    pub fn covers(&self, lo: u32, hi: u32) -> bool {
        lo >= self.idmin && hi <= self.idmax()
    }
}
