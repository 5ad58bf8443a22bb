//! Hyperslab event reads and time-filter range derivation.

use crate::file::EVENT_INDEX;
use crate::{Error, Result};
use hdf5::types::H5Type;
use hdf5::{Dataset, Group};
use ndarray::s;
use nexhist_core::{EventRoi, PulseRoi};

/// Reads event data for one bank, honoring an optional pulse time filter.
///
/// The loader itself holds only the filter configuration; all buffers
/// belong to the caller and are refilled in place across chunks.
pub struct NexusLoader {
    time_filter: Option<Vec<PulseRoi>>,
}

impl NexusLoader {
    /// Creates a loader. `None` disables time filtering.
    #[must_use]
    pub fn new(time_filter: Option<Vec<PulseRoi>>) -> Self {
        Self { time_filter }
    }

    /// Returns true if a pulse time filter is configured.
    #[must_use]
    pub fn is_time_filtered(&self) -> bool {
        self.time_filter.is_some()
    }

    /// Reads the union of 1-D hyperslabs into `out`.
    ///
    /// `offsets` and `slabsizes` are parallel arrays; slabs are
    /// concatenated in the order given, so one call satisfies several
    /// disjoint event ranges. `out` is cleared and refilled in place,
    /// reusing its allocation. A single slab spanning the whole dataset
    /// skips slab selection and reads the dataset directly.
    ///
    /// # Errors
    /// Returns an error if any slab read fails.
    pub fn load_slabs<T: H5Type>(
        &self,
        dataset: &Dataset,
        out: &mut Vec<T>,
        offsets: &[usize],
        slabsizes: &[usize],
    ) -> Result<()> {
        debug_assert_eq!(offsets.len(), slabsizes.len());
        let total: usize = slabsizes.iter().sum();
        out.clear();
        out.reserve(total);

        if offsets.len() == 1 && offsets[0] == 0 && slabsizes[0] == dataset.size() {
            out.extend(dataset.read_raw::<T>()?);
            return Ok(());
        }

        for (&offset, &size) in offsets.iter().zip(slabsizes) {
            if size == 0 {
                continue;
            }
            let slab = dataset.read_slice_1d::<T, _>(s![offset..offset + size])?;
            out.extend(slab);
        }
        Ok(())
    }

    /// Computes the stack of event ranges to read for one bank.
    ///
    /// Unfiltered, the whole bank is a single range. Filtered, the bank's
    /// `event_index` dataset is read once and each configured [`PulseRoi`]
    /// is resolved to an [`EventRoi`]; ranges are pushed in reverse filter
    /// order so the earliest-in-file range sits on top of the stack.
    ///
    /// # Errors
    /// Returns an error if the index dataset is missing, too short for a
    /// configured ROI, or yields an inverted range.
    pub fn event_index_ranges(&self, bank: &Group, total_events: u64) -> Result<Vec<EventRoi>> {
        let Some(rois) = &self.time_filter else {
            return Ok(vec![EventRoi::new(0, total_events)]);
        };

        let index = bank.dataset(EVENT_INDEX)?.read_raw::<u64>()?;
        let mut stack = Vec::with_capacity(rois.len());
        for roi in rois.iter().rev() {
            let start = *index.get(roi.first).ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "pulse index {} outside event_index of length {}",
                    roi.first,
                    index.len()
                ))
            })?;
            let stop = if roi.second == PulseRoi::TO_END || roi.second >= index.len() {
                total_events
            } else {
                index[roi.second]
            };
            let stop = stop.min(total_events);
            if start > stop {
                return Err(Error::InvalidFormat(format!(
                    "event_index not monotone over pulses [{}, {}]: {start} > {stop}",
                    roi.first, roi.second
                )));
            }
            if start < stop {
                stack.push(EventRoi::new(start, stop));
            }
        }
        Ok(stack)
    }
}
