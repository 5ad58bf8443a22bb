//! Per-bank orchestration: chunked reads, calibration reuse, reduction,
//! and atomic accumulation.

use crate::chunk::pop_chunk;
use crate::config::ReduceConfig;
use crate::histogram::histogram_events;
use crate::{Error, Result};
use hdf5::Group;
use nexhist_core::{BankCalibration, EventRoi, PulseRoi};
use nexhist_io::{tof_unit_conversion, NexusFile, NexusLoader, EVENT_ID, EVENT_TIME_OFFSET};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

/// Externally supplied calibration inputs, shared across banks.
#[derive(Clone, Copy, Debug)]
pub struct CalibrationInput<'a> {
    /// Per-pixel calibration factors (`1/difc`-style).
    pub factors: &'a HashMap<u32, f64>,
    /// Detector ids whose events are dropped.
    pub masked: &'a HashSet<u32>,
}

/// One destination of a split-mode bank: an output index plus the pulse
/// ranges routed to it.
#[derive(Clone, Debug)]
pub struct SplitTarget {
    pub target: usize,
    pub rois: Vec<PulseRoi>,
}

/// Processes detector banks into TOF histograms.
///
/// One processor serves any number of banks; per-bank state (chunk
/// buffers, calibration table, accumulator) lives on the stack of each
/// `process_bank` call, so distinct banks can run on distinct rayon
/// tasks without shared mutable state.
pub struct BankProcessor<'a> {
    config: &'a ReduceConfig,
    calibration: CalibrationInput<'a>,
    edges: &'a [f64],
}

impl<'a> BankProcessor<'a> {
    #[must_use]
    pub fn new(
        config: &'a ReduceConfig,
        calibration: CalibrationInput<'a>,
        edges: &'a [f64],
    ) -> Self {
        Self {
            config,
            calibration,
            edges,
        }
    }

    /// Histograms one bank into `out`.
    ///
    /// `out` must have exactly one slot per bin. Nothing is written
    /// until every chunk has been accumulated, so a failed bank leaves
    /// `out` untouched. A zero-event bank succeeds without writing.
    ///
    /// # Errors
    /// Returns an error on any HDF5 failure or if `out` has the wrong
    /// length; partial results are discarded with the call.
    pub fn process_bank(&self, bank: &Group, name: &str, out: &mut [u32]) -> Result<()> {
        let nbins = self.edges.len() - 1;
        if out.len() != nbins {
            return Err(Error::OutputMismatch {
                expected: nbins,
                got: out.len(),
            });
        }

        let total_events = NexusFile::bank_event_count(bank).map_err(Error::Io)? as u64;
        if total_events == 0 {
            log::debug!("bank {name}: empty, skipped");
            return Ok(());
        }

        let loader = NexusLoader::new(self.config.time_filter.clone());
        let mut stack = loader.event_index_ranges(bank, total_events)?;

        let tof_dataset = bank.dataset(EVENT_TIME_OFFSET).map_err(nexhist_io::Error::from)?;
        let id_dataset = bank.dataset(EVENT_ID).map_err(nexhist_io::Error::from)?;
        let time_conversion = tof_unit_conversion(&tof_dataset)?;

        let accumulator: Vec<AtomicU32> = (0..nbins).map(|_| AtomicU32::new(0)).collect();
        let mut state = BankState::default();

        self.drain_stack(
            &mut stack,
            &loader,
            &id_dataset,
            &tof_dataset,
            time_conversion,
            &mut state,
            &accumulator,
        )?;

        // All producing tasks have joined; plain copy-out.
        for (dst, bin) in out.iter_mut().zip(&accumulator) {
            *dst = bin.load(Ordering::Relaxed);
        }
        log::debug!("bank {name}: {total_events} events histogrammed");
        Ok(())
    }

    /// Histograms one bank into several output spectra.
    ///
    /// Each [`SplitTarget`] routes its pulse ranges into
    /// `outputs[target.target]`; scheduling and histogramming are the
    /// same as [`Self::process_bank`] per target, and the calibration
    /// table and chunk buffers are shared across targets of the bank.
    ///
    /// # Errors
    /// Returns an error on HDF5 failure, a target index outside
    /// `outputs`, or an output of the wrong length.
    pub fn process_bank_split(
        &self,
        bank: &Group,
        name: &str,
        targets: &[SplitTarget],
        outputs: &mut [Vec<u32>],
    ) -> Result<()> {
        let nbins = self.edges.len() - 1;
        for split in targets {
            if split.target >= outputs.len() {
                return Err(Error::BadSplitTarget {
                    target: split.target,
                    outputs: outputs.len(),
                });
            }
            if outputs[split.target].len() != nbins {
                return Err(Error::OutputMismatch {
                    expected: nbins,
                    got: outputs[split.target].len(),
                });
            }
        }

        let total_events = NexusFile::bank_event_count(bank).map_err(Error::Io)? as u64;
        if total_events == 0 {
            log::debug!("bank {name}: empty, skipped");
            return Ok(());
        }

        let tof_dataset = bank.dataset(EVENT_TIME_OFFSET).map_err(nexhist_io::Error::from)?;
        let id_dataset = bank.dataset(EVENT_ID).map_err(nexhist_io::Error::from)?;
        let time_conversion = tof_unit_conversion(&tof_dataset)?;

        let mut state = BankState::default();
        for split in targets {
            let loader = NexusLoader::new(Some(split.rois.clone()));
            let mut stack = loader.event_index_ranges(bank, total_events)?;

            let accumulator: Vec<AtomicU32> = (0..nbins).map(|_| AtomicU32::new(0)).collect();
            self.drain_stack(
                &mut stack,
                &loader,
                &id_dataset,
                &tof_dataset,
                time_conversion,
                &mut state,
                &accumulator,
            )?;

            for (dst, bin) in outputs[split.target].iter_mut().zip(&accumulator) {
                *dst += bin.load(Ordering::Relaxed);
            }
        }
        log::debug!(
            "bank {name}: {total_events} events split over {} target(s)",
            targets.len()
        );
        Ok(())
    }

    /// Runs the chunk scheduling loop until `stack` is exhausted.
    ///
    /// Chunks are sequential with respect to each other; within a chunk
    /// the detector-id load (plus min/max scan) and the TOF load fork
    /// and join, then the events reduce in parallel and fold into the
    /// shared accumulator. A cancellation flag, if ever needed, belongs
    /// between iterations of this loop.
    #[allow(clippy::too_many_arguments)]
    fn drain_stack(
        &self,
        stack: &mut Vec<EventRoi>,
        loader: &NexusLoader,
        id_dataset: &hdf5::Dataset,
        tof_dataset: &hdf5::Dataset,
        time_conversion: f64,
        state: &mut BankState,
        accumulator: &[AtomicU32],
    ) -> Result<()> {
        let BankState {
            detids,
            tofs,
            calibration,
        } = state;

        while let Some((offsets, slabsizes)) = pop_chunk(stack, self.config.events_per_chunk) {
            let (id_result, tof_result) = rayon::join(
                || -> Result<(u32, u32)> {
                    loader.load_slabs(id_dataset, detids, &offsets, &slabsizes)?;
                    let mut min_id = u32::MAX;
                    let mut max_id = 0;
                    for &id in detids.iter() {
                        min_id = min_id.min(id);
                        max_id = max_id.max(id);
                    }
                    Ok((min_id, max_id))
                },
                || -> Result<()> {
                    loader.load_slabs(tof_dataset, tofs, &offsets, &slabsizes)?;
                    Ok(())
                },
            );
            let (min_id, max_id) = id_result?;
            tof_result?;

            let calib = ensure_covering(
                calibration.take(),
                min_id,
                max_id,
                time_conversion,
                self.calibration,
            )?;

            let local = histogram_events(
                detids,
                tofs,
                &calib,
                self.edges,
                self.config.grainsize_event,
            );
            for (bin, count) in accumulator.iter().zip(&local) {
                bin.fetch_add(*count, Ordering::Relaxed);
            }
            *calibration = Some(calib);
        }
        Ok(())
    }
}

/// Per-bank mutable state reused across chunks: the slab buffers and the
/// lazily built calibration table.
#[derive(Default)]
struct BankState {
    detids: Vec<u32>,
    tofs: Vec<f32>,
    calibration: Option<BankCalibration>,
}

/// Returns a calibration covering `[min_id, max_id]`, keeping `current`
/// when it already covers the range and rebuilding otherwise.
fn ensure_covering(
    current: Option<BankCalibration>,
    min_id: u32,
    max_id: u32,
    time_conversion: f64,
    input: CalibrationInput<'_>,
) -> Result<BankCalibration> {
    match current {
        Some(calib) if calib.covers(min_id, max_id) => Ok(calib),
        _ => BankCalibration::new(min_id, max_id, time_conversion, input.factors, input.masked)
            .map_err(Error::Core),
    }
}
