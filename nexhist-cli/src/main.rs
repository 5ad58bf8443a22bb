//! nexhist command-line interface.
//!
//! Histograms NeXus event files bank-by-bank and reports the result as
//! JSON.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Parser, Subcommand};
use nexhist_core::{linear_edges, PulseRoi};
use nexhist_io::NexusFile;
use nexhist_reduce::{process_file, CalibrationInput, ReduceConfig};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    NexhistIo(#[from] nexhist_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] nexhist_core::Error),

    #[error("Reduction error: {0}")]
    Reduce(#[from] nexhist_reduce::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// NeXus event-stream histogramming.
#[derive(Parser)]
#[command(name = "nexhist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Histogram every bank of a NeXus event file
    Histogram {
        /// Input NeXus/HDF5 file
        input: PathBuf,

        /// Lower TOF edge (microseconds)
        #[arg(long, default_value = "0.0")]
        tof_min: f64,

        /// Upper TOF edge (microseconds)
        #[arg(long, default_value = "20000.0")]
        tof_max: f64,

        /// Number of TOF bins
        #[arg(long, default_value = "1000")]
        bins: usize,

        /// JSON file mapping detector id to calibration factor
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// JSON array of masked detector ids
        #[arg(long)]
        masked: Option<PathBuf>,

        /// Identity calibration over an inclusive id range, as LO:HI
        /// (used when no calibration file is given)
        #[arg(long, conflicts_with = "calibration")]
        id_range: Option<String>,

        /// Event budget per disk read chunk
        #[arg(long, default_value = "10000000")]
        events_per_chunk: usize,

        /// Grain size for the event-level reduction
        #[arg(long, default_value = "100000")]
        grainsize: usize,

        /// Pulse filter ranges, as FIRST:SECOND (SECOND omitted = to end);
        /// may be repeated
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Output JSON path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the banks and event counts of a NeXus event file
    Info {
        /// Input NeXus/HDF5 file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Histogram {
            input,
            tof_min,
            tof_max,
            bins,
            calibration,
            masked,
            id_range,
            events_per_chunk,
            grainsize,
            filters,
            output,
        } => {
            let edges = linear_edges(tof_min, tof_max, bins)?;

            let factors = match (&calibration, &id_range) {
                (Some(path), _) => load_calibration(path)?,
                (None, Some(range)) => {
                    let (lo, hi) = parse_id_range(range)?;
                    (lo..=hi).map(|id| (id, 1.0)).collect()
                }
                (None, None) => {
                    return Err(CliError::InvalidArgument(
                        "either --calibration or --id-range is required".to_string(),
                    ));
                }
            };
            let masked = match &masked {
                Some(path) => load_masked(path)?,
                None => HashSet::new(),
            };

            let mut config = ReduceConfig::default()
                .with_events_per_chunk(events_per_chunk)
                .with_grainsize_event(grainsize);
            if !filters.is_empty() {
                let rois = filters
                    .iter()
                    .map(|spec| parse_pulse_roi(spec))
                    .collect::<Result<Vec<_>>>()?;
                config = config.with_time_filter(rois);
            }

            eprintln!("Histogramming: {}", input.display());
            let start = Instant::now();
            let results = process_file(
                &input,
                &config,
                CalibrationInput {
                    factors: &factors,
                    masked: &masked,
                },
                &edges,
            )?;
            let elapsed = start.elapsed();

            let total: u64 = results
                .values()
                .map(|counts| counts.iter().map(|&c| u64::from(c)).sum::<u64>())
                .sum();
            eprintln!(
                "{} bank(s), {} binned event(s) in {:.2?}",
                results.len(),
                total,
                elapsed
            );

            let report = serde_json::json!({
                "edges": edges,
                "banks": results,
            });
            match output {
                Some(path) => fs::write(path, serde_json::to_vec_pretty(&report)?)?,
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
            Ok(())
        }

        Commands::Info { input } => {
            let file = NexusFile::open(&input)?;
            println!("File: {}", input.display());
            for name in file.bank_names()? {
                let bank = file.bank(&name)?;
                let events = NexusFile::bank_event_count(&bank)?;
                println!("  {}: {} event(s)", name, events);
            }
            Ok(())
        }
    }
}

fn load_calibration(path: &PathBuf) -> Result<HashMap<u32, f64>> {
    let raw: HashMap<String, f64> = serde_json::from_slice(&fs::read(path)?)?;
    let mut factors = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let id = key.parse::<u32>().map_err(|_| {
            CliError::InvalidArgument(format!("calibration key {key} is not a detector id"))
        })?;
        factors.insert(id, value);
    }
    Ok(factors)
}

fn load_masked(path: &PathBuf) -> Result<HashSet<u32>> {
    let ids: Vec<u32> = serde_json::from_slice(&fs::read(path)?)?;
    Ok(ids.into_iter().collect())
}

fn parse_id_range(spec: &str) -> Result<(u32, u32)> {
    let (lo, hi) = spec.split_once(':').ok_or_else(|| {
        CliError::InvalidArgument(format!("id range {spec} must be LO:HI"))
    })?;
    let lo = lo
        .parse::<u32>()
        .map_err(|_| CliError::InvalidArgument(format!("bad id range bound: {lo}")))?;
    let hi = hi
        .parse::<u32>()
        .map_err(|_| CliError::InvalidArgument(format!("bad id range bound: {hi}")))?;
    if hi < lo {
        return Err(CliError::InvalidArgument(format!(
            "id range {spec} is inverted"
        )));
    }
    Ok((lo, hi))
}

fn parse_pulse_roi(spec: &str) -> Result<PulseRoi> {
    let (first, second) = spec.split_once(':').ok_or_else(|| {
        CliError::InvalidArgument(format!("filter {spec} must be FIRST:SECOND"))
    })?;
    let first = first
        .parse::<usize>()
        .map_err(|_| CliError::InvalidArgument(format!("bad filter bound: {first}")))?;
    if second.is_empty() {
        return Ok(PulseRoi::to_end(first));
    }
    let second = second
        .parse::<usize>()
        .map_err(|_| CliError::InvalidArgument(format!("bad filter bound: {second}")))?;
    Ok(PulseRoi::new(first, second))
}
