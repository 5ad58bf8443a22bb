//! nexhist-reduce: Chunked, parallel histogramming of NeXus event banks.
//!
//! Three nested levels of parallelism, all on the rayon pool: banks are
//! independent tasks; within a chunk the detector-id and TOF slab reads
//! fork and join; within the loaded chunk the events reduce in parallel
//! with a private histogram per split.
//!

mod bank;
mod chunk;
mod config;
mod error;
mod histogram;
mod pipeline;

pub use bank::{BankProcessor, CalibrationInput, SplitTarget};
pub use chunk::pop_chunk;
pub use config::ReduceConfig;
pub use error::{Error, Result};
pub use histogram::{histogram_events, EventHistogram};
pub use pipeline::process_file;
