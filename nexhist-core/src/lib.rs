//! nexhist-core: Core types for NeXus event histogramming.
//!
//! This crate provides the foundational types shared by the I/O and
//! reduction layers: pulse/event regions of interest, per-bank
//! calibration tables, and bin-edge helpers.
//!

pub mod binning;
pub mod calibration;
pub mod error;
pub mod roi;

pub use binning::{bin_index, linear_edges, validate_edges};
pub use calibration::{BankCalibration, IGNORE_PIXEL};
pub use error::{Error, Result};
pub use roi::{EventRoi, PulseRoi};
