//! Error types for nexhist-core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for nexhist operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Detector id range with `idmax` below `idmin`.
    #[error("inverted detector id range: [{idmin}, {idmax}]")]
    InvertedIdRange { idmin: u32, idmax: u32 },

    /// Bin-edge vector too short or not strictly increasing.
    #[error("invalid bin edges: {0}")]
    InvalidEdges(String),

    /// Event range with `stop` below `start`.
    #[error("inverted event range: [{start}, {stop})")]
    InvertedEventRange { start: u64, stop: u64 },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
