//! Reduction error types.

use thiserror::Error;

/// Result type for reduction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reduction error types.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O layer error (missing dataset, failed read).
    #[error("I/O error: {0}")]
    Io(#[from] nexhist_io::Error),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] nexhist_core::Error),

    /// Output storage does not match the bin-edge vector.
    #[error("output has {got} bins, expected {expected}")]
    OutputMismatch { expected: usize, got: usize },

    /// Split target index outside the supplied output set.
    #[error("split target {target} outside {outputs} output(s)")]
    BadSplitTarget { target: usize, outputs: usize },
}
