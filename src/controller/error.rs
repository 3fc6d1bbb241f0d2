//! Error definitions for the controller subsystem

use thiserror::Error;

/// Errors raised while acquiring or decoding controller reports
///
/// `ReadFailure` and `InvalidReport` are delivered on the error stream and
/// never stop the acquisition loop. The remaining variants are returned
/// directly from the handle operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The byte source failed a read, or returned no data
    #[error("Read failure: {0}")]
    ReadFailure(#[from] std::io::Error),

    /// A report was too short to hold every decoded field
    #[error("Invalid report: got {got} bytes, need at least {need}")]
    InvalidReport { got: usize, need: usize },

    /// An operation was used in a way the handle does not allow
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Settings that cannot produce a working loop
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}
