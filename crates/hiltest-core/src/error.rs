//! Error types for the HIL pipeline
//!
//! Lower layers never swallow failures: each returns one of these typed
//! errors upward, and only the orchestrator decides abort-vs-continue.

use std::path::PathBuf;

use thiserror::Error;

/// GPIO backend errors
#[derive(Debug, Error)]
pub enum GpioError {
    /// Opening the GPIO device or requesting a line failed
    #[error("GPIO init failed: {0}")]
    Init(String),

    /// Driving a line failed after the handle was established
    #[error("failed to drive pin {pin}: {reason}")]
    SetPin {
        /// Pin number as given in the stimulus plan
        pin: u8,
        /// Backend-specific failure description
        reason: String,
    },

    /// The pin number does not exist in the selected numbering scheme
    #[error("pin {0} is not valid in the selected numbering scheme")]
    UnknownPin(u8),
}

/// Serial channel errors
#[derive(Debug, Error)]
pub enum SerialError {
    /// The port could not be opened at all (fatal connection error)
    #[error("failed to open serial port {port}: {reason}")]
    Connect {
        /// Port name or device path
        port: String,
        /// Backend-specific failure description
        reason: String,
    },

    /// The channel dropped or errored mid-capture
    #[error("serial I/O error: {0}")]
    Io(String),
}

/// Errors loading one of the JSON configuration documents
/// (stimulus plan, expected-output spec)
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid JSON of the expected shape
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path that was being parsed
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },
}

/// Critical failure while applying a stimulus plan
///
/// Distinct from an empty-but-successful run: the driver got partway
/// through the plan and the hardware handle became unusable.
#[derive(Debug, Error)]
pub enum StimulusError {
    /// The GPIO handle failed mid-sequence
    #[error(transparent)]
    Gpio(#[from] GpioError),
}
