//! GPIO control seam
//!
//! The pipeline drives test-input pins through this trait; the physical
//! driver (Linux cdev, or an in-memory fake) lives behind it.

use serde::Deserialize;

use crate::error::GpioError;

/// Logic level to drive on an output pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinLevel {
    /// Drive the pin low
    Low,
    /// Drive the pin high
    High,
}

/// Pin numbering scheme, matching the CLI's `--gpio-mode` choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinNumbering {
    /// Broadcom SoC channel numbers (GPIO line offsets)
    Bcm,
    /// Physical positions on the 40-pin header
    Board,
}

/// Hardware-control seam for driving test-input pins
///
/// Implementations own the underlying device handle; the pipeline holds the
/// controller only for the stimulus stage and drops it before the serial
/// channel is opened.
pub trait GpioController {
    /// Drive `pin` to `level`
    ///
    /// Pin numbers are interpreted in the numbering scheme the controller
    /// was opened with.
    fn set_pin(&mut self, pin: u8, level: PinLevel) -> Result<(), GpioError>;
}
