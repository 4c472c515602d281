//! hiltest-bench - Physical test bench backends
//!
//! Concrete implementations of the core's hardware seams: GPIO via the
//! Linux character device interface (gpiocdev) and serial reception via the
//! serialport crate. The pipeline opens each handle only for the stage that
//! needs it.

mod gpio;
mod serial;

pub use gpio::{CdevGpio, DEFAULT_GPIOCHIP};
pub use serial::SerialPortChannel;

use hiltest_core::error::{GpioError, SerialError};
use hiltest_core::gpio::PinNumbering;
use hiltest_core::pipeline::TestBench;

/// Physical bench: opens real GPIO and serial resources on demand
pub struct HardwareBench {
    gpiochip: String,
}

impl HardwareBench {
    /// Bench using the default GPIO character device
    pub fn new() -> Self {
        Self {
            gpiochip: DEFAULT_GPIOCHIP.to_string(),
        }
    }

    /// Bench using a specific GPIO character device path
    pub fn with_gpiochip(gpiochip: impl Into<String>) -> Self {
        Self {
            gpiochip: gpiochip.into(),
        }
    }
}

impl Default for HardwareBench {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBench for HardwareBench {
    type Gpio = CdevGpio;
    type Serial = SerialPortChannel;

    fn open_gpio(&mut self, numbering: PinNumbering) -> Result<Self::Gpio, GpioError> {
        CdevGpio::open(&self.gpiochip, numbering)
    }

    fn open_serial(&mut self, port: &str, baud_rate: u32) -> Result<Self::Serial, SerialError> {
        SerialPortChannel::open(port, baud_rate)
    }
}
