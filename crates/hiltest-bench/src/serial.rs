//! Serial channel over the serialport crate
//!
//! 8N1, no flow control, which is what STM32 UART logging conventionally
//! uses. The capture engine supplies a fresh timeout on every poll, so the
//! port timeout is just re-armed per call.

use std::io::Read;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use hiltest_core::error::SerialError;
use hiltest_core::serial::SerialChannel;

/// Serial channel over a physical port
pub struct SerialPortChannel {
    port: Box<dyn SerialPort>,
}

impl SerialPortChannel {
    /// Open `device` at `baud_rate`
    ///
    /// Failure here is a fatal connection error for the run, not a capture
    /// timeout.
    pub fn open(device: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let port = serialport::new(device, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_secs(1))
            .open()
            .map_err(|e| SerialError::Connect {
                port: device.to_string(),
                reason: e.to_string(),
            })?;

        log::info!("Opened serial port {} at {} baud", device, baud_rate);
        Ok(Self { port })
    }
}

impl SerialChannel for SerialPortChannel {
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SerialError> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| SerialError::Io(e.to_string()))?;

        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(SerialError::Io(e.to_string())),
        }
    }
}
