//! Serial reception seam
//!
//! The capture engine reads target output through this trait. It only needs
//! one operation: a bounded wait for the next chunk of bytes.

use std::time::Duration;

use crate::error::SerialError;

/// Byte-stream seam for the capture engine
pub trait SerialChannel {
    /// Wait up to `timeout` for data and place it in `buf`
    ///
    /// Returns the number of bytes received; 0 means the wait elapsed with
    /// nothing arriving, which is not an error. An `Err` means the channel
    /// itself failed and the capture session cannot continue.
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SerialError>;
}
