//! CLI argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// GPIO pin numbering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GpioMode {
    /// Broadcom SoC channel numbers
    #[value(name = "BCM")]
    Bcm,
    /// Physical 40-pin header positions
    #[value(name = "BOARD")]
    Board,
}

impl GpioMode {
    /// Operator-facing name, same spelling as the CLI value
    pub fn label(self) -> &'static str {
        match self {
            GpioMode::Bcm => "BCM",
            GpioMode::Board => "BOARD",
        }
    }
}

#[derive(Parser)]
#[command(name = "hiltest")]
#[command(
    author,
    version,
    about = "HIL test runner: flashes firmware, emulates inputs, captures serial output, checks it",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the firmware image (.bin/.hex) to flash
    #[arg(long)]
    pub code_to_test: PathBuf,

    /// Path to the JSON stimulus plan (hardware input actions)
    #[arg(long)]
    pub input_values: PathBuf,

    /// Path to the JSON expected-output spec; output checking is skipped if
    /// not provided
    #[arg(long)]
    pub expected_values: Option<PathBuf>,

    /// Serial port the target logs on
    #[arg(long, default_value = "/dev/ttyACM0")]
    pub serial_port: String,

    /// Baud rate for serial communication
    #[arg(long, default_value_t = 115_200)]
    pub baud_rate: u32,

    /// Skip the flashing step
    #[arg(long)]
    pub skip_flash: bool,

    /// Command for the st-flash utility
    #[arg(long, default_value = "st-flash")]
    pub st_flash_cmd: String,

    /// Flash memory address to write to
    #[arg(long, default_value = "0x08000000")]
    pub flash_address: String,

    /// ST-Link programmer serial number; the first probe found is used
    /// if not provided
    #[arg(long)]
    pub stlink_serial: Option<String>,

    /// GPIO pin numbering mode
    #[arg(long, value_enum, default_value_t = GpioMode::Bcm)]
    pub gpio_mode: GpioMode,

    /// Overall timeout in seconds for receiving serial data
    #[arg(long, default_value_t = 10)]
    pub receive_timeout: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpio_mode_labels_match_the_cli_spelling() {
        assert_eq!(GpioMode::Bcm.label(), "BCM");
        assert_eq!(GpioMode::Board.label(), "BOARD");
    }
}
