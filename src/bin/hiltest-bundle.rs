//! hiltest-bundle - Run a HIL test described by a JSON bundle
//!
//! The bundle names the firmware, the stimulus plan and (optionally) the
//! expected-output spec; paths are resolved relative to the bundle file's
//! own directory unless absolute. CLI flags override bundle fields. The
//! resolved run is delegated to the `hiltest` binary found next to this
//! one, and its exit code is propagated.

use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "hiltest-bundle")]
#[command(
    author,
    version,
    about = "Run a HIL test from a JSON bundle file",
    long_about = None
)]
struct Cli {
    /// Path to the JSON test bundle (fields: code_to_test, input_values,
    /// expected_values)
    test_script: PathBuf,

    /// Override the bundle's input_values
    #[arg(long)]
    input_values: Option<PathBuf>,

    /// Override the bundle's expected_values
    #[arg(long)]
    expected_values: Option<PathBuf>,

    /// Board to use (maps to the ST-Link programmer serial number)
    #[arg(long)]
    board: Option<String>,

    /// Serial port the target logs on
    #[arg(long)]
    serial_port: Option<String>,

    /// Baud rate for serial communication
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Skip the flashing step
    #[arg(long)]
    skip_flash: bool,

    /// Command for the st-flash utility
    #[arg(long)]
    st_flash_cmd: Option<String>,

    /// Flash memory address to write to
    #[arg(long)]
    flash_address: Option<String>,

    /// GPIO pin numbering mode (BCM or BOARD)
    #[arg(long)]
    gpio_mode: Option<String>,

    /// Overall timeout in seconds for receiving serial data
    #[arg(long)]
    receive_timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TestBundle {
    code_to_test: String,
    input_values: Option<String>,
    expected_values: Option<String>,
}

/// Resolve a bundle-relative path against the bundle's directory
fn resolve(base: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// The primary runner binary, expected next to the current executable
fn runner_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("hiltest")))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("hiltest"))
}

fn fatal(message: String) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if !cli.test_script.exists() {
        fatal(format!(
            "test bundle '{}' not found",
            cli.test_script.display()
        ));
    }

    let text = match std::fs::read_to_string(&cli.test_script) {
        Ok(text) => text,
        Err(e) => fatal(format!(
            "could not read test bundle '{}': {}",
            cli.test_script.display(),
            e
        )),
    };
    let bundle: TestBundle = match serde_json::from_str(&text) {
        Ok(bundle) => bundle,
        Err(e) => fatal(format!(
            "could not parse test bundle '{}': {}",
            cli.test_script.display(),
            e
        )),
    };

    let base = cli
        .test_script
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    // Firmware always comes from the bundle
    let firmware = resolve(&base, &bundle.code_to_test);
    if !firmware.exists() {
        fatal(format!(
            "firmware file '{}' (from 'code_to_test' in the bundle) not found",
            firmware.display()
        ));
    }

    // Stimulus plan: CLI override beats the bundle; one of them is required
    let input_values = match (&cli.input_values, &bundle.input_values) {
        (Some(path), _) => path.clone(),
        (None, Some(value)) => resolve(&base, value),
        (None, None) => fatal(format!(
            "'input_values' not found in '{}' and not provided via --input-values",
            cli.test_script.display()
        )),
    };
    if !input_values.exists() {
        fatal(format!(
            "input values file '{}' not found",
            input_values.display()
        ));
    }

    // Expected spec is optional everywhere
    let expected_values = match (&cli.expected_values, &bundle.expected_values) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(value)) => Some(resolve(&base, value)),
        (None, None) => None,
    };
    if let Some(path) = &expected_values {
        if !path.exists() {
            fatal(format!(
                "expected values file '{}' not found",
                path.display()
            ));
        }
    }

    let runner = runner_path();
    let mut cmd = Command::new(&runner);
    cmd.arg("--code-to-test")
        .arg(&firmware)
        .arg("--input-values")
        .arg(&input_values);
    if let Some(path) = &expected_values {
        cmd.arg("--expected-values").arg(path);
    }
    if let Some(board) = &cli.board {
        cmd.arg("--stlink-serial").arg(board);
    }
    if let Some(port) = &cli.serial_port {
        cmd.arg("--serial-port").arg(port);
    }
    if let Some(baud) = cli.baud_rate {
        cmd.arg("--baud-rate").arg(baud.to_string());
    }
    if cli.skip_flash {
        cmd.arg("--skip-flash");
    }
    if let Some(tool) = &cli.st_flash_cmd {
        cmd.arg("--st-flash-cmd").arg(tool);
    }
    if let Some(address) = &cli.flash_address {
        cmd.arg("--flash-address").arg(address);
    }
    if let Some(mode) = &cli.gpio_mode {
        cmd.arg("--gpio-mode").arg(mode);
    }
    if let Some(timeout) = cli.receive_timeout {
        cmd.arg("--receive-timeout").arg(timeout.to_string());
    }

    log::info!("delegating to {}: {:?}", runner.display(), cmd);

    match cmd.status() {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(e) => fatal(format!(
            "could not launch runner '{}': {}",
            runner.display(),
            e
        )),
    }
}
