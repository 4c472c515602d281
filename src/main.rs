//! hiltest - Hardware-in-the-loop test runner
//!
//! Flashes a firmware image onto the target, replays a stimulus plan on its
//! input pins, captures the serial output under a dual-timeout budget, and
//! judges it against an expected-output spec.
//!
//! Exit codes: 0 = test passed; 1 = test failed or fatal pre-run error
//! (including a flashing failure); 2 = run aborted before a verdict could
//! be computed.

mod cli;

use clap::Parser;
use std::time::Duration;

use cli::{Cli, GpioMode};
use hiltest_bench::HardwareBench;
use hiltest_core::flash::FlashRequest;
use hiltest_core::gpio::PinNumbering;
use hiltest_core::pipeline::{self, PipelineConfig, TestVerdict};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    println!("--- HIL Test Run Start ---");
    println!("Firmware:      {}", cli.code_to_test.display());
    println!("Input actions: {}", cli.input_values.display());
    match &cli.expected_values {
        Some(path) => println!("Expected:      {}", path.display()),
        None => println!("Expected:      not provided; output checking will be skipped"),
    }
    println!("Serial:        {} @ {} bps", cli.serial_port, cli.baud_rate);
    println!("GPIO mode:     {}", cli.gpio_mode.label());
    if let Some(serial) = &cli.stlink_serial {
        println!("ST-Link:       {}", serial);
    }

    // Configuration problems are reported before any hardware is touched
    if !cli.input_values.exists() {
        eprintln!(
            "Error: input values file '{}' not found",
            cli.input_values.display()
        );
        std::process::exit(1);
    }

    let flash = (!cli.skip_flash).then(|| FlashRequest {
        firmware: cli.code_to_test.clone(),
        address: cli.flash_address.clone(),
        tool: cli.st_flash_cmd.clone(),
        programmer_serial: cli.stlink_serial.clone(),
    });

    let config = PipelineConfig {
        flash,
        stimulus_plan: cli.input_values.clone(),
        expected_spec: cli.expected_values.clone(),
        serial_port: cli.serial_port.clone(),
        baud_rate: cli.baud_rate,
        gpio_numbering: match cli.gpio_mode {
            GpioMode::Bcm => PinNumbering::Bcm,
            GpioMode::Board => PinNumbering::Board,
        },
        overall_timeout: Duration::from_secs(cli.receive_timeout),
        idle_timeout: None,
        boot_delay: pipeline::DEFAULT_BOOT_DELAY,
        settle_delay: pipeline::DEFAULT_SETTLE_DELAY,
    };

    let mut bench = HardwareBench::new();
    let report = pipeline::run_test(&mut bench, &config);

    println!("\n--- HIL Test Run End ---");
    match report.verdict {
        TestVerdict::Passed => println!("HIL Test Result: PASSED"),
        TestVerdict::Failed => println!("HIL Test Result: FAILED ({})", report.narrative),
        TestVerdict::Incomplete => {
            println!("Run did not complete: {}", report.narrative)
        }
    }

    std::process::exit(report.exit_code());
}
