//! hiltest-core - Core library for hardware-in-the-loop firmware testing
//!
//! This crate implements the test orchestration pipeline: flash the firmware
//! onto the target, replay a stimulus plan against its input pins, capture
//! the serial output under a dual-timeout budget, and judge the capture
//! against an expected-output spec.
//!
//! Physical hardware is reached through two narrow seams, [`gpio::GpioController`]
//! and [`serial::SerialChannel`]; concrete backends live in separate crates
//! (`hiltest-bench` for real hardware, `hiltest-dummy` for tests). The
//! pipeline itself is strictly sequential: flashing, stimulus and capture all
//! touch one shared physical target and must not overlap.
//!
//! # Example
//!
//! ```ignore
//! use hiltest_core::pipeline::{run_test, PipelineConfig};
//!
//! let mut bench = hiltest_bench::HardwareBench::new();
//! let report = run_test(&mut bench, &config);
//! std::process::exit(report.exit_code());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod capture;
pub mod error;
pub mod flash;
pub mod gpio;
pub mod pipeline;
pub mod serial;
pub mod stimulus;
pub mod verify;

pub use pipeline::{run_test, PipelineConfig, RunReport, Stage, TestBench, TestVerdict};
