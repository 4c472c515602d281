//! Flash Controller
//!
//! Invokes the external flashing utility (st-flash by default), classifies
//! its outcome from heterogeneous tool output, and best-effort resets the
//! target afterwards. One attempt per request; retry policy, if any, belongs
//! to the caller and this pipeline performs none.

mod classify;

pub use classify::{extract_signals, is_success, FlashSignal};

use std::path::PathBuf;
use std::process::Command;

/// A single flashing attempt against the target
///
/// The programmer serial number threads explicitly through both the write
/// and the reset command rather than living in ambient configuration.
#[derive(Debug, Clone)]
pub struct FlashRequest {
    /// Firmware image to write (.bin/.hex); must exist on disk
    pub firmware: PathBuf,
    /// Target memory address, passed through verbatim (e.g. "0x08000000")
    pub address: String,
    /// Flashing utility invocation name
    pub tool: String,
    /// ST-Link programmer serial number; the tool picks the first probe
    /// it finds when unset
    pub programmer_serial: Option<String>,
}

impl FlashRequest {
    /// Tool command with the programmer selector applied
    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.tool);
        if let Some(serial) = &self.programmer_serial {
            cmd.arg("--serial").arg(serial);
        }
        cmd
    }
}

/// Result of one flashing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashOutcome {
    /// The write was judged successful
    Success,
    /// The write failed, with the reason for diagnostics
    Failure(String),
}

/// Flash the firmware and judge the result
///
/// The tool's stdout and stderr are logged verbatim even on success, to
/// support postmortems of flaky hardware. A process-launch failure (tool
/// not installed) is a `Failure` like any other.
pub fn flash_firmware(req: &FlashRequest) -> FlashOutcome {
    if !req.firmware.exists() {
        return FlashOutcome::Failure(format!(
            "firmware file not found: {}",
            req.firmware.display()
        ));
    }

    let mut cmd = req.base_command();
    cmd.arg("write").arg(&req.firmware).arg(&req.address);
    log::info!(
        "flashing with: {} write {} {}",
        req.tool,
        req.firmware.display(),
        req.address
    );

    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) => {
            return FlashOutcome::Failure(format!(
                "could not launch '{}': {} (is the flashing tool installed and in PATH?)",
                req.tool, e
            ));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        log::info!("{} stdout:\n{}", req.tool, stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        log::info!("{} stderr:\n{}", req.tool, stderr.trim_end());
    }

    let signals = classify::extract_signals(output.status.code(), &stderr);
    log::debug!(
        "flash evidence: {:?} (exit status {:?})",
        signals,
        output.status.code()
    );

    if classify::is_success(&signals) {
        log::info!("firmware flashed to target");
        reset_target(req);
        FlashOutcome::Success
    } else {
        FlashOutcome::Failure(format!(
            "flash tool exited with status {:?} and its output did not indicate success",
            output.status.code()
        ))
    }
}

/// Best-effort target reset after a successful flash
///
/// A reset failure is logged but does not downgrade the flash outcome;
/// flashing success stands on its own.
fn reset_target(req: &FlashRequest) {
    let mut cmd = req.base_command();
    cmd.arg("reset");
    log::info!("resetting target with: {} reset", req.tool);

    match cmd.output() {
        Ok(out) if out.status.success() => log::info!("target reset"),
        Ok(out) => log::warn!(
            "target reset failed (status {:?}): {}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr).trim_end()
        ),
        Err(e) => log::warn!("could not launch '{} reset': {}", req.tool, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_firmware_fails_without_launching_anything() {
        let req = FlashRequest {
            firmware: PathBuf::from("/nonexistent/firmware.bin"),
            address: "0x08000000".into(),
            // Deliberately bogus: must never be invoked
            tool: "hiltest-no-such-flash-tool".into(),
            programmer_serial: None,
        };
        match flash_firmware(&req) {
            FlashOutcome::Failure(reason) => assert!(reason.contains("not found")),
            FlashOutcome::Success => panic!("missing firmware classified as success"),
        }
    }

    #[test]
    fn missing_tool_is_a_failure_with_cause() {
        let fw = std::env::temp_dir().join(format!("hiltest-fw-{}.bin", std::process::id()));
        std::fs::File::create(&fw)
            .and_then(|mut f| f.write_all(b"\x00\x01"))
            .unwrap();

        let req = FlashRequest {
            firmware: fw.clone(),
            address: "0x08000000".into(),
            tool: "hiltest-no-such-flash-tool".into(),
            programmer_serial: None,
        };
        match flash_firmware(&req) {
            FlashOutcome::Failure(reason) => assert!(reason.contains("could not launch")),
            FlashOutcome::Success => panic!("missing tool classified as success"),
        }
        std::fs::remove_file(&fw).ok();
    }

    #[cfg(unix)]
    #[test]
    fn fake_tool_with_success_banner_classifies_as_success() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir();
        let fw = dir.join(format!("hiltest-fw-ok-{}.bin", std::process::id()));
        std::fs::write(&fw, b"\x00").unwrap();

        // Fake st-flash: prints the success banner to stderr and exits 0
        let tool = dir.join(format!("hiltest-fake-flash-{}", std::process::id()));
        std::fs::write(
            &tool,
            "#!/bin/sh\necho 'Flash written and verified successfully!' >&2\nexit 0\n",
        )
        .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let req = FlashRequest {
            firmware: fw.clone(),
            address: "0x08000000".into(),
            tool: tool.to_string_lossy().into_owned(),
            programmer_serial: None,
        };
        // The reset sub-invocation also runs the fake tool; it exits 0 so the
        // best-effort reset is quiet.
        assert_eq!(flash_firmware(&req), FlashOutcome::Success);

        std::fs::remove_file(&fw).ok();
        std::fs::remove_file(&tool).ok();
    }

    #[cfg(unix)]
    #[test]
    fn fake_tool_with_error_output_classifies_as_failure() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir();
        let fw = dir.join(format!("hiltest-fw-bad-{}.bin", std::process::id()));
        std::fs::write(&fw, b"\x00").unwrap();

        let tool = dir.join(format!("hiltest-fake-flash-bad-{}", std::process::id()));
        std::fs::write(&tool, "#!/bin/sh\necho 'ERROR: no target' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let req = FlashRequest {
            firmware: fw.clone(),
            address: "0x08000000".into(),
            tool: tool.to_string_lossy().into_owned(),
            programmer_serial: None,
        };
        assert!(matches!(flash_firmware(&req), FlashOutcome::Failure(_)));

        std::fs::remove_file(&fw).ok();
        std::fs::remove_file(&tool).ok();
    }
}
