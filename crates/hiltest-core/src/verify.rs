//! Output verification against an expected-output spec
//!
//! The policy matrix is deliberately permissive so partial test suites
//! (smoke runs) still report green: no spec means "pass if anything was
//! received", and a spec path whose file is missing means "nothing to
//! check". Neither path is silent; each prints its rationale.

use std::path::Path;

use serde::Deserialize;

use crate::capture::{CapturedData, ReceptionMode};
use crate::error::DocumentError;
use crate::gpio::PinLevel;
use crate::stimulus::StimulusRecord;

/// How captured lines are compared against the effective expected list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// The captured sequence must equal the expected list
    #[default]
    Exact,
    /// Every expected line must appear somewhere in the capture
    Contains,
}

/// A line that is only expected when the stimulus record shows the given
/// pin was driven to the given level
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionalLine {
    /// Pin to look for in the stimulus record
    pub pin: u8,
    /// Level the pin must have been driven to
    pub level: PinLevel,
    /// The line expected in that case
    pub line: String,
}

/// Acceptance criteria for captured output
///
/// Document form:
///
/// ```json
/// {
///   "reception_mode": "lines",
///   "match": "exact",
///   "expected_lines": ["42"],
///   "conditional_lines": [ { "pin": 17, "level": "high", "line": "button" } ]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpectedSpec {
    /// Framing mode for the capture engine; Lines when absent
    #[serde(default)]
    pub reception_mode: Option<ReceptionMode>,
    /// Comparison mode
    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,
    /// Lines always expected
    #[serde(default)]
    pub expected_lines: Vec<String>,
    /// Lines expected only under the recorded stimulus
    #[serde(default)]
    pub conditional_lines: Vec<ConditionalLine>,
}

impl ExpectedSpec {
    /// Load a spec from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DocumentError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Expected list given what was actually applied
    fn effective_lines(&self, record: &StimulusRecord) -> Vec<&str> {
        let mut lines: Vec<&str> = self.expected_lines.iter().map(String::as_str).collect();
        for cond in &self.conditional_lines {
            if record.pin_saw_level(cond.pin, cond.level) {
                lines.push(cond.line.as_str());
            }
        }
        lines
    }
}

/// Reception mode for the capture engine, resolved from the expected-output
/// document when one is present on disk
///
/// Never fatal: an unreadable document only logs a warning here and falls
/// back to Lines; verification proper will complain about it later.
pub fn resolve_reception_mode(expected: Option<&Path>) -> ReceptionMode {
    let Some(path) = expected else {
        return ReceptionMode::default();
    };
    if !path.exists() {
        return ReceptionMode::default();
    }
    match ExpectedSpec::from_file(path) {
        Ok(spec) => {
            let mode = spec.reception_mode.unwrap_or_default();
            log::info!("using reception mode {:?} from {}", mode, path.display());
            mode
        }
        Err(e) => {
            log::warn!(
                "could not read reception_mode from {}: {}; defaulting to lines",
                path.display(),
                e
            );
            ReceptionMode::default()
        }
    }
}

/// Verification result with operator-facing narrative
#[derive(Debug, Clone)]
pub struct Verification {
    /// Whether the comparison (or permissive default) passed
    pub passed: bool,
    /// Rationale for the result, always printed
    pub narrative: String,
}

impl Verification {
    fn pass(narrative: impl Into<String>) -> Self {
        Self {
            passed: true,
            narrative: narrative.into(),
        }
    }

    fn fail(narrative: impl Into<String>) -> Self {
        Self {
            passed: false,
            narrative: narrative.into(),
        }
    }
}

/// Judge captured data against the expected-output spec
///
/// Policy matrix:
/// - no spec path: pass iff any data was received
/// - spec path given but file missing: pass (nothing to check)
/// - spec present but no data: fail (cannot verify without data)
/// - spec present and data present: compare, parameterized by the record
pub fn check_output(
    captured: Option<&CapturedData>,
    expected: Option<&Path>,
    record: &StimulusRecord,
) -> Verification {
    let Some(path) = expected else {
        return match captured {
            Some(_) => Verification::pass(
                "no expected-output spec given; data was received, counting as pass",
            ),
            None => Verification::fail("no expected-output spec given and no data was received"),
        };
    };

    if !path.exists() {
        return Verification::pass(format!(
            "expected-output file '{}' not found; nothing to check, counting as pass",
            path.display()
        ));
    }

    let Some(data) = captured else {
        return Verification::fail("expected output is defined but no data was received");
    };

    let spec = match ExpectedSpec::from_file(path) {
        Ok(spec) => spec,
        Err(e) => return Verification::fail(format!("could not load expected-output spec: {}", e)),
    };

    compare(data, &spec, record)
}

fn compare(data: &CapturedData, spec: &ExpectedSpec, record: &StimulusRecord) -> Verification {
    let expected = spec.effective_lines(record);

    match data {
        CapturedData::Lines(lines) => match spec.match_mode {
            MatchMode::Exact => {
                let got: Vec<&str> = lines.iter().map(String::as_str).collect();
                if got == expected {
                    Verification::pass(format!("output matched all {} expected lines", expected.len()))
                } else {
                    Verification::fail(format!(
                        "output mismatch: expected {:?}, got {:?}",
                        expected, got
                    ))
                }
            }
            MatchMode::Contains => {
                let missing: Vec<&str> = expected
                    .iter()
                    .filter(|e| !lines.iter().any(|l| l.as_str() == **e))
                    .copied()
                    .collect();
                if missing.is_empty() {
                    Verification::pass(format!(
                        "all {} expected lines present in output",
                        expected.len()
                    ))
                } else {
                    Verification::fail(format!("expected lines missing from output: {:?}", missing))
                }
            }
        },
        CapturedData::Raw(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            let missing: Vec<&str> = expected.iter().filter(|e| !text.contains(*e)).copied().collect();
            if missing.is_empty() {
                Verification::pass(format!(
                    "all {} expected values present in raw output",
                    expected.len()
                ))
            } else {
                Verification::fail(format!(
                    "expected values missing from raw output: {:?}",
                    missing
                ))
            }
        }
    }
}
