//! Stimulus plan loading and replay
//!
//! A plan is an ordered set of hardware input actions loaded from a JSON
//! document; the driver replays it strictly in declaration order against a
//! live GPIO handle and returns the trace of what was actually applied.

use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DocumentError, StimulusError};
use crate::gpio::{GpioController, PinLevel};

/// One hardware input action: drive a pin and hold the level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StimulusAction {
    /// Pin number in the configured numbering scheme
    pub pin: u8,
    /// Level to drive
    pub level: PinLevel,
    /// How long to hold the level before the next action, in milliseconds
    #[serde(default)]
    pub hold_ms: u64,
}

/// An ordered set of input actions; immutable once loaded
///
/// Document form:
///
/// ```json
/// { "actions": [ { "pin": 17, "level": "high", "hold_ms": 500 } ] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StimulusPlan {
    /// Actions in execution order; an empty list is a valid plan
    #[serde(default)]
    pub actions: Vec<StimulusAction>,
}

impl StimulusPlan {
    /// Load a plan from a JSON file
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
}

/// Trace of the actions that were actually driven onto the hardware
///
/// Used downstream as verification context. An empty record from a
/// zero-action plan is a successful run, not a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StimulusRecord {
    /// Applied actions, in the order they were driven
    pub applied: Vec<StimulusAction>,
}

impl StimulusRecord {
    /// Whether the record shows `pin` driven to `level` at any point
    pub fn pin_saw_level(&self, pin: u8, level: PinLevel) -> bool {
        self.applied
            .iter()
            .any(|a| a.pin == pin && a.level == level)
    }
}

/// Replay the plan strictly in declaration order
///
/// No reordering and no concurrency between actions; hold durations are the
/// only timing an action carries. A GPIO failure mid-sequence is critical
/// and aborts the run with whatever had been applied discarded.
pub fn apply_plan(
    plan: &StimulusPlan,
    gpio: &mut dyn GpioController,
) -> Result<StimulusRecord, StimulusError> {
    let mut record = StimulusRecord::default();

    for (idx, action) in plan.actions.iter().enumerate() {
        log::info!(
            "stimulus {}/{}: pin {} -> {:?} (hold {} ms)",
            idx + 1,
            plan.actions.len(),
            action.pin,
            action.level,
            action.hold_ms
        );
        gpio.set_pin(action.pin, action.level)?;
        if action.hold_ms > 0 {
            thread::sleep(Duration::from_millis(action.hold_ms));
        }
        record.applied.push(*action);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GpioError;

    /// Records sets; fails once the budget is exhausted
    struct FakeGpio {
        sets: Vec<(u8, PinLevel)>,
        budget: Option<usize>,
    }

    impl FakeGpio {
        fn new() -> Self {
            Self {
                sets: Vec::new(),
                budget: None,
            }
        }

        fn failing_after(n: usize) -> Self {
            Self {
                sets: Vec::new(),
                budget: Some(n),
            }
        }
    }

    impl GpioController for FakeGpio {
        fn set_pin(&mut self, pin: u8, level: PinLevel) -> Result<(), GpioError> {
            if self.budget == Some(self.sets.len()) {
                return Err(GpioError::SetPin {
                    pin,
                    reason: "fake handle became unusable".into(),
                });
            }
            self.sets.push((pin, level));
            Ok(())
        }
    }

    fn plan(actions: Vec<StimulusAction>) -> StimulusPlan {
        StimulusPlan { actions }
    }

    fn act(pin: u8, level: PinLevel) -> StimulusAction {
        StimulusAction {
            pin,
            level,
            hold_ms: 0,
        }
    }

    #[test]
    fn actions_apply_in_declaration_order() {
        let mut gpio = FakeGpio::new();
        let p = plan(vec![
            act(17, PinLevel::High),
            act(27, PinLevel::Low),
            act(17, PinLevel::Low),
        ]);

        let record = apply_plan(&p, &mut gpio).unwrap();

        assert_eq!(
            gpio.sets,
            vec![
                (17, PinLevel::High),
                (27, PinLevel::Low),
                (17, PinLevel::Low)
            ]
        );
        assert_eq!(record.applied, p.actions);
        assert!(record.pin_saw_level(17, PinLevel::High));
        assert!(!record.pin_saw_level(27, PinLevel::High));
    }

    #[test]
    fn empty_plan_yields_empty_record() {
        let mut gpio = FakeGpio::new();
        let record = apply_plan(&plan(vec![]), &mut gpio).unwrap();
        assert!(record.applied.is_empty());
    }

    #[test]
    fn mid_sequence_failure_is_critical() {
        let mut gpio = FakeGpio::failing_after(1);
        let p = plan(vec![act(17, PinLevel::High), act(27, PinLevel::High)]);

        assert!(apply_plan(&p, &mut gpio).is_err());
        // The first action did land before the handle failed
        assert_eq!(gpio.sets, vec![(17, PinLevel::High)]);
    }

    #[test]
    fn plan_parses_with_defaulted_hold() {
        let p: StimulusPlan =
            serde_json::from_str(r#"{"actions": [{"pin": 4, "level": "low"}]}"#).unwrap();
        assert_eq!(p.actions, vec![act(4, PinLevel::Low)]);
    }
}
