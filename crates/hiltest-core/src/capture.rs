//! Dual-timeout serial capture engine
//!
//! Listens on a serial channel until either the overall timeout (hard
//! wall-clock bound) or the idle timeout (no new data for this long after at
//! least one byte was seen) ends the session. The idle timeout is what lets
//! the engine return promptly once the device has clearly finished
//! transmitting. Payload semantics are not interpreted here, only framing
//! and timing.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::SerialError;
use crate::serial::SerialChannel;

/// Framing applied to received bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceptionMode {
    /// Newline-delimited records; CR stripped, trailing empty line dropped
    #[default]
    Lines,
    /// Opaque byte accumulation
    Raw,
}

/// Default granularity of the cooperative elapsed-time polls
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Capture session parameters
///
/// Both timeouts are first-class so tests can shrink them to milliseconds.
/// The caller is responsible for arranging idle <= overall.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Framing mode
    pub mode: ReceptionMode,
    /// Hard upper bound on total capture duration
    pub overall_timeout: Duration,
    /// Ends the session early once data has been seen and then stops
    pub idle_timeout: Duration,
    /// Upper bound on any single blocking wait inside the engine
    pub poll_interval: Duration,
}

impl CaptureConfig {
    /// New config with the default poll interval
    pub fn new(mode: ReceptionMode, overall_timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            mode,
            overall_timeout,
            idle_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Caller-side default when no idle timeout is configured:
    /// half the overall timeout, floored at one second
    pub fn derive_idle_timeout(overall_timeout: Duration) -> Duration {
        (overall_timeout / 2).max(Duration::from_secs(1))
    }
}

/// What a capture session produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedData {
    /// Newline-framed records
    Lines(Vec<String>),
    /// Unframed bytes
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    /// Nothing received yet; only the overall timeout applies
    Idle,
    /// At least one byte seen; the idle timeout is armed
    Receiving,
    /// Overall budget exhausted
    TimedOut,
}

/// Listen on `chan` under the dual-timeout policy
///
/// The engine polls elapsed time cooperatively: every blocking wait is
/// bounded by whichever deadline is nearest, so the overall timeout is never
/// exceeded regardless of channel behavior. Returns `Ok(None)` if nothing
/// arrived at all.
pub fn capture(
    chan: &mut dyn SerialChannel,
    cfg: &CaptureConfig,
) -> Result<Option<CapturedData>, SerialError> {
    let started = Instant::now();
    let mut state = CaptureState::Idle;
    let mut last_rx = started;
    let mut received: Vec<u8> = Vec::new();
    let mut scratch = [0u8; 512];

    loop {
        let elapsed = started.elapsed();
        if elapsed >= cfg.overall_timeout {
            state = CaptureState::TimedOut;
        }

        match state {
            CaptureState::TimedOut => {
                log::debug!(
                    "capture hit the overall timeout of {:?} with {} bytes received",
                    cfg.overall_timeout,
                    received.len()
                );
                break;
            }
            CaptureState::Receiving if last_rx.elapsed() >= cfg.idle_timeout => {
                log::debug!(
                    "channel idle for {:?}; device appears done transmitting",
                    cfg.idle_timeout
                );
                break;
            }
            CaptureState::Idle | CaptureState::Receiving => {}
        }

        // Bounded wait: never sleep past whichever deadline is nearest
        let idle_remaining = (state == CaptureState::Receiving)
            .then(|| cfg.idle_timeout.saturating_sub(last_rx.elapsed()));
        let wait = bounded_wait(cfg.poll_interval, cfg.overall_timeout - elapsed, idle_remaining);

        let n = chan.read_chunk(&mut scratch, wait)?;
        if n > 0 {
            received.extend_from_slice(&scratch[..n]);
            last_rx = Instant::now();
            state = CaptureState::Receiving;
        }
    }

    if received.is_empty() {
        return Ok(None);
    }
    log::info!("captured {} bytes", received.len());
    Ok(Some(frame(received, cfg.mode)))
}

/// Duration of a single blocking poll: the nearest of the overall
/// remainder, the idle remainder and the poll interval. Floored at 1 ms to
/// avoid busy-spinning, except that the floor never pushes the wait past
/// the overall remainder.
fn bounded_wait(
    poll_interval: Duration,
    overall_remaining: Duration,
    idle_remaining: Option<Duration>,
) -> Duration {
    let mut wait = overall_remaining;
    if let Some(idle) = idle_remaining {
        wait = wait.min(idle);
    }
    wait.min(poll_interval)
        .max(Duration::from_millis(1))
        .min(overall_remaining)
}

fn frame(bytes: Vec<u8>, mode: ReceptionMode) -> CapturedData {
    match mode {
        ReceptionMode::Raw => CapturedData::Raw(bytes),
        ReceptionMode::Lines => {
            let text = String::from_utf8_lossy(&bytes);
            let mut lines: Vec<String> = text
                .split('\n')
                .map(|line| line.trim_end_matches('\r').to_string())
                .collect();
            // A trailing newline produces one empty trailing record; an
            // unterminated final line is kept as-is.
            if lines.last().map_or(false, |l| l.is_empty()) {
                lines.pop();
            }
            CapturedData::Lines(lines)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_framing_strips_cr_and_trailing_record() {
        let framed = frame(b"a\r\nb\nc\n".to_vec(), ReceptionMode::Lines);
        assert_eq!(
            framed,
            CapturedData::Lines(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn unterminated_final_line_is_kept() {
        let framed = frame(b"42\npartial".to_vec(), ReceptionMode::Lines);
        assert_eq!(
            framed,
            CapturedData::Lines(vec!["42".into(), "partial".into()])
        );
    }

    #[test]
    fn raw_framing_is_opaque() {
        let framed = frame(vec![0x00, 0xFF, 0x0A], ReceptionMode::Raw);
        assert_eq!(framed, CapturedData::Raw(vec![0x00, 0xFF, 0x0A]));
    }

    #[test]
    fn wait_is_floored_at_one_millisecond() {
        let wait = bounded_wait(
            Duration::from_millis(50),
            Duration::from_millis(20),
            Some(Duration::ZERO),
        );
        assert_eq!(wait, Duration::from_millis(1));
    }

    #[test]
    fn wait_never_exceeds_the_overall_remainder() {
        // Sub-millisecond remainder: the floor must not push past it
        let wait = bounded_wait(Duration::from_millis(50), Duration::from_micros(300), None);
        assert_eq!(wait, Duration::from_micros(300));
    }

    #[test]
    fn wait_tracks_the_nearest_deadline() {
        let poll = Duration::from_millis(50);
        assert_eq!(
            bounded_wait(poll, Duration::from_secs(5), Some(Duration::from_millis(8))),
            Duration::from_millis(8)
        );
        assert_eq!(bounded_wait(poll, Duration::from_secs(5), None), poll);
    }

    #[test]
    fn derived_idle_timeout_is_half_overall_floored_at_one_second() {
        assert_eq!(
            CaptureConfig::derive_idle_timeout(Duration::from_secs(10)),
            Duration::from_secs(5)
        );
        assert_eq!(
            CaptureConfig::derive_idle_timeout(Duration::from_secs(1)),
            Duration::from_secs(1)
        );
    }
}
