//! Flash-outcome classification
//!
//! st-flash's textual output is not a stable machine-readable contract, so
//! the outcome is judged from weak signals extracted once from the exit
//! status and stderr text, then combined under a fixed precedence rule.
//! Known success phrases are trusted outright; otherwise a clean exit with
//! no error phrase is accepted as success.

/// One piece of evidence extracted from the flashing tool's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashSignal {
    /// stderr contains a known success phrase
    ExplicitSuccessPhrase,
    /// stderr contains the substring "error"
    ExplicitErrorPhrase,
    /// The tool exited with status 0
    CleanExit,
    /// The tool exited non-zero or was killed by a signal
    DirtyExit,
}

/// Phrases st-flash is known to emit on a verified write, matched
/// case-insensitively against stderr
const SUCCESS_PHRASES: &[&str] = &[
    "verify success",
    "flash written and verified successfully",
];

const ERROR_PHRASE: &str = "error";

/// Derive the signal set from the tool's exit status and stderr text
///
/// `exit_code` is `None` when the process was terminated by a signal,
/// which counts as a dirty exit.
pub fn extract_signals(exit_code: Option<i32>, stderr: &str) -> Vec<FlashSignal> {
    let text = stderr.to_lowercase();
    let mut signals = Vec::new();

    if SUCCESS_PHRASES.iter().any(|phrase| text.contains(phrase)) {
        signals.push(FlashSignal::ExplicitSuccessPhrase);
    }
    if text.contains(ERROR_PHRASE) {
        signals.push(FlashSignal::ExplicitErrorPhrase);
    }
    match exit_code {
        Some(0) => signals.push(FlashSignal::CleanExit),
        _ => signals.push(FlashSignal::DirtyExit),
    }

    signals
}

/// Judge the signal set
///
/// Precedence: an explicit success phrase wins regardless of exit code;
/// failing that, a clean exit with no error phrase counts as success. Note
/// the second rule accepts a flash that silently no-ops, as long as the tool
/// exits 0 without complaining.
pub fn is_success(signals: &[FlashSignal]) -> bool {
    if signals.contains(&FlashSignal::ExplicitSuccessPhrase) {
        return true;
    }
    signals.contains(&FlashSignal::CleanExit)
        && !signals.contains(&FlashSignal::ExplicitErrorPhrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(exit_code: Option<i32>, stderr: &str) -> bool {
        is_success(&extract_signals(exit_code, stderr))
    }

    #[test]
    fn success_phrase_wins_regardless_of_exit_code() {
        assert!(classify(Some(0), "Verify success"));
        assert!(classify(Some(1), "verify success"));
        assert!(classify(None, "VERIFY SUCCESS"));
        // Even alongside an error phrase the explicit success wins
        assert!(classify(Some(1), "error: retried once\nverify success"));
    }

    #[test]
    fn verified_successfully_phrase_is_trusted() {
        // st-flash exit 0 with its long-form success banner
        assert!(classify(
            Some(0),
            "Flash written and verified successfully!"
        ));
        // ...and with a non-zero exit code too
        assert!(classify(Some(3), "flash written and verified successfully"));
    }

    #[test]
    fn clean_exit_without_error_is_success() {
        assert!(classify(Some(0), ""));
        assert!(classify(Some(0), "st-flash 1.7.0\n2048 bytes written"));
    }

    #[test]
    fn clean_exit_with_error_phrase_is_failure() {
        assert!(!classify(Some(0), "ERROR common.c: unknown chip id"));
        assert!(!classify(Some(0), "soft error while probing"));
    }

    #[test]
    fn dirty_exit_without_success_phrase_is_failure() {
        assert!(!classify(Some(1), ""));
        assert!(!classify(Some(127), "command not found"));
        assert!(!classify(None, "killed"));
    }

    #[test]
    fn signal_extraction_is_complete() {
        let signals = extract_signals(Some(0), "verify success but an error too");
        assert!(signals.contains(&FlashSignal::ExplicitSuccessPhrase));
        assert!(signals.contains(&FlashSignal::ExplicitErrorPhrase));
        assert!(signals.contains(&FlashSignal::CleanExit));
        assert!(!signals.contains(&FlashSignal::DirtyExit));

        let signals = extract_signals(Some(2), "");
        assert_eq!(signals, vec![FlashSignal::DirtyExit]);
    }
}
