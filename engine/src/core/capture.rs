//! Response capture for sequence-driven tasks.
//!
//! Exactly one response may bind to a trial. Attempts that miss the
//! window (wrong trial index, a second press, or a press after the
//! evaluate step closed the window) are silent no-ops: time pressure
//! is part of the test, so nothing is surfaced to the participant. The
//! rejections are tallied on [`QualityFlags`] for later interpretation.

use tracing::debug;

use super::qc::QualityFlags;
use super::timing::InstantStamp;

/// Why a response attempt was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    WrongIndex,
    AlreadyResponded,
    WindowClosed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureOutcome {
    Accepted { rt_ms: f64 },
    Ignored(Rejection),
}

impl CaptureOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CaptureOutcome::Accepted { .. })
    }
}

/// Tracks the currently open response window.
#[derive(Debug, Clone, Default)]
pub struct ResponseGate {
    active_index: Option<usize>,
    stimulus_onset: InstantStamp,
    responded: bool,
}

impl ResponseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the window for trial `index` at stimulus onset.
    pub fn open(&mut self, index: usize, onset: InstantStamp) {
        self.active_index = Some(index);
        self.stimulus_onset = onset;
        self.responded = false;
    }

    /// Closes the window without a response (the evaluate step fired).
    pub fn close(&mut self) {
        self.active_index = None;
    }

    pub fn is_open(&self) -> bool {
        self.active_index.is_some()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn has_response(&self) -> bool {
        self.responded
    }

    /// Validates one response attempt. Accepting latches the trial so
    /// any later attempt for the same index is a no-op.
    pub fn register(
        &mut self,
        index: usize,
        timestamp: InstantStamp,
        qc: &mut QualityFlags,
    ) -> CaptureOutcome {
        let Some(active) = self.active_index else {
            qc.log_late();
            debug!(index, "response after window closed; ignored");
            return CaptureOutcome::Ignored(Rejection::WindowClosed);
        };

        if index != active {
            qc.log_wrong_index();
            debug!(index, active, "response for inactive trial; ignored");
            return CaptureOutcome::Ignored(Rejection::WrongIndex);
        }

        if self.responded {
            qc.log_duplicate();
            debug!(index, "second response for trial; ignored");
            return CaptureOutcome::Ignored(Rejection::AlreadyResponded);
        }

        self.responded = true;
        // Malformed timing clamps to zero rather than failing the trial.
        let rt_ms = (timestamp - self.stimulus_onset).max(0.0);
        CaptureOutcome::Accepted { rt_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_first_response_with_reaction_time() {
        let mut gate = ResponseGate::new();
        let mut qc = QualityFlags::pristine();
        gate.open(0, 1_000.0);

        let outcome = gate.register(0, 1_432.0, &mut qc);
        assert_eq!(outcome, CaptureOutcome::Accepted { rt_ms: 432.0 });
        assert!(qc.is_clean());
    }

    #[test]
    fn duplicate_response_is_ignored_and_tallied() {
        let mut gate = ResponseGate::new();
        let mut qc = QualityFlags::pristine();
        gate.open(3, 0.0);

        assert!(gate.register(3, 500.0, &mut qc).is_accepted());
        let second = gate.register(3, 600.0, &mut qc);
        assert_eq!(
            second,
            CaptureOutcome::Ignored(Rejection::AlreadyResponded)
        );
        assert_eq!(qc.duplicate_responses, 1);
    }

    #[test]
    fn wrong_index_and_closed_window_are_ignored() {
        let mut gate = ResponseGate::new();
        let mut qc = QualityFlags::pristine();
        gate.open(1, 0.0);

        assert_eq!(
            gate.register(4, 100.0, &mut qc),
            CaptureOutcome::Ignored(Rejection::WrongIndex)
        );

        gate.close();
        assert_eq!(
            gate.register(1, 100.0, &mut qc),
            CaptureOutcome::Ignored(Rejection::WindowClosed)
        );
        assert_eq!(qc.wrong_index_responses, 1);
        assert_eq!(qc.late_responses, 1);
    }

    #[test]
    fn backwards_timestamp_clamps_to_zero() {
        let mut gate = ResponseGate::new();
        let mut qc = QualityFlags::pristine();
        gate.open(0, 2_000.0);

        let outcome = gate.register(0, 1_500.0, &mut qc);
        assert_eq!(outcome, CaptureOutcome::Accepted { rt_ms: 0.0 });
    }
}
