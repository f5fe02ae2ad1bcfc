//! Session engine for the Stroop color-word task.
//!
//! The full trial list (practice + scored block) is generated up front
//! from the session RNG; the engine then walks instructions → practice
//! → test, one response window per trial. Scoring covers the test
//! block only.

use serde::Serialize;
use tracing::debug;

use crate::core::capture::{CaptureOutcome, ResponseGate};
use crate::core::error::EngineError;
use crate::core::phase::{PhaseController, PhaseStep, Transition};
use crate::core::qc::QualityFlags;
use crate::core::rng::SessionRng;
use crate::core::timing::InstantStamp;
use crate::results::SummaryRecord;

use super::metrics::StroopMetrics;
use super::sequence::{self, ColorWord, StroopTrial};

#[derive(Debug, Clone)]
pub struct StroopConfig {
    pub practice_trials: usize,
    pub test_trials: usize,
    pub congruent_ratio: f64,
    pub response_window_ms: f64,
    pub anticipation_threshold_ms: f64,
    pub disengagement_threshold_ms: f64,
    pub cv_acceptable_threshold: f64,
}

impl Default for StroopConfig {
    fn default() -> Self {
        Self {
            practice_trials: 4,
            test_trials: 20,
            congruent_ratio: 0.4,
            response_window_ms: 3_000.0,
            anticipation_threshold_ms: 150.0,
            disengagement_threshold_ms: 3_000.0,
            cv_acceptable_threshold: 0.5,
        }
    }
}

impl StroopConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.test_trials == 0 {
            return Err(EngineError::invalid_config(
                "test_trials",
                0.0,
                "must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.congruent_ratio) {
            return Err(EngineError::invalid_config(
                "congruent_ratio",
                self.congruent_ratio,
                "must lie in [0, 1]",
            ));
        }
        if self.response_window_ms <= 0.0 {
            return Err(EngineError::invalid_config(
                "response_window_ms",
                self.response_window_ms,
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StroopPhase {
    Instructions,
    Practice,
    Test,
}

/// One bound response. Created at most once per trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StroopResponse {
    pub selected: ColorWord,
    pub timestamp_ms: InstantStamp,
    pub rt_ms: f64,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StroopOutcome {
    /// Another trial awaits presentation.
    NextTrial(usize),
    /// Practice is over; the scored block begins.
    TestPhaseEntered(usize),
    RunCompleted,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct StroopEngine {
    pub config: StroopConfig,
    controller: PhaseController<StroopPhase>,
    trials: Vec<StroopTrial>,
    responses: Vec<Option<StroopResponse>>,
    gate: ResponseGate,
    qc: QualityFlags,
    cursor: usize,
}

impl StroopEngine {
    pub fn new(config: StroopConfig, rng: &mut SessionRng) -> Result<Self, EngineError> {
        config.validate()?;

        let total = config.practice_trials + config.test_trials;
        let trials = sequence::generate(rng, total, config.congruent_ratio);

        let mut plan = vec![PhaseStep::manual(StroopPhase::Instructions)];
        if config.practice_trials > 0 {
            plan.push(PhaseStep::trials(StroopPhase::Practice, config.practice_trials));
        }
        plan.push(PhaseStep::trials(StroopPhase::Test, config.test_trials));

        Ok(Self {
            responses: vec![None; trials.len()],
            trials,
            controller: PhaseController::new(plan),
            gate: ResponseGate::new(),
            qc: QualityFlags::pristine(),
            cursor: 0,
            config,
        })
    }

    pub fn phase(&self) -> Option<StroopPhase> {
        self.controller.current()
    }

    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }

    pub fn qc(&self) -> &QualityFlags {
        &self.qc
    }

    pub fn trials(&self) -> &[StroopTrial] {
        &self.trials
    }

    /// Leaves the instructions screen; returns the index of the first
    /// trial to present.
    pub fn acknowledge_instructions(&mut self) -> Option<usize> {
        if self.controller.current() != Some(StroopPhase::Instructions) {
            return None;
        }
        self.controller.complete_phase();
        Some(self.cursor)
    }

    /// Opens the response window for the pending trial at stimulus
    /// onset and returns it for display.
    pub fn present_current(&mut self, onset: InstantStamp) -> Option<&StroopTrial> {
        if !self.controller.is_running()
            || self.controller.current() == Some(StroopPhase::Instructions)
        {
            return None;
        }
        let trial = self.trials.get(self.cursor)?;
        self.gate.open(trial.index, onset);
        Some(trial)
    }

    /// Delivers a button press. Wrong-index, duplicate, and late
    /// presses are silent no-ops.
    pub fn register_response(
        &mut self,
        trial_index: usize,
        selected: ColorWord,
        timestamp: InstantStamp,
    ) -> StroopOutcome {
        if !self.controller.is_running() {
            return StroopOutcome::Ignored;
        }

        match self.gate.register(trial_index, timestamp, &mut self.qc) {
            CaptureOutcome::Accepted { rt_ms } => {
                let correct = selected == self.trials[trial_index].ink;
                self.responses[trial_index] = Some(StroopResponse {
                    selected,
                    timestamp_ms: timestamp,
                    rt_ms,
                    correct,
                });
                debug!(trial_index, correct, rt_ms, "stroop response accepted");
                self.gate.close();
                self.finish_trial()
            }
            CaptureOutcome::Ignored(_) => StroopOutcome::Ignored,
        }
    }

    /// The response window elapsed without an answer; the trial is
    /// scored as "no response".
    pub fn expire_current(&mut self) -> StroopOutcome {
        if !self.controller.is_running() || !self.gate.is_open() {
            return StroopOutcome::Ignored;
        }
        debug!(trial = self.cursor, "stroop response window expired");
        self.gate.close();
        self.finish_trial()
    }

    /// Abandons the session: timers stop mattering, nothing is scored.
    pub fn abort(&mut self) {
        self.controller.cancel();
        self.qc.mark_aborted();
    }

    fn finish_trial(&mut self) -> StroopOutcome {
        self.cursor += 1;
        match self.controller.on_trial_finished() {
            Transition::Stay => StroopOutcome::NextTrial(self.cursor),
            Transition::Entered(StroopPhase::Test) => StroopOutcome::TestPhaseEntered(self.cursor),
            Transition::Entered(_) => StroopOutcome::NextTrial(self.cursor),
            Transition::Completed => {
                let responded = self
                    .scored_responses()
                    .iter()
                    .filter(|r| r.is_some())
                    .count();
                self.qc
                    .mark_min_trials(responded * 2 >= self.config.test_trials);
                StroopOutcome::RunCompleted
            }
            Transition::Ignored => StroopOutcome::Ignored,
        }
    }

    fn scored_trials(&self) -> &[StroopTrial] {
        &self.trials[self.config.practice_trials..]
    }

    fn scored_responses(&self) -> &[Option<StroopResponse>] {
        &self.responses[self.config.practice_trials..]
    }

    /// Metrics over the scored block; `None` until the run completes.
    pub fn metrics(&self) -> Option<StroopMetrics> {
        if !self.is_completed() {
            return None;
        }
        Some(StroopMetrics::from_trials(
            self.scored_trials(),
            self.scored_responses(),
            &self.config,
        ))
    }

    /// Final summary record; `None` for abandoned sessions.
    pub fn summary(&self) -> Result<Option<SummaryRecord>, EngineError> {
        let Some(metrics) = self.metrics() else {
            return Ok(None);
        };
        SummaryRecord::assemble("stroop", &metrics, &self.controller.log(), self.qc.clone())
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng;

    fn quick_config() -> StroopConfig {
        StroopConfig {
            practice_trials: 1,
            test_trials: 3,
            ..StroopConfig::default()
        }
    }

    fn run_full_session(engine: &mut StroopEngine) {
        engine.acknowledge_instructions();
        let mut now = 0.0;
        while !engine.is_completed() {
            let ink = {
                let trial = engine.present_current(now).expect("pending trial");
                trial.ink
            };
            let index = engine.trials()[engine.cursor].index;
            engine.register_response(index, ink, now + 450.0);
            now += 1_000.0;
        }
    }

    #[test]
    fn full_session_completes_and_scores_test_block_only() {
        let mut rng = rng::seeded(5);
        let mut engine = StroopEngine::new(quick_config(), &mut rng).unwrap();
        run_full_session(&mut engine);

        let metrics = engine.metrics().expect("completed run");
        assert_eq!(metrics.total_trials, 3);
        assert_eq!(metrics.accuracy, 1.0);
        assert!(engine.qc().is_clean());
    }

    #[test]
    fn duplicate_and_late_responses_do_not_mutate_trials() {
        let mut rng = rng::seeded(6);
        let mut engine = StroopEngine::new(quick_config(), &mut rng).unwrap();
        engine.acknowledge_instructions();

        let ink = engine.present_current(0.0).unwrap().ink;
        assert!(matches!(
            engine.register_response(0, ink, 400.0),
            StroopOutcome::NextTrial(1) | StroopOutcome::TestPhaseEntered(1)
        ));

        // Second press for the same trial: window already closed.
        let before = engine.responses.clone();
        assert_eq!(
            engine.register_response(0, ink, 500.0),
            StroopOutcome::Ignored
        );
        assert_eq!(engine.responses, before);
        assert_eq!(engine.qc().late_responses, 1);
    }

    #[test]
    fn expired_window_scores_no_response() {
        let mut rng = rng::seeded(7);
        let mut engine = StroopEngine::new(quick_config(), &mut rng).unwrap();
        engine.acknowledge_instructions();

        engine.present_current(0.0);
        engine.expire_current();
        assert_eq!(engine.responses[0], None);
    }

    #[test]
    fn abort_discards_partial_data() {
        let mut rng = rng::seeded(8);
        let mut engine = StroopEngine::new(quick_config(), &mut rng).unwrap();
        engine.acknowledge_instructions();
        engine.present_current(0.0);
        engine.abort();

        assert!(engine.metrics().is_none());
        assert!(engine.summary().unwrap().is_none());
        assert!(engine.qc().aborted_early);
        assert_eq!(engine.expire_current(), StroopOutcome::Ignored);
    }

    #[test]
    fn zero_test_trials_is_rejected() {
        let mut rng = rng::seeded(9);
        let config = StroopConfig {
            test_trials: 0,
            ..StroopConfig::default()
        };
        assert!(StroopEngine::new(config, &mut rng).is_err());
    }
}
