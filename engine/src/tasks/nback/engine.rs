//! Session engine for the spatial n-back task.
//!
//! The position stream is generated up front; during the run each
//! stimulus opens a response window in which the participant may press
//! "match". Classification is four-way (hit, miss, false alarm,
//! correct rejection) from the cross of the trial's generated match
//! flag and whether a press arrived.

use serde::Serialize;
use tracing::debug;

use crate::core::capture::{CaptureOutcome, ResponseGate};
use crate::core::error::EngineError;
use crate::core::phase::{PhaseController, PhaseStep, Transition};
use crate::core::qc::QualityFlags;
use crate::core::rng::SessionRng;
use crate::core::timing::InstantStamp;
use crate::results::SummaryRecord;

use super::metrics::NBackMetrics;
use super::sequence::{self, NBackTrial};

#[derive(Debug, Clone)]
pub struct NBackConfig {
    pub practice_trials: usize,
    pub test_trials: usize,
    pub n_back: usize,
    pub grid_size: u8,
    pub match_probability: f64,
    /// Stimulus-on plus inter-stimulus interval: the response window.
    pub trial_duration_ms: f64,
}

impl Default for NBackConfig {
    fn default() -> Self {
        Self {
            practice_trials: 4,
            test_trials: 20,
            n_back: 2,
            grid_size: 9,
            match_probability: 0.3,
            trial_duration_ms: 2_500.0,
        }
    }
}

impl NBackConfig {
    pub fn total_trials(&self) -> usize {
        self.practice_trials + self.test_trials
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.test_trials == 0 {
            return Err(EngineError::invalid_config(
                "test_trials",
                0.0,
                "must be positive",
            ));
        }
        if self.n_back == 0 || self.n_back >= self.test_trials {
            return Err(EngineError::invalid_config(
                "n_back",
                self.n_back as f64,
                "must be positive and smaller than the trial count",
            ));
        }
        if self.grid_size < 2 {
            return Err(EngineError::invalid_config(
                "grid_size",
                self.grid_size as f64,
                "needs at least two positions",
            ));
        }
        if !(0.0..=1.0).contains(&self.match_probability) {
            return Err(EngineError::invalid_config(
                "match_probability",
                self.match_probability,
                "must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NBackPhase {
    Instructions,
    Practice,
    Test,
}

/// Four-way signal-detection classification, assigned exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    Hit { rt_ms: f64 },
    Miss,
    FalseAlarm { rt_ms: f64 },
    CorrectRejection,
    Pending,
}

impl TrialOutcome {
    pub fn is_classified(&self) -> bool {
        !matches!(self, TrialOutcome::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NBackOutcome {
    NextTrial(usize),
    TestPhaseEntered(usize),
    RunCompleted,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct NBackEngine {
    pub config: NBackConfig,
    controller: PhaseController<NBackPhase>,
    trials: Vec<NBackTrial>,
    gate: ResponseGate,
    qc: QualityFlags,
    cursor: usize,
}

impl NBackEngine {
    pub fn new(config: NBackConfig, rng: &mut SessionRng) -> Result<Self, EngineError> {
        config.validate()?;

        let trials = sequence::generate(
            rng,
            config.total_trials(),
            config.grid_size,
            config.n_back,
            config.match_probability,
        );

        let mut plan = vec![PhaseStep::manual(NBackPhase::Instructions)];
        if config.practice_trials > 0 {
            plan.push(PhaseStep::trials(NBackPhase::Practice, config.practice_trials));
        }
        plan.push(PhaseStep::trials(NBackPhase::Test, config.test_trials));

        Ok(Self {
            trials,
            controller: PhaseController::new(plan),
            gate: ResponseGate::new(),
            qc: QualityFlags::pristine(),
            cursor: 0,
            config,
        })
    }

    pub fn phase(&self) -> Option<NBackPhase> {
        self.controller.current()
    }

    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }

    pub fn qc(&self) -> &QualityFlags {
        &self.qc
    }

    pub fn trials(&self) -> &[NBackTrial] {
        &self.trials
    }

    pub fn acknowledge_instructions(&mut self) -> Option<usize> {
        if self.controller.current() != Some(NBackPhase::Instructions) {
            return None;
        }
        self.controller.complete_phase();
        Some(self.cursor)
    }

    /// Opens the response window for the pending stimulus.
    pub fn present_current(&mut self, onset: InstantStamp) -> Option<&NBackTrial> {
        if !self.controller.is_running()
            || self.controller.current() == Some(NBackPhase::Instructions)
        {
            return None;
        }
        let trial = self.trials.get(self.cursor)?;
        self.gate.open(trial.index, onset);
        Some(trial)
    }

    /// Delivers a "match" press. A press on a match trial is a hit, on
    /// a non-match trial a false alarm; either way the window latches.
    pub fn register_press(&mut self, trial_index: usize, timestamp: InstantStamp) -> bool {
        if !self.controller.is_running() {
            return false;
        }

        match self.gate.register(trial_index, timestamp, &mut self.qc) {
            CaptureOutcome::Accepted { rt_ms } => {
                let trial = &mut self.trials[trial_index];
                trial.outcome = if trial.is_match {
                    TrialOutcome::Hit { rt_ms }
                } else {
                    TrialOutcome::FalseAlarm { rt_ms }
                };
                debug!(trial_index, outcome = ?trial.outcome, "n-back press classified");
                true
            }
            CaptureOutcome::Ignored(_) => false,
        }
    }

    /// Ends the current trial window: an unanswered match becomes a
    /// miss, an unanswered non-match a correct rejection.
    pub fn evaluate_current(&mut self) -> NBackOutcome {
        if !self.controller.is_running() || !self.gate.is_open() {
            return NBackOutcome::Ignored;
        }

        let trial = &mut self.trials[self.cursor];
        if !trial.outcome.is_classified() {
            trial.outcome = if trial.is_match {
                TrialOutcome::Miss
            } else {
                TrialOutcome::CorrectRejection
            };
        }
        self.gate.close();
        self.cursor += 1;

        match self.controller.on_trial_finished() {
            Transition::Stay => NBackOutcome::NextTrial(self.cursor),
            Transition::Entered(NBackPhase::Test) => NBackOutcome::TestPhaseEntered(self.cursor),
            Transition::Entered(_) => NBackOutcome::NextTrial(self.cursor),
            Transition::Completed => {
                let classified = self
                    .scored_trials()
                    .iter()
                    .filter(|t| t.outcome.is_classified())
                    .count();
                self.qc
                    .mark_min_trials(classified == self.config.test_trials);
                NBackOutcome::RunCompleted
            }
            Transition::Ignored => NBackOutcome::Ignored,
        }
    }

    pub fn abort(&mut self) {
        self.controller.cancel();
        self.qc.mark_aborted();
    }

    fn scored_trials(&self) -> &[NBackTrial] {
        &self.trials[self.config.practice_trials..]
    }

    /// Metrics over the scored block; `None` until the run completes.
    pub fn metrics(&self) -> Option<NBackMetrics> {
        if !self.is_completed() {
            return None;
        }
        Some(NBackMetrics::from_trials(self.scored_trials()))
    }

    pub fn summary(&self) -> Result<Option<SummaryRecord>, EngineError> {
        let Some(metrics) = self.metrics() else {
            return Ok(None);
        };
        SummaryRecord::assemble("nback", &metrics, &self.controller.log(), self.qc.clone())
            .map(Some)
    }
}
