//! Session engine for word-list recall.
//!
//! A fixed word list is presented one word at a time on a countdown,
//! followed by a timed free-recall window. The recalled words arrive as
//! one batch (the shell transcribes or collects them); scoring matches
//! them against the presented list, case- and whitespace-insensitive.

use serde::Serialize;

use crate::core::error::EngineError;
use crate::core::phase::{PhaseController, PhaseStep, Transition};
use crate::core::qc::QualityFlags;
use crate::results::SummaryRecord;

use super::metrics::RecallMetrics;

/// Default presentation list, matched to the battery's shipping set.
pub const DEFAULT_WORD_LIST: [&str; 10] = [
    "apple", "river", "candle", "garden", "mirror", "bridge", "yellow", "window", "pencil",
    "forest",
];

#[derive(Debug, Clone)]
pub struct RecallConfig {
    pub words: Vec<String>,
    /// Exposure per word during presentation, in seconds.
    pub word_display_s: u32,
    /// Length of the free-recall window, in seconds.
    pub recall_duration_s: u32,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            words: DEFAULT_WORD_LIST.iter().map(|w| w.to_string()).collect(),
            word_display_s: 2,
            recall_duration_s: 30,
        }
    }
}

impl RecallConfig {
    pub fn presentation_duration_s(&self) -> u32 {
        self.words.len() as u32 * self.word_display_s
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.words.is_empty() {
            return Err(EngineError::invalid_config(
                "words",
                0.0,
                "word list must not be empty",
            ));
        }
        if self.word_display_s == 0 || self.recall_duration_s == 0 {
            return Err(EngineError::invalid_config(
                "word_display_s/recall_duration_s",
                0.0,
                "durations must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallPhase {
    Instructions,
    Presentation,
    Recall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallOutcome {
    PhaseEntered(RecallPhase),
    Stay,
    RunCompleted,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct RecallEngine {
    pub config: RecallConfig,
    controller: PhaseController<RecallPhase>,
    recalled: Vec<String>,
    qc: QualityFlags,
}

impl RecallEngine {
    pub fn new(config: RecallConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let plan = vec![
            PhaseStep::manual(RecallPhase::Instructions),
            PhaseStep::seconds(RecallPhase::Presentation, config.presentation_duration_s()),
            PhaseStep::seconds(RecallPhase::Recall, config.recall_duration_s),
        ];
        Ok(Self {
            controller: PhaseController::new(plan),
            recalled: Vec::new(),
            qc: QualityFlags::pristine(),
            config,
        })
    }

    pub fn phase(&self) -> Option<RecallPhase> {
        self.controller.current()
    }

    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }

    pub fn qc(&self) -> &QualityFlags {
        &self.qc
    }

    pub fn acknowledge_instructions(&mut self) -> RecallOutcome {
        if self.controller.current() != Some(RecallPhase::Instructions) {
            return RecallOutcome::Ignored;
        }
        map_transition(self.controller.complete_phase())
    }

    /// Word on screen during presentation, advancing every
    /// `word_display_s` seconds.
    pub fn current_word(&self) -> Option<&str> {
        if self.controller.current() != Some(RecallPhase::Presentation) {
            return None;
        }
        let index = (self.controller.seconds_in_phase() / self.config.word_display_s) as usize;
        self.config.words.get(index).map(String::as_str)
    }

    pub fn on_second_tick(&mut self) -> RecallOutcome {
        map_transition(self.controller.on_second_tick())
    }

    /// Submits the recalled batch and ends the recall window early.
    /// Only the first submission counts.
    pub fn submit_recall<S: AsRef<str>>(&mut self, words: &[S]) -> RecallOutcome {
        if self.controller.current() != Some(RecallPhase::Recall) {
            self.qc.log_late();
            return RecallOutcome::Ignored;
        }
        self.recalled = words.iter().map(|w| w.as_ref().to_string()).collect();
        map_transition(self.controller.complete_phase())
    }

    pub fn abort(&mut self) {
        self.controller.cancel();
        self.qc.mark_aborted();
    }

    pub fn metrics(&self) -> Option<RecallMetrics> {
        if !self.is_completed() {
            return None;
        }
        Some(RecallMetrics::score(&self.config.words, &self.recalled))
    }

    pub fn summary(&self) -> Result<Option<SummaryRecord>, EngineError> {
        let Some(metrics) = self.metrics() else {
            return Ok(None);
        };
        SummaryRecord::assemble(
            "word_recall",
            &metrics,
            &self.controller.log(),
            self.qc.clone(),
        )
        .map(Some)
    }
}

fn map_transition(transition: Transition<RecallPhase>) -> RecallOutcome {
    match transition {
        Transition::Stay => RecallOutcome::Stay,
        Transition::Entered(p) => RecallOutcome::PhaseEntered(p),
        Transition::Completed => RecallOutcome::RunCompleted,
        Transition::Ignored => RecallOutcome::Ignored,
    }
}
