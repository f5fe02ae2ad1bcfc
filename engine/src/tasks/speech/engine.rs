//! Session engines for the speech protocols.
//!
//! Two variants share the recording mechanics: the sustained vowel
//! (hold a phonation as long as possible against a target duration)
//! and picture description (study an image, then describe it). Actual
//! audio capture belongs to the platform shell; the engine owns the
//! phase timing and the duration bookkeeping the scorer needs.

use serde::Serialize;

use crate::core::error::EngineError;
use crate::core::phase::{PhaseController, PhaseStep, Transition};
use crate::core::qc::QualityFlags;
use crate::results::SummaryRecord;

use super::metrics::{PictureDescriptionMetrics, SustainedVowelMetrics};

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Phonation length the participant should try to reach, seconds.
    pub target_duration_s: u32,
    /// Hard cap on any single recording, seconds.
    pub max_recording_s: u32,
    /// Picture exposure before the description recording, seconds.
    pub viewing_duration_s: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            target_duration_s: 5,
            max_recording_s: 30,
            viewing_duration_s: 10,
        }
    }
}

impl SpeechConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_recording_s == 0 {
            return Err(EngineError::invalid_config(
                "max_recording_s",
                0.0,
                "must be positive",
            ));
        }
        if self.target_duration_s > self.max_recording_s {
            return Err(EngineError::invalid_config(
                "target_duration_s",
                self.target_duration_s as f64,
                "cannot exceed the recording cap",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechPhase {
    Instructions,
    Viewing,
    Recording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    PhaseEntered(SpeechPhase),
    Stay,
    RunCompleted,
    Ignored,
}

/// Sustained vowel: instructions → one capped recording phase.
#[derive(Debug, Clone)]
pub struct SustainedVowelEngine {
    pub config: SpeechConfig,
    controller: PhaseController<SpeechPhase>,
    qc: QualityFlags,
}

impl SustainedVowelEngine {
    pub fn new(config: SpeechConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let plan = vec![
            PhaseStep::manual(SpeechPhase::Instructions),
            PhaseStep::seconds(SpeechPhase::Recording, config.max_recording_s),
        ];
        Ok(Self {
            controller: PhaseController::new(plan),
            qc: QualityFlags::pristine(),
            config,
        })
    }

    pub fn phase(&self) -> Option<SpeechPhase> {
        self.controller.current()
    }

    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }

    pub fn qc(&self) -> &QualityFlags {
        &self.qc
    }

    pub fn start_recording(&mut self) -> SpeechOutcome {
        if self.controller.current() != Some(SpeechPhase::Instructions) {
            return SpeechOutcome::Ignored;
        }
        map_transition(self.controller.complete_phase())
    }

    /// The participant ran out of breath before the cap.
    pub fn stop_recording(&mut self) -> SpeechOutcome {
        if self.controller.current() != Some(SpeechPhase::Recording) {
            return SpeechOutcome::Ignored;
        }
        map_transition(self.controller.complete_phase())
    }

    pub fn on_second_tick(&mut self) -> SpeechOutcome {
        map_transition(self.controller.on_second_tick())
    }

    pub fn abort(&mut self) {
        self.controller.cancel();
        self.qc.mark_aborted();
    }

    pub fn metrics(&self) -> Option<SustainedVowelMetrics> {
        if !self.is_completed() {
            return None;
        }
        Some(SustainedVowelMetrics::from_log(
            self.controller.log(),
            &self.config,
        ))
    }

    pub fn summary(&self) -> Result<Option<SummaryRecord>, EngineError> {
        let Some(metrics) = self.metrics() else {
            return Ok(None);
        };
        SummaryRecord::assemble(
            "sustained_vowel",
            &metrics,
            &self.controller.log(),
            self.qc.clone(),
        )
        .map(Some)
    }
}

/// Picture description: instructions → timed viewing → capped
/// recording.
#[derive(Debug, Clone)]
pub struct PictureDescriptionEngine {
    pub config: SpeechConfig,
    controller: PhaseController<SpeechPhase>,
    qc: QualityFlags,
}

impl PictureDescriptionEngine {
    pub fn new(config: SpeechConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let plan = vec![
            PhaseStep::manual(SpeechPhase::Instructions),
            PhaseStep::seconds(SpeechPhase::Viewing, config.viewing_duration_s),
            PhaseStep::seconds(SpeechPhase::Recording, config.max_recording_s),
        ];
        Ok(Self {
            controller: PhaseController::new(plan),
            qc: QualityFlags::pristine(),
            config,
        })
    }

    pub fn phase(&self) -> Option<SpeechPhase> {
        self.controller.current()
    }

    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }

    pub fn qc(&self) -> &QualityFlags {
        &self.qc
    }

    pub fn acknowledge_instructions(&mut self) -> SpeechOutcome {
        if self.controller.current() != Some(SpeechPhase::Instructions) {
            return SpeechOutcome::Ignored;
        }
        map_transition(self.controller.complete_phase())
    }

    /// Finishes the description before the cap.
    pub fn stop_recording(&mut self) -> SpeechOutcome {
        if self.controller.current() != Some(SpeechPhase::Recording) {
            return SpeechOutcome::Ignored;
        }
        map_transition(self.controller.complete_phase())
    }

    pub fn on_second_tick(&mut self) -> SpeechOutcome {
        map_transition(self.controller.on_second_tick())
    }

    pub fn abort(&mut self) {
        self.controller.cancel();
        self.qc.mark_aborted();
    }

    pub fn metrics(&self) -> Option<PictureDescriptionMetrics> {
        if !self.is_completed() {
            return None;
        }
        Some(PictureDescriptionMetrics::from_log(
            self.controller.log(),
            &self.config,
        ))
    }

    pub fn summary(&self) -> Result<Option<SummaryRecord>, EngineError> {
        let Some(metrics) = self.metrics() else {
            return Ok(None);
        };
        SummaryRecord::assemble(
            "picture_description",
            &metrics,
            &self.controller.log(),
            self.qc.clone(),
        )
        .map(Some)
    }
}

fn map_transition(transition: Transition<SpeechPhase>) -> SpeechOutcome {
    match transition {
        Transition::Stay => SpeechOutcome::Stay,
        Transition::Entered(p) => SpeechOutcome::PhaseEntered(p),
        Transition::Completed => SpeechOutcome::RunCompleted,
        Transition::Ignored => SpeechOutcome::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vowel_early_stop_records_elapsed_duration() {
        let mut engine = SustainedVowelEngine::new(SpeechConfig::default()).unwrap();
        engine.start_recording();
        for _ in 0..7 {
            engine.on_second_tick();
        }
        assert_eq!(engine.stop_recording(), SpeechOutcome::RunCompleted);

        let metrics = engine.metrics().expect("completed run");
        assert_eq!(metrics.recording_duration_s, 7);
        assert!(metrics.target_met);
        assert!(metrics.stopped_early);
    }

    #[test]
    fn vowel_cap_ends_the_recording() {
        let config = SpeechConfig {
            max_recording_s: 4,
            target_duration_s: 4,
            ..SpeechConfig::default()
        };
        let mut engine = SustainedVowelEngine::new(config).unwrap();
        engine.start_recording();
        let mut outcome = SpeechOutcome::Stay;
        for _ in 0..4 {
            outcome = engine.on_second_tick();
        }
        assert_eq!(outcome, SpeechOutcome::RunCompleted);

        let metrics = engine.metrics().unwrap();
        assert_eq!(metrics.recording_duration_s, 4);
        assert!(!metrics.stopped_early);
    }

    #[test]
    fn short_phonation_misses_the_target() {
        let mut engine = SustainedVowelEngine::new(SpeechConfig::default()).unwrap();
        engine.start_recording();
        engine.on_second_tick();
        engine.stop_recording();

        let metrics = engine.metrics().unwrap();
        assert_eq!(metrics.recording_duration_s, 1);
        assert!(!metrics.target_met);
    }

    #[test]
    fn picture_description_walks_viewing_then_recording() {
        let config = SpeechConfig {
            viewing_duration_s: 2,
            ..SpeechConfig::default()
        };
        let mut engine = PictureDescriptionEngine::new(config).unwrap();
        engine.acknowledge_instructions();
        assert_eq!(engine.phase(), Some(SpeechPhase::Viewing));

        engine.on_second_tick();
        assert_eq!(
            engine.on_second_tick(),
            SpeechOutcome::PhaseEntered(SpeechPhase::Recording)
        );
        for _ in 0..5 {
            engine.on_second_tick();
        }
        assert_eq!(engine.stop_recording(), SpeechOutcome::RunCompleted);

        let metrics = engine.metrics().unwrap();
        assert_eq!(metrics.viewing_duration_s, 2);
        assert_eq!(metrics.recording_duration_s, 5);
        assert!(metrics.stopped_early);
    }

    #[test]
    fn stop_before_start_is_ignored() {
        let mut engine = SustainedVowelEngine::new(SpeechConfig::default()).unwrap();
        assert_eq!(engine.stop_recording(), SpeechOutcome::Ignored);
    }

    #[test]
    fn target_beyond_cap_is_rejected() {
        let config = SpeechConfig {
            target_duration_s: 60,
            max_recording_s: 30,
            ..SpeechConfig::default()
        };
        assert!(SustainedVowelEngine::new(config).is_err());
    }
}
