//! Session engine for the facial observation protocol.
//!
//! Calibration followed by a timed observation window. Detection events
//! (blinks, expression changes) arrive from a synthetic detector that
//! stands in for the camera pipeline, with phase-conditioned event
//! probability: none during calibration, the configured rates during
//! observation.

use rand::Rng;
use serde::Serialize;

use crate::core::error::EngineError;
use crate::core::phase::{PhaseController, PhaseStep, Transition};
use crate::core::qc::QualityFlags;
use crate::core::rng::SessionRng;
use crate::core::timing::InstantStamp;
use crate::results::SummaryRecord;

use super::metrics::FacialMetrics;

#[derive(Debug, Clone)]
pub struct FacialConfig {
    pub calibration_duration_s: u32,
    pub observation_duration_s: u32,
    pub sampling_rate_hz: u32,
    /// Expected spontaneous blink frequency, in Hz.
    pub blink_rate_hz: f64,
    /// Expected expression-change frequency, in Hz.
    pub expression_rate_hz: f64,
}

impl Default for FacialConfig {
    fn default() -> Self {
        Self {
            calibration_duration_s: 3,
            observation_duration_s: 30,
            sampling_rate_hz: 10,
            blink_rate_hz: 0.3,
            expression_rate_hz: 0.05,
        }
    }
}

impl FacialConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sampling_rate_hz == 0 {
            return Err(EngineError::invalid_config(
                "sampling_rate_hz",
                0.0,
                "must be positive",
            ));
        }
        if self.observation_duration_s == 0 {
            return Err(EngineError::invalid_config(
                "observation_duration_s",
                0.0,
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacialPhase {
    Instructions,
    Calibration,
    Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    Blink,
    ExpressionChange,
}

/// One detection event from the (synthetic) camera pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionEvent {
    pub t_ms: InstantStamp,
    pub kind: DetectionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacialOutcome {
    PhaseEntered(FacialPhase),
    Stay,
    RunCompleted,
    Ignored,
}

#[derive(Debug)]
pub struct FacialEngine {
    pub config: FacialConfig,
    controller: PhaseController<FacialPhase>,
    rng: SessionRng,
    events: Vec<DetectionEvent>,
    qc: QualityFlags,
}

impl FacialEngine {
    pub fn new(config: FacialConfig, rng: SessionRng) -> Result<Self, EngineError> {
        config.validate()?;
        let plan = vec![
            PhaseStep::manual(FacialPhase::Instructions),
            PhaseStep::seconds(FacialPhase::Calibration, config.calibration_duration_s),
            PhaseStep::seconds(FacialPhase::Observation, config.observation_duration_s),
        ];
        Ok(Self {
            controller: PhaseController::new(plan),
            rng,
            events: Vec::new(),
            qc: QualityFlags::pristine(),
            config,
        })
    }

    pub fn phase(&self) -> Option<FacialPhase> {
        self.controller.current()
    }

    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }

    pub fn qc(&self) -> &QualityFlags {
        &self.qc
    }

    pub fn events(&self) -> &[DetectionEvent] {
        &self.events
    }

    pub fn acknowledge_instructions(&mut self) -> FacialOutcome {
        if self.controller.current() != Some(FacialPhase::Instructions) {
            return FacialOutcome::Ignored;
        }
        let transition = self.controller.complete_phase();
        self.map_transition(transition)
    }

    pub fn on_second_tick(&mut self) -> FacialOutcome {
        let transition = self.controller.on_second_tick();
        self.map_transition(transition)
    }

    /// Sampling tick: during observation the synthetic detector may
    /// fire a blink or expression event.
    pub fn on_sample_tick(&mut self, timestamp: InstantStamp) -> Option<DetectionEvent> {
        let phase = self.controller.current()?;
        if phase == FacialPhase::Instructions || !self.controller.on_sample_tick() {
            return None;
        }
        if phase != FacialPhase::Observation {
            return None;
        }

        let rate = self.config.sampling_rate_hz as f64;
        let blink_p = (self.config.blink_rate_hz / rate).clamp(0.0, 1.0);
        let expression_p = (self.config.expression_rate_hz / rate).clamp(0.0, 1.0);

        let event = if self.rng.gen_bool(blink_p) {
            Some(DetectionKind::Blink)
        } else if self.rng.gen_bool(expression_p) {
            Some(DetectionKind::ExpressionChange)
        } else {
            None
        };

        let event = event.map(|kind| DetectionEvent {
            t_ms: timestamp,
            kind,
        })?;
        if event.kind == DetectionKind::Blink {
            if let Some(counters) = self.controller.counters_mut() {
                counters.blinks = counters.blinks.saturating_add(1);
            }
        }
        self.events.push(event);
        Some(event)
    }

    pub fn abort(&mut self) {
        self.controller.cancel();
        self.qc.mark_aborted();
    }

    fn map_transition(&mut self, transition: Transition<FacialPhase>) -> FacialOutcome {
        match transition {
            Transition::Stay => FacialOutcome::Stay,
            Transition::Entered(p) => FacialOutcome::PhaseEntered(p),
            Transition::Completed => FacialOutcome::RunCompleted,
            Transition::Ignored => FacialOutcome::Ignored,
        }
    }

    pub fn metrics(&self) -> Option<FacialMetrics> {
        if !self.is_completed() {
            return None;
        }
        Some(FacialMetrics::from_events(
            &self.events,
            self.controller.log(),
        ))
    }

    pub fn summary(&self) -> Result<Option<SummaryRecord>, EngineError> {
        let Some(metrics) = self.metrics() else {
            return Ok(None);
        };
        SummaryRecord::assemble(
            "facial_analysis",
            &metrics,
            &self.controller.log(),
            self.qc.clone(),
        )
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng;

    fn drive_to_completion(engine: &mut FacialEngine) {
        engine.acknowledge_instructions();
        let rate = engine.config.sampling_rate_hz;
        let mut now = 0.0;
        loop {
            for _ in 0..rate {
                now += 1_000.0 / rate as f64;
                engine.on_sample_tick(now);
            }
            if engine.on_second_tick() == FacialOutcome::RunCompleted {
                break;
            }
        }
    }

    #[test]
    fn observation_collects_plausible_blink_counts() {
        let mut engine = FacialEngine::new(FacialConfig::default(), rng::seeded(41)).unwrap();
        drive_to_completion(&mut engine);

        let metrics = engine.metrics().expect("completed run");
        // 0.3 Hz over 30 s ⇒ about 9 blinks; allow wide slack for the
        // Bernoulli draw.
        assert!(metrics.blink_count >= 2, "blinks = {}", metrics.blink_count);
        assert!(metrics.blink_count <= 25, "blinks = {}", metrics.blink_count);
        assert!(metrics.blink_rate_per_min > 0.0);
        assert_eq!(metrics.observation_duration_s, 30);
    }

    #[test]
    fn calibration_emits_no_events() {
        let mut engine = FacialEngine::new(FacialConfig::default(), rng::seeded(42)).unwrap();
        engine.acknowledge_instructions();
        for i in 0..10 {
            assert!(engine.on_sample_tick(i as f64 * 100.0).is_none());
        }
        assert!(engine.events().is_empty());
    }

    #[test]
    fn seeded_runs_replay_identically() {
        let mut a = FacialEngine::new(FacialConfig::default(), rng::seeded(43)).unwrap();
        let mut b = FacialEngine::new(FacialConfig::default(), rng::seeded(43)).unwrap();
        drive_to_completion(&mut a);
        drive_to_completion(&mut b);
        assert_eq!(a.metrics(), b.metrics());
    }

    #[test]
    fn abort_suppresses_metrics() {
        let mut engine = FacialEngine::new(FacialConfig::default(), rng::seeded(44)).unwrap();
        engine.acknowledge_instructions();
        engine.abort();
        assert!(engine.metrics().is_none());
        assert!(engine.on_sample_tick(100.0).is_none());
    }
}
