//! Session engine for the finger-tapping task.
//!
//! One timed phase per hand. Taps arrive as timestamped events and are
//! appended in arrival order; the phase countdown is driven by 1 Hz
//! ticks from the caller.

use serde::Serialize;
use tracing::debug;

use crate::core::error::EngineError;
use crate::core::phase::{PhaseController, PhaseStep, Transition};
use crate::core::qc::QualityFlags;
use crate::core::timing::InstantStamp;
use crate::results::SummaryRecord;

use super::metrics::TappingMetrics;

#[derive(Debug, Clone)]
pub struct TappingConfig {
    /// Tapping window per hand, in seconds.
    pub hand_duration_s: u32,
    /// Minimum taps per hand for the run to count as a usable sample.
    pub min_taps_per_hand: u32,
}

impl Default for TappingConfig {
    fn default() -> Self {
        Self {
            hand_duration_s: 10,
            min_taps_per_hand: 5,
        }
    }
}

impl TappingConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.hand_duration_s == 0 {
            return Err(EngineError::invalid_config(
                "hand_duration_s",
                0.0,
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TappingPhase {
    Instructions,
    LeftHand,
    RightHand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TappingOutcome {
    PhaseEntered(TappingPhase),
    Stay,
    RunCompleted,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct TappingEngine {
    pub config: TappingConfig,
    controller: PhaseController<TappingPhase>,
    left_taps: Vec<InstantStamp>,
    right_taps: Vec<InstantStamp>,
    qc: QualityFlags,
}

impl TappingEngine {
    pub fn new(config: TappingConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let plan = vec![
            PhaseStep::manual(TappingPhase::Instructions),
            PhaseStep::seconds(TappingPhase::LeftHand, config.hand_duration_s),
            PhaseStep::seconds(TappingPhase::RightHand, config.hand_duration_s),
        ];
        Ok(Self {
            controller: PhaseController::new(plan),
            left_taps: Vec::new(),
            right_taps: Vec::new(),
            qc: QualityFlags::pristine(),
            config,
        })
    }

    pub fn phase(&self) -> Option<TappingPhase> {
        self.controller.current()
    }

    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }

    pub fn qc(&self) -> &QualityFlags {
        &self.qc
    }

    pub fn time_remaining(&self) -> Option<u32> {
        self.controller.time_remaining()
    }

    pub fn acknowledge_instructions(&mut self) -> TappingOutcome {
        if self.controller.current() != Some(TappingPhase::Instructions) {
            return TappingOutcome::Ignored;
        }
        let transition = self.controller.complete_phase();
        self.map_transition(transition)
    }

    /// Appends one tap to the active hand. Taps outside the two hand
    /// phases are late/early presses and are ignored.
    pub fn register_tap(&mut self, timestamp: InstantStamp) -> bool {
        let hand = match self.controller.current() {
            Some(TappingPhase::LeftHand) => Hand::Left,
            Some(TappingPhase::RightHand) => Hand::Right,
            _ => {
                self.qc.log_late();
                debug!("tap outside a hand phase; ignored");
                return false;
            }
        };

        if let Some(counters) = self.controller.counters_mut() {
            counters.taps = counters.taps.saturating_add(1);
        }
        match hand {
            Hand::Left => self.left_taps.push(timestamp),
            Hand::Right => self.right_taps.push(timestamp),
        }
        true
    }

    /// 1 Hz countdown tick.
    pub fn on_second_tick(&mut self) -> TappingOutcome {
        let transition = self.controller.on_second_tick();
        self.map_transition(transition)
    }

    pub fn abort(&mut self) {
        self.controller.cancel();
        self.qc.mark_aborted();
    }

    fn map_transition(&mut self, transition: Transition<TappingPhase>) -> TappingOutcome {
        match transition {
            Transition::Stay => TappingOutcome::Stay,
            Transition::Entered(p) => TappingOutcome::PhaseEntered(p),
            Transition::Completed => {
                let min = self.config.min_taps_per_hand as usize;
                self.qc
                    .mark_min_trials(self.left_taps.len() >= min && self.right_taps.len() >= min);
                TappingOutcome::RunCompleted
            }
            Transition::Ignored => TappingOutcome::Ignored,
        }
    }

    pub fn left_taps(&self) -> &[InstantStamp] {
        &self.left_taps
    }

    pub fn right_taps(&self) -> &[InstantStamp] {
        &self.right_taps
    }

    pub fn metrics(&self) -> Option<TappingMetrics> {
        if !self.is_completed() {
            return None;
        }
        Some(TappingMetrics::from_taps(&self.left_taps, &self.right_taps))
    }

    pub fn summary(&self) -> Result<Option<SummaryRecord>, EngineError> {
        let Some(metrics) = self.metrics() else {
            return Ok(None);
        };
        SummaryRecord::assemble(
            "finger_tapping",
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

    fn run_both_hands(engine: &mut TappingEngine, left: &[f64], right: &[f64]) {
        engine.acknowledge_instructions();
        for &t in left {
            engine.register_tap(t);
        }
        for _ in 0..engine.config.hand_duration_s {
            engine.on_second_tick();
        }
        for &t in right {
            engine.register_tap(t);
        }
        for _ in 0..engine.config.hand_duration_s {
            engine.on_second_tick();
        }
    }

    #[test]
    fn taps_route_to_the_active_hand() {
        let mut engine = TappingEngine::new(TappingConfig::default()).unwrap();
        run_both_hands(
            &mut engine,
            &[0.0, 200.0, 410.0, 600.0],
            &[0.0, 250.0, 500.0],
        );

        assert!(engine.is_completed());
        assert_eq!(engine.left_taps().len(), 4);
        assert_eq!(engine.right_taps().len(), 3);
    }

    #[test]
    fn taps_outside_hand_phases_are_ignored() {
        let mut engine = TappingEngine::new(TappingConfig::default()).unwrap();
        assert!(!engine.register_tap(100.0));
        assert_eq!(engine.qc().late_responses, 1);
        assert!(engine.left_taps().is_empty());
    }

    #[test]
    fn phase_countdown_transitions_between_hands() {
        let mut engine = TappingEngine::new(TappingConfig {
            hand_duration_s: 2,
            ..TappingConfig::default()
        })
        .unwrap();
        engine.acknowledge_instructions();
        assert_eq!(engine.phase(), Some(TappingPhase::LeftHand));

        assert_eq!(engine.on_second_tick(), TappingOutcome::Stay);
        assert_eq!(
            engine.on_second_tick(),
            TappingOutcome::PhaseEntered(TappingPhase::RightHand)
        );
        engine.on_second_tick();
        assert_eq!(engine.on_second_tick(), TappingOutcome::RunCompleted);
        assert!(engine.is_completed());
    }

    #[test]
    fn abort_suppresses_metrics() {
        let mut engine = TappingEngine::new(TappingConfig::default()).unwrap();
        engine.acknowledge_instructions();
        engine.register_tap(0.0);
        engine.abort();
        assert!(engine.metrics().is_none());
        assert!(!engine.register_tap(100.0));
    }
}
