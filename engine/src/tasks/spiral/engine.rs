//! Session engine for the spiral-drawing task.
//!
//! One capped recording phase per hand. Stroke points stream in while a
//! hand phase is active and freeze the moment the phase ends, whether
//! by the countdown or by the participant lifting off and confirming.

use serde::Serialize;
use tracing::debug;

use crate::core::error::EngineError;
use crate::core::phase::{PhaseController, PhaseStep, Transition};
use crate::core::qc::QualityFlags;
use crate::core::timing::InstantStamp;
use crate::results::SummaryRecord;

use super::metrics::{SpiralMetrics, StrokeSample};

#[derive(Debug, Clone)]
pub struct SpiralConfig {
    /// Hard cap on each hand's drawing phase, in seconds.
    pub max_drawing_s: u32,
    /// Linear scale applied to the tremor deviation (score = 100 − k·d).
    pub k_tremor: f64,
    /// Linear scale applied to the accuracy deviation.
    pub k_accuracy: f64,
    /// Reference spiral `r = a·e^(b·θ)`: start radius `a`.
    pub start_radius: f64,
    /// Reference spiral growth rate `b`.
    pub growth_rate: f64,
    /// Angular extent of the reference spiral, in turns.
    pub turns: f64,
    /// Fixed sample count of the nearest-point sweep.
    pub sweep_samples: usize,
    /// Canvas-space centre of the reference spiral.
    pub center_x: f64,
    pub center_y: f64,
}

impl Default for SpiralConfig {
    fn default() -> Self {
        Self {
            max_drawing_s: 30,
            k_tremor: 5.0,
            k_accuracy: 2.0,
            start_radius: 2.0,
            growth_rate: 0.22,
            turns: 3.0,
            sweep_samples: 721,
            center_x: 0.0,
            center_y: 0.0,
        }
    }
}

impl SpiralConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_drawing_s == 0 {
            return Err(EngineError::invalid_config(
                "max_drawing_s",
                0.0,
                "must be positive",
            ));
        }
        if self.k_tremor < 0.0 || self.k_accuracy < 0.0 {
            return Err(EngineError::invalid_config(
                "k_tremor/k_accuracy",
                self.k_tremor.min(self.k_accuracy),
                "scale constants must be non-negative",
            ));
        }
        if self.turns <= 0.0 || self.start_radius <= 0.0 {
            return Err(EngineError::invalid_config(
                "turns/start_radius",
                self.turns.min(self.start_radius),
                "reference spiral must have positive extent",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpiralPhase {
    Instructions,
    LeftHand,
    RightHand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiralOutcome {
    PhaseEntered(SpiralPhase),
    Stay,
    RunCompleted,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct SpiralEngine {
    pub config: SpiralConfig,
    controller: PhaseController<SpiralPhase>,
    left_stroke: Vec<StrokeSample>,
    right_stroke: Vec<StrokeSample>,
    qc: QualityFlags,
}

impl SpiralEngine {
    pub fn new(config: SpiralConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let plan = vec![
            PhaseStep::manual(SpiralPhase::Instructions),
            PhaseStep::seconds(SpiralPhase::LeftHand, config.max_drawing_s),
            PhaseStep::seconds(SpiralPhase::RightHand, config.max_drawing_s),
        ];
        Ok(Self {
            controller: PhaseController::new(plan),
            left_stroke: Vec::new(),
            right_stroke: Vec::new(),
            qc: QualityFlags::pristine(),
            config,
        })
    }

    pub fn phase(&self) -> Option<SpiralPhase> {
        self.controller.current()
    }

    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }

    pub fn qc(&self) -> &QualityFlags {
        &self.qc
    }

    pub fn acknowledge_instructions(&mut self) -> SpiralOutcome {
        if self.controller.current() != Some(SpiralPhase::Instructions) {
            return SpiralOutcome::Ignored;
        }
        let transition = self.controller.complete_phase();
        self.map_transition(transition)
    }

    /// Appends one stroke point to the active hand's drawing. Points
    /// outside a hand phase are ignored.
    pub fn add_point(&mut self, x: f64, y: f64, timestamp: InstantStamp) -> bool {
        let stroke = match self.controller.current() {
            Some(SpiralPhase::LeftHand) => &mut self.left_stroke,
            Some(SpiralPhase::RightHand) => &mut self.right_stroke,
            _ => {
                self.qc.log_late();
                debug!("stroke point outside a drawing phase; ignored");
                return false;
            }
        };
        stroke.push(StrokeSample { x, y, t_ms: timestamp });
        self.controller.on_sample_tick();
        true
    }

    /// The participant confirmed the drawing before the cap elapsed.
    pub fn finish_hand(&mut self) -> SpiralOutcome {
        match self.controller.current() {
            Some(SpiralPhase::LeftHand) | Some(SpiralPhase::RightHand) => {
                let transition = self.controller.complete_phase();
                self.map_transition(transition)
            }
            _ => SpiralOutcome::Ignored,
        }
    }

    /// 1 Hz countdown tick for the drawing cap.
    pub fn on_second_tick(&mut self) -> SpiralOutcome {
        let transition = self.controller.on_second_tick();
        self.map_transition(transition)
    }

    pub fn abort(&mut self) {
        self.controller.cancel();
        self.qc.mark_aborted();
    }

    fn map_transition(&mut self, transition: Transition<SpiralPhase>) -> SpiralOutcome {
        match transition {
            Transition::Stay => SpiralOutcome::Stay,
            Transition::Entered(p) => SpiralOutcome::PhaseEntered(p),
            Transition::Completed => {
                self.qc.mark_min_trials(
                    self.left_stroke.len() >= 3 && self.right_stroke.len() >= 3,
                );
                SpiralOutcome::RunCompleted
            }
            Transition::Ignored => SpiralOutcome::Ignored,
        }
    }

    pub fn left_stroke(&self) -> &[StrokeSample] {
        &self.left_stroke
    }

    pub fn right_stroke(&self) -> &[StrokeSample] {
        &self.right_stroke
    }

    pub fn metrics(&self) -> Option<SpiralMetrics> {
        if !self.is_completed() {
            return None;
        }
        Some(SpiralMetrics::from_strokes(
            &self.left_stroke,
            &self.right_stroke,
            &self.config,
        ))
    }

    pub fn summary(&self) -> Result<Option<SummaryRecord>, EngineError> {
        let Some(metrics) = self.metrics() else {
            return Ok(None);
        };
        SummaryRecord::assemble(
            "spiral_drawing",
            &metrics,
            &self.controller.log(),
            self.qc.clone(),
        )
        .map(Some)
    }
}
