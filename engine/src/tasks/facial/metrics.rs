//! Metric derivation for facial observation runs.

use serde::{Deserialize, Serialize};

use crate::core::phase::PhaseRecord;

use super::engine::{DetectionEvent, DetectionKind, FacialPhase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FacialMetrics {
    pub blink_count: u32,
    pub blink_rate_per_min: f64,
    pub expression_changes: u32,
    pub observation_duration_s: u32,
    pub observation_samples: u32,
}

impl FacialMetrics {
    pub fn from_events(
        events: &[DetectionEvent],
        log: &[PhaseRecord<FacialPhase>],
    ) -> Self {
        let blink_count = events
            .iter()
            .filter(|e| e.kind == DetectionKind::Blink)
            .count() as u32;
        let expression_changes = events
            .iter()
            .filter(|e| e.kind == DetectionKind::ExpressionChange)
            .count() as u32;

        let observation = log
            .iter()
            .find(|record| record.phase == FacialPhase::Observation);
        let observation_duration_s = observation.map(|r| r.elapsed_seconds).unwrap_or(0);
        let observation_samples = observation.map(|r| r.samples).unwrap_or(0);

        let blink_rate_per_min = if observation_duration_s == 0 {
            0.0
        } else {
            blink_count as f64 / observation_duration_s as f64 * 60.0
        };

        Self {
            blink_count,
            blink_rate_per_min,
            expression_changes,
            observation_duration_s,
            observation_samples,
        }
    }
}
