//! Metric definitions and aggregation for n-back runs.

use serde::{Deserialize, Serialize};

use crate::core::stats;

use super::engine::TrialOutcome;
use super::sequence::NBackTrial;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NBackMetrics {
    pub total_trials: usize,
    pub target_trials: usize,
    pub non_target_trials: usize,
    pub hits: u32,
    pub misses: u32,
    pub false_alarms: u32,
    pub correct_rejections: u32,
    pub hit_rate: f64,
    pub false_alarm_rate: f64,
    pub accuracy: f64,
    /// Mean reaction time across hits.
    pub avg_reaction_time_ms: f64,
    pub response_count: u32,
}

impl NBackMetrics {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pure aggregation over a classified trial log.
    pub fn from_trials(trials: &[NBackTrial]) -> Self {
        let total_trials = trials.len();
        if total_trials == 0 {
            return Self::default();
        }

        let mut target_trials = 0usize;
        let mut non_target_trials = 0usize;
        let mut hits = 0u32;
        let mut misses = 0u32;
        let mut false_alarms = 0u32;
        let mut correct_rejections = 0u32;
        let mut hit_rts = Vec::new();

        for trial in trials {
            if trial.is_match {
                target_trials += 1;
            } else {
                non_target_trials += 1;
            }

            match trial.outcome {
                TrialOutcome::Hit { rt_ms } => {
                    hits = hits.saturating_add(1);
                    hit_rts.push(rt_ms);
                }
                TrialOutcome::Miss => {
                    misses = misses.saturating_add(1);
                }
                TrialOutcome::FalseAlarm { .. } => {
                    false_alarms = false_alarms.saturating_add(1);
                }
                TrialOutcome::CorrectRejection => {
                    correct_rejections = correct_rejections.saturating_add(1);
                }
                TrialOutcome::Pending => {}
            }
        }

        let hit_rate = if target_trials > 0 {
            hits as f64 / target_trials as f64
        } else {
            0.0
        };
        let false_alarm_rate = if non_target_trials > 0 {
            false_alarms as f64 / non_target_trials as f64
        } else {
            0.0
        };

        Self {
            total_trials,
            target_trials,
            non_target_trials,
            hits,
            misses,
            false_alarms,
            correct_rejections,
            hit_rate,
            false_alarm_rate,
            accuracy: (hits + correct_rejections) as f64 / total_trials as f64,
            avg_reaction_time_ms: stats::mean(&hit_rts),
            response_count: hits + false_alarms,
        }
    }
}
