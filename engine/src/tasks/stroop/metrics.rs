//! Metric derivation for completed Stroop runs.

use serde::{Deserialize, Serialize};

use crate::core::stats;

use super::engine::{StroopConfig, StroopResponse};
use super::sequence::{ColorWord, StroopTrial, TrialKind};

/// Audit row for one scored trial, serialized into the result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StroopTrialRow {
    pub trial: usize,
    pub word: ColorWord,
    pub ink_color: ColorWord,
    pub trial_type: TrialKind,
    pub response: Option<ColorWord>,
    pub correct: bool,
    pub reaction_time_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StroopMetrics {
    pub total_trials: usize,
    pub correct_trials: usize,
    pub accuracy: f64,
    pub congruent_accuracy: f64,
    pub incongruent_accuracy: f64,
    pub avg_reaction_time_ms: f64,
    pub median_reaction_time_ms: f64,
    pub avg_congruent_rt_ms: f64,
    pub avg_incongruent_rt_ms: f64,
    pub stroop_interference_ms: f64,
    pub rt_sd_ms: f64,
    pub rt_cv: f64,
    /// Mean RT above the anticipation threshold (not guess-mashing).
    pub rt_above_anticipation: bool,
    /// Mean RT below the disengagement threshold (still on task).
    pub rt_below_disengagement: bool,
    pub cv_acceptable: bool,
    pub trials: Vec<StroopTrialRow>,
}

impl StroopMetrics {
    /// Pure derivation from the scored block's trial/response log.
    /// Feeding the same log twice yields an identical object.
    pub fn from_trials(
        trials: &[StroopTrial],
        responses: &[Option<StroopResponse>],
        config: &StroopConfig,
    ) -> Self {
        let total_trials = trials.len();
        if total_trials == 0 {
            return Self::default();
        }

        let mut correct_trials = 0usize;
        let mut congruent_total = 0usize;
        let mut congruent_correct = 0usize;
        let mut incongruent_total = 0usize;
        let mut incongruent_correct = 0usize;
        let mut all_rts = Vec::new();
        let mut congruent_rts = Vec::new();
        let mut incongruent_rts = Vec::new();
        let mut rows = Vec::with_capacity(total_trials);

        for (trial, response) in trials.iter().zip(responses.iter()) {
            let correct = response.as_ref().map(|r| r.correct).unwrap_or(false);
            if correct {
                correct_trials += 1;
            }

            match trial.kind {
                TrialKind::Congruent => {
                    congruent_total += 1;
                    if correct {
                        congruent_correct += 1;
                    }
                }
                TrialKind::Incongruent => {
                    incongruent_total += 1;
                    if correct {
                        incongruent_correct += 1;
                    }
                }
            }

            if let Some(r) = response {
                all_rts.push(r.rt_ms);
                match trial.kind {
                    TrialKind::Congruent => congruent_rts.push(r.rt_ms),
                    TrialKind::Incongruent => incongruent_rts.push(r.rt_ms),
                }
            }

            rows.push(StroopTrialRow {
                trial: trial.index,
                word: trial.word,
                ink_color: trial.ink,
                trial_type: trial.kind,
                response: response.as_ref().map(|r| r.selected),
                correct,
                reaction_time_ms: response.as_ref().map(|r| r.rt_ms),
            });
        }

        let avg_reaction_time_ms = stats::mean(&all_rts);
        let median_reaction_time_ms = {
            let mut sorted = all_rts.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            stats::percentile(&sorted, 0.5)
        };
        let avg_congruent_rt_ms = stats::mean(&congruent_rts);
        let avg_incongruent_rt_ms = stats::mean(&incongruent_rts);
        // Interference is only meaningful when both conditions produced
        // at least one reaction time.
        let stroop_interference_ms = if congruent_rts.is_empty() || incongruent_rts.is_empty() {
            0.0
        } else {
            avg_incongruent_rt_ms - avg_congruent_rt_ms
        };

        let rt_sd_ms = stats::population_std_dev(&all_rts);
        let rt_cv = stats::coefficient_of_variation(&all_rts);

        Self {
            total_trials,
            correct_trials,
            accuracy: correct_trials as f64 / total_trials as f64,
            congruent_accuracy: ratio(congruent_correct, congruent_total),
            incongruent_accuracy: ratio(incongruent_correct, incongruent_total),
            avg_reaction_time_ms,
            median_reaction_time_ms,
            avg_congruent_rt_ms,
            avg_incongruent_rt_ms,
            stroop_interference_ms,
            rt_sd_ms,
            rt_cv,
            rt_above_anticipation: avg_reaction_time_ms > config.anticipation_threshold_ms,
            rt_below_disengagement: avg_reaction_time_ms < config.disengagement_threshold_ms,
            cv_acceptable: rt_cv <= config.cv_acceptable_threshold,
            trials: rows,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(index: usize, word: ColorWord, ink: ColorWord) -> StroopTrial {
        let kind = if word == ink {
            TrialKind::Congruent
        } else {
            TrialKind::Incongruent
        };
        StroopTrial {
            index,
            word,
            ink,
            kind,
            buttons: ColorWord::ALL,
        }
    }

    fn response(selected: ColorWord, ink: ColorWord, rt_ms: f64) -> Option<StroopResponse> {
        Some(StroopResponse {
            selected,
            timestamp_ms: 0.0,
            rt_ms,
            correct: selected == ink,
        })
    }

    fn fixture() -> (Vec<StroopTrial>, Vec<Option<StroopResponse>>) {
        let trials = vec![
            trial(0, ColorWord::Red, ColorWord::Red),
            trial(1, ColorWord::Blue, ColorWord::Green),
            trial(2, ColorWord::Green, ColorWord::Green),
            trial(3, ColorWord::Yellow, ColorWord::Red),
        ];
        let responses = vec![
            response(ColorWord::Red, ColorWord::Red, 400.0),
            response(ColorWord::Green, ColorWord::Green, 700.0),
            response(ColorWord::Green, ColorWord::Green, 500.0),
            // Window expired without an answer.
            None,
        ];
        (trials, responses)
    }

    #[test]
    fn interference_is_incongruent_minus_congruent_mean() {
        let (trials, responses) = fixture();
        let metrics = StroopMetrics::from_trials(&trials, &responses, &StroopConfig::default());

        assert_eq!(metrics.total_trials, 4);
        assert_eq!(metrics.correct_trials, 3);
        assert_eq!(metrics.accuracy, 0.75);
        assert_eq!(metrics.avg_congruent_rt_ms, 450.0);
        assert_eq!(metrics.avg_incongruent_rt_ms, 700.0);
        assert_eq!(metrics.median_reaction_time_ms, 500.0);
        assert_eq!(metrics.stroop_interference_ms, 250.0);
        assert_eq!(metrics.congruent_accuracy, 1.0);
        assert_eq!(metrics.incongruent_accuracy, 0.5);
    }

    #[test]
    fn no_response_rows_score_incorrect_with_null_rt() {
        let (trials, responses) = fixture();
        let metrics = StroopMetrics::from_trials(&trials, &responses, &StroopConfig::default());

        let last = metrics.trials.last().unwrap();
        assert!(!last.correct);
        assert_eq!(last.response, None);
        assert_eq!(last.reaction_time_ms, None);
    }

    #[test]
    fn derivation_is_idempotent() {
        let (trials, responses) = fixture();
        let config = StroopConfig::default();
        let first = StroopMetrics::from_trials(&trials, &responses, &config);
        let second = StroopMetrics::from_trials(&trials, &responses, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_log_yields_zero_defaults() {
        let metrics = StroopMetrics::from_trials(&[], &[], &StroopConfig::default());
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.stroop_interference_ms, 0.0);
        assert_eq!(metrics.avg_reaction_time_ms, 0.0);
    }

    #[test]
    fn validity_flags_follow_thresholds() {
        let trials = vec![trial(0, ColorWord::Red, ColorWord::Red)];
        let responses = vec![response(ColorWord::Red, ColorWord::Red, 90.0)];
        let metrics = StroopMetrics::from_trials(&trials, &responses, &StroopConfig::default());
        // 90 ms mean sits below the anticipation threshold.
        assert!(!metrics.rt_above_anticipation);
        assert!(metrics.rt_below_disengagement);
        assert!(metrics.cv_acceptable);
    }
}
