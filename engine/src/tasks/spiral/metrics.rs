//! Geometric scoring for spiral drawings.
//!
//! Two bounded 0–100 scores per hand: a tremor score from the
//! deviation of each interior point against the midpoint of its
//! neighbours (a locally smoothed path), and an accuracy score from
//! the average distance to a logarithmic reference spiral, located by
//! a bounded angular sweep. Strokes with fewer than three points carry
//! no usable geometry and score zero on both axes.

use serde::{Deserialize, Serialize};

use crate::core::timing::InstantStamp;

use super::engine::SpiralConfig;

/// One raw stroke point in canvas coordinates, appended in arrival
/// order during a recording phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrokeSample {
    pub x: f64,
    pub y: f64,
    pub t_ms: InstantStamp,
}

const MIN_STROKE_POINTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpiralScores {
    pub tremor_score: f64,
    pub accuracy_score: f64,
    pub sample_count: usize,
    pub duration_ms: f64,
}

impl SpiralScores {
    pub fn from_stroke(stroke: &[StrokeSample], config: &SpiralConfig) -> Self {
        let duration_ms = match (stroke.first(), stroke.last()) {
            (Some(first), Some(last)) => (last.t_ms - first.t_ms).max(0.0),
            _ => 0.0,
        };
        Self {
            tremor_score: tremor_score(stroke, config.k_tremor),
            accuracy_score: accuracy_score(stroke, config),
            sample_count: stroke.len(),
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpiralMetrics {
    pub left_hand: SpiralScores,
    pub right_hand: SpiralScores,
}

impl SpiralMetrics {
    pub fn from_strokes(
        left: &[StrokeSample],
        right: &[StrokeSample],
        config: &SpiralConfig,
    ) -> Self {
        Self {
            left_hand: SpiralScores::from_stroke(left, config),
            right_hand: SpiralScores::from_stroke(right, config),
        }
    }
}

/// Average deviation of each interior point from the midpoint of its
/// immediate neighbours, mapped onto [0, 100].
pub fn tremor_score(stroke: &[StrokeSample], k: f64) -> f64 {
    if stroke.len() < MIN_STROKE_POINTS {
        return 0.0;
    }

    let mut total = 0.0;
    for window in stroke.windows(3) {
        let mid_x = (window[0].x + window[2].x) / 2.0;
        let mid_y = (window[0].y + window[2].y) / 2.0;
        total += ((window[1].x - mid_x).powi(2) + (window[1].y - mid_y).powi(2)).sqrt();
    }
    let avg_deviation = total / (stroke.len() - 2) as f64;

    bounded_score(avg_deviation, k)
}

/// Average distance from each drawn point to its nearest point on the
/// reference spiral, mapped onto [0, 100]. The nearest point is found
/// with a bounded sweep over the spiral's angular range rather than an
/// analytic projection.
pub fn accuracy_score(stroke: &[StrokeSample], config: &SpiralConfig) -> f64 {
    if stroke.len() < MIN_STROKE_POINTS {
        return 0.0;
    }

    let sweep = reference_sweep(config);
    let mut total = 0.0;
    for point in stroke {
        let px = point.x - config.center_x;
        let py = point.y - config.center_y;
        let mut best = f64::INFINITY;
        for &(rx, ry) in &sweep {
            let d2 = (px - rx).powi(2) + (py - ry).powi(2);
            if d2 < best {
                best = d2;
            }
        }
        total += best.sqrt();
    }
    let avg_deviation = total / stroke.len() as f64;

    bounded_score(avg_deviation, config.k_accuracy)
}

/// Samples the reference spiral `r = a·e^(b·θ)` at fixed angular steps
/// over its configured turns.
fn reference_sweep(config: &SpiralConfig) -> Vec<(f64, f64)> {
    let samples = config.sweep_samples.max(2);
    let max_angle = config.turns * std::f64::consts::TAU;
    (0..samples)
        .map(|i| {
            let theta = max_angle * i as f64 / (samples - 1) as f64;
            let r = config.start_radius * (config.growth_rate * theta).exp();
            (r * theta.cos(), r * theta.sin())
        })
        .collect()
}

fn bounded_score(avg_deviation: f64, k: f64) -> f64 {
    (100.0 - k * avg_deviation).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, y: f64, t_ms: f64) -> StrokeSample {
        StrokeSample { x, y, t_ms }
    }

    fn config() -> SpiralConfig {
        SpiralConfig::default()
    }

    #[test]
    fn too_few_points_score_zero() {
        let cfg = config();
        assert_eq!(tremor_score(&[], cfg.k_tremor), 0.0);
        assert_eq!(accuracy_score(&[], &cfg), 0.0);

        let one = [sample(10.0, 10.0, 0.0)];
        assert_eq!(tremor_score(&one, cfg.k_tremor), 0.0);
        assert_eq!(accuracy_score(&one, &cfg), 0.0);

        let two = [sample(10.0, 10.0, 0.0), sample(20.0, 20.0, 16.0)];
        assert_eq!(tremor_score(&two, cfg.k_tremor), 0.0);
        assert_eq!(accuracy_score(&two, &cfg), 0.0);
    }

    #[test]
    fn smooth_stroke_has_perfect_tremor_score() {
        // Collinear, evenly spaced: every interior point sits exactly on
        // its neighbours' midpoint.
        let stroke: Vec<StrokeSample> = (0..20)
            .map(|i| sample(i as f64 * 5.0, i as f64 * 3.0, i as f64 * 16.0))
            .collect();
        assert_eq!(tremor_score(&stroke, config().k_tremor), 100.0);
    }

    #[test]
    fn jitter_lowers_the_tremor_score() {
        let smooth: Vec<StrokeSample> = (0..30)
            .map(|i| sample(i as f64 * 4.0, 0.0, i as f64 * 16.0))
            .collect();
        let jittery: Vec<StrokeSample> = (0..30)
            .map(|i| {
                let wobble = if i % 2 == 0 { 6.0 } else { -6.0 };
                sample(i as f64 * 4.0, wobble, i as f64 * 16.0)
            })
            .collect();

        let k = config().k_tremor;
        assert!(tremor_score(&jittery, k) < tremor_score(&smooth, k));
    }

    #[test]
    fn points_on_the_reference_spiral_score_perfectly() {
        let cfg = config();
        let stroke: Vec<StrokeSample> = reference_sweep(&cfg)
            .iter()
            .step_by(10)
            .enumerate()
            .map(|(i, &(x, y))| {
                sample(x + cfg.center_x, y + cfg.center_y, i as f64 * 16.0)
            })
            .collect();

        assert!(stroke.len() >= MIN_STROKE_POINTS);
        assert_eq!(accuracy_score(&stroke, &cfg), 100.0);
    }

    #[test]
    fn scores_stay_bounded_for_wild_input() {
        let cfg = config();
        let wild = [
            sample(1e6, -1e6, 0.0),
            sample(-1e6, 1e6, 10.0),
            sample(1e6, 1e6, 20.0),
            sample(0.0, -1e6, 30.0),
        ];
        let tremor = tremor_score(&wild, cfg.k_tremor);
        let accuracy = accuracy_score(&wild, &cfg);
        assert!((0.0..=100.0).contains(&tremor));
        assert!((0.0..=100.0).contains(&accuracy));
        assert_eq!(accuracy, 0.0);
    }

    #[test]
    fn scoring_is_idempotent() {
        let cfg = config();
        let stroke: Vec<StrokeSample> = (0..12)
            .map(|i| sample(i as f64 * 2.0, (i as f64).sin() * 3.0, i as f64 * 16.0))
            .collect();
        let a = SpiralScores::from_stroke(&stroke, &cfg);
        let b = SpiralScores::from_stroke(&stroke, &cfg);
        assert_eq!(a, b);
    }
}
