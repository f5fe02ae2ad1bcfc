//! N-Back position sequence construction.
//!
//! Match trials are forced by copying the position `n` steps back;
//! non-match trials exclude that position from the draw, so the
//! realized match rate tracks the configured probability and no
//! accidental match can occur on a non-match trial. Indices before the
//! lag are unconstrained and never count as matches.

use rand::Rng;
use serde::Serialize;

use super::engine::TrialOutcome;

/// One stimulus of the spatial n-back stream. The `is_match` flag is
/// fixed at generation time; the outcome starts `Pending` and is
/// classified exactly once by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NBackTrial {
    pub index: usize,
    /// Grid cell index in `0..grid_size`.
    pub position: u8,
    pub is_match: bool,
    pub outcome: TrialOutcome,
}

pub fn generate<R: Rng>(
    rng: &mut R,
    length: usize,
    grid_size: u8,
    n_back: usize,
    match_probability: f64,
) -> Vec<NBackTrial> {
    let p = match_probability.clamp(0.0, 1.0);
    let grid = grid_size.max(2);
    let mut positions: Vec<u8> = Vec::with_capacity(length);
    let mut trials = Vec::with_capacity(length);

    for index in 0..length {
        let (position, is_match) = if index < n_back {
            (rng.gen_range(0..grid), false)
        } else {
            let anchor = positions[index - n_back];
            if rng.gen_bool(p) {
                (anchor, true)
            } else {
                (draw_excluding(rng, grid, anchor), false)
            }
        };

        positions.push(position);
        trials.push(NBackTrial {
            index,
            position,
            is_match,
            outcome: TrialOutcome::Pending,
        });
    }

    trials
}

/// Uniform draw over `0..grid` that can never land on `excluded`.
fn draw_excluding<R: Rng>(rng: &mut R, grid: u8, excluded: u8) -> u8 {
    let raw = rng.gen_range(0..grid - 1);
    if raw >= excluded {
        raw + 1
    } else {
        raw
    }
}
