//! Stroop stimulus construction.
//!
//! Word/ink pairing under a configured congruency ratio, plus the
//! answer-button shuffle. The correct answer is always the ink color,
//! never the word; on incongruent trials the ink is drawn from the
//! remaining colors so it can never equal the word's own color.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Reshuffle attempts before a repeated answer layout is accepted.
pub const MAX_SHUFFLE_RETRIES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorWord {
    Red,
    Blue,
    Green,
    Yellow,
}

impl ColorWord {
    pub const ALL: [ColorWord; 4] = [
        ColorWord::Red,
        ColorWord::Blue,
        ColorWord::Green,
        ColorWord::Yellow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ColorWord::Red => "red",
            ColorWord::Blue => "blue",
            ColorWord::Green => "green",
            ColorWord::Yellow => "yellow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialKind {
    Congruent,
    Incongruent,
}

/// One pre-generated Stroop presentation. Immutable once generated; the
/// expected answer (`ink`) is fixed here and never recomputed from the
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StroopTrial {
    pub index: usize,
    pub word: ColorWord,
    pub ink: ColorWord,
    pub kind: TrialKind,
    /// Answer-button order shown for this trial.
    pub buttons: [ColorWord; 4],
}

impl StroopTrial {
    pub fn is_congruent(&self) -> bool {
        self.kind == TrialKind::Congruent
    }
}

/// Generates the full ordered trial list for a session before the first
/// stimulus is shown.
pub fn generate<R: Rng>(rng: &mut R, trials: usize, congruent_ratio: f64) -> Vec<StroopTrial> {
    let ratio = congruent_ratio.clamp(0.0, 1.0);
    let mut out = Vec::with_capacity(trials);
    let mut previous: Option<[ColorWord; 4]> = None;

    for index in 0..trials {
        let trial = draw_trial(rng, index, ratio, previous);
        previous = Some(trial.buttons);
        out.push(trial);
    }
    out
}

fn draw_trial<R: Rng>(
    rng: &mut R,
    index: usize,
    congruent_ratio: f64,
    previous_buttons: Option<[ColorWord; 4]>,
) -> StroopTrial {
    let word = ColorWord::ALL[rng.gen_range(0..ColorWord::ALL.len())];
    let congruent = rng.gen_bool(congruent_ratio);

    let (ink, kind) = if congruent {
        (word, TrialKind::Congruent)
    } else {
        let others: Vec<ColorWord> = ColorWord::ALL
            .iter()
            .copied()
            .filter(|c| *c != word)
            .collect();
        (others[rng.gen_range(0..others.len())], TrialKind::Incongruent)
    };

    StroopTrial {
        index,
        word,
        ink,
        kind,
        buttons: shuffle_buttons(rng, previous_buttons),
    }
}

/// Draws a button permutation that differs from the previous trial's
/// layout, retrying up to [`MAX_SHUFFLE_RETRIES`] times before
/// accepting the repeat.
pub fn shuffle_buttons<R: Rng>(
    rng: &mut R,
    previous: Option<[ColorWord; 4]>,
) -> [ColorWord; 4] {
    let mut layout = ColorWord::ALL;
    layout.shuffle(rng);

    if let Some(prev) = previous {
        let mut retries = 0;
        while layout == prev && retries < MAX_SHUFFLE_RETRIES {
            layout.shuffle(rng);
            retries += 1;
        }
        if layout == prev {
            warn!(retries, "answer layout repeated after all reshuffles; accepting duplicate");
        }
    }

    layout
}
