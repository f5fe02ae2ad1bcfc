//! Scoring for word-list recall.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecallMetrics {
    pub presented_words: usize,
    pub recalled_correct: usize,
    /// Recalled words that were never presented.
    pub intrusions: usize,
    pub recall_rate: f64,
}

impl RecallMetrics {
    /// Order-independent matching, case- and whitespace-insensitive.
    /// Repeating a word does not score twice.
    pub fn score<S: AsRef<str>>(presented: &[S], recalled: &[S]) -> Self {
        let list: BTreeSet<String> = presented.iter().map(normalise).collect();
        let answers: BTreeSet<String> = recalled
            .iter()
            .map(normalise)
            .filter(|w| !w.is_empty())
            .collect();

        let recalled_correct = answers.intersection(&list).count();
        let intrusions = answers.difference(&list).count();
        let presented_words = list.len();

        Self {
            presented_words,
            recalled_correct,
            intrusions,
            recall_rate: if presented_words == 0 {
                0.0
            } else {
                recalled_correct as f64 / presented_words as f64
            },
        }
    }
}

fn normalise<S: AsRef<str>>(word: &S) -> String {
    word.as_ref().trim().to_lowercase()
}
