//! Duration bookkeeping for the speech protocols.

use serde::{Deserialize, Serialize};

use crate::core::phase::{PhaseBound, PhaseRecord};

use super::engine::{SpeechConfig, SpeechPhase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SustainedVowelMetrics {
    pub recording_duration_s: u32,
    pub target_duration_s: u32,
    /// Phonation reached the configured target length.
    pub target_met: bool,
    /// The participant stopped before the recording cap.
    pub stopped_early: bool,
}

impl SustainedVowelMetrics {
    pub fn from_log(log: &[PhaseRecord<SpeechPhase>], config: &SpeechConfig) -> Self {
        let (recording_duration_s, stopped_early) = recording_stats(log);
        Self {
            recording_duration_s,
            target_duration_s: config.target_duration_s,
            target_met: recording_duration_s >= config.target_duration_s,
            stopped_early,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PictureDescriptionMetrics {
    pub viewing_duration_s: u32,
    pub recording_duration_s: u32,
    pub stopped_early: bool,
}

impl PictureDescriptionMetrics {
    pub fn from_log(log: &[PhaseRecord<SpeechPhase>], _config: &SpeechConfig) -> Self {
        let viewing_duration_s = log
            .iter()
            .find(|r| r.phase == SpeechPhase::Viewing)
            .map(|r| r.elapsed_seconds)
            .unwrap_or(0);
        let (recording_duration_s, stopped_early) = recording_stats(log);
        Self {
            viewing_duration_s,
            recording_duration_s,
            stopped_early,
        }
    }
}

fn recording_stats(log: &[PhaseRecord<SpeechPhase>]) -> (u32, bool) {
    log.iter()
        .find(|r| r.phase == SpeechPhase::Recording)
        .map(|r| {
            let cap = match r.bound {
                PhaseBound::Seconds(cap) => cap,
                _ => 0,
            };
            (r.elapsed_seconds, r.elapsed_seconds < cap)
        })
        .unwrap_or((0, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::phase::PhaseCounters;

    fn recording_record(elapsed: u32, cap: u32) -> PhaseRecord<SpeechPhase> {
        PhaseRecord {
            phase: SpeechPhase::Recording,
            bound: PhaseBound::Seconds(cap),
            elapsed_seconds: elapsed,
            samples: 0,
            counters: PhaseCounters::default(),
        }
    }

    #[test]
    fn target_met_compares_elapsed_to_target() {
        let config = SpeechConfig::default();
        let log = vec![recording_record(6, 30)];
        let metrics = SustainedVowelMetrics::from_log(&log, &config);
        assert!(metrics.target_met);
        assert!(metrics.stopped_early);

        let short = vec![recording_record(2, 30)];
        assert!(!SustainedVowelMetrics::from_log(&short, &config).target_met);
    }

    #[test]
    fn missing_recording_phase_yields_zeroes() {
        let metrics = SustainedVowelMetrics::from_log(&[], &SpeechConfig::default());
        assert_eq!(metrics.recording_duration_s, 0);
        assert!(!metrics.target_met);
        assert!(!metrics.stopped_early);
    }
}
