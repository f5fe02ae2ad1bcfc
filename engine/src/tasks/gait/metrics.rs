//! Summary derivation for completed gait protocol runs.
//!
//! The per-phase sample logs are flattened into three parallel axis
//! arrays in fixed phase order (calibration, walking outbound, turn,
//! walking return, start-stop), which is the layout the downstream
//! analysis pipeline consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::phase::PhaseRecord;

use super::engine::GaitPhase;
use super::sensor::ImuSample;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SensorArrays {
    pub acc_v: Vec<f64>,
    pub acc_ml: Vec<f64>,
    pub acc_ap: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GaitSummary {
    /// Steps across the two walking phases.
    pub total_steps: u32,
    pub start_stop_count: u32,
    pub walking_duration_s: u32,
    pub turn_duration_s: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GaitPhaseStat {
    pub duration_s: u32,
    pub samples: u32,
    pub steps: u32,
    pub toggles: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GaitMetrics {
    pub sensor_data: SensorArrays,
    pub summary: GaitSummary,
    pub phases: BTreeMap<String, GaitPhaseStat>,
}

/// Concatenation order of the per-phase sensor logs.
const PROTOCOL_ORDER: [GaitPhase; 5] = [
    GaitPhase::Calibration,
    GaitPhase::WalkingOutbound,
    GaitPhase::Turn,
    GaitPhase::WalkingReturn,
    GaitPhase::StartStop,
];

impl GaitMetrics {
    /// Pure derivation from the completed phase log and the per-phase
    /// sample logs, supplied in fixed protocol order.
    pub fn from_session(
        log: &[PhaseRecord<GaitPhase>],
        parts: [(GaitPhase, &Vec<ImuSample>); 5],
    ) -> Self {
        debug_assert!(
            parts
                .iter()
                .zip(PROTOCOL_ORDER.iter())
                .all(|((phase, _), expected)| phase == expected),
            "sensor logs must arrive in protocol order"
        );

        let mut sensor_data = SensorArrays::default();
        for (_, samples) in &parts {
            for sample in samples.iter() {
                sensor_data.acc_v.push(sample.acc_v);
                sensor_data.acc_ml.push(sample.acc_ml);
                sensor_data.acc_ap.push(sample.acc_ap);
            }
        }

        let mut summary = GaitSummary::default();
        let mut phases = BTreeMap::new();
        for record in log {
            if record.phase == GaitPhase::Instructions {
                continue;
            }
            phases.insert(
                record.phase.slug().to_string(),
                GaitPhaseStat {
                    duration_s: record.elapsed_seconds,
                    samples: record.samples,
                    steps: record.counters.steps,
                    toggles: record.counters.toggles,
                },
            );

            match record.phase {
                GaitPhase::WalkingOutbound | GaitPhase::WalkingReturn => {
                    summary.total_steps += record.counters.steps;
                    summary.walking_duration_s += record.elapsed_seconds;
                }
                GaitPhase::Turn => {
                    summary.turn_duration_s += record.elapsed_seconds;
                }
                GaitPhase::StartStop => {
                    summary.start_stop_count = record.counters.toggles;
                }
                _ => {}
            }
        }

        Self {
            sensor_data,
            summary,
            phases,
        }
    }
}
