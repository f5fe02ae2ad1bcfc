pub mod engine;
pub mod metrics;
pub mod sequence;

pub use engine::{NBackConfig, NBackEngine, NBackOutcome, NBackPhase, TrialOutcome};
pub use metrics::NBackMetrics;
pub use sequence::NBackTrial;
