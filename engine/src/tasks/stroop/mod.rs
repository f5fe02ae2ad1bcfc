pub mod engine;
pub mod metrics;
pub mod sequence;

pub use engine::{StroopConfig, StroopEngine, StroopOutcome, StroopPhase, StroopResponse};
pub use metrics::StroopMetrics;
pub use sequence::{ColorWord, StroopTrial, TrialKind};
