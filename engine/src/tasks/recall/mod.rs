pub mod engine;
pub mod metrics;

pub use engine::{RecallConfig, RecallEngine, RecallOutcome, RecallPhase, DEFAULT_WORD_LIST};
pub use metrics::RecallMetrics;
