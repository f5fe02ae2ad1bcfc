pub mod engine;
pub mod metrics;

pub use engine::{Hand, TappingConfig, TappingEngine, TappingOutcome, TappingPhase};
pub use metrics::{asymmetry_index, HandMetrics, TappingMetrics};
