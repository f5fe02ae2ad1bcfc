pub mod engine;
pub mod metrics;

pub use engine::{SpiralConfig, SpiralEngine, SpiralOutcome, SpiralPhase};
pub use metrics::{SpiralMetrics, SpiralScores, StrokeSample};
