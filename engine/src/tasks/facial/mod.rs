pub mod engine;
pub mod metrics;

pub use engine::{
    DetectionEvent, DetectionKind, FacialConfig, FacialEngine, FacialOutcome, FacialPhase,
};
pub use metrics::FacialMetrics;
