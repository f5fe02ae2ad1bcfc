pub mod engine;
pub mod metrics;

pub use engine::{
    PictureDescriptionEngine, SpeechConfig, SpeechOutcome, SpeechPhase, SustainedVowelEngine,
};
pub use metrics::{PictureDescriptionMetrics, SustainedVowelMetrics};
