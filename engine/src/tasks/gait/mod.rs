pub mod engine;
pub mod metrics;
pub mod sensor;

pub use engine::{GaitConfig, GaitEngine, GaitOutcome, GaitPhase};
pub use metrics::{GaitMetrics, GaitSummary, SensorArrays};
pub use sensor::{Emission, ImuProfile, ImuSample, SampleContext, SensorSource, SyntheticImu};
