//! Engine error type.
//!
//! Only two surfaces are fallible: construction-time configuration
//! validation and summary-record assembly. Response-path irregularities
//! (late, duplicate, wrong-index) are not errors; they are tallied on
//! [`crate::core::qc::QualityFlags`] and otherwise ignored.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {field} = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("failed to serialise summary payload: {0}")]
    Assembly(#[from] serde_json::Error),

    #[error("failed to format summary timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl EngineError {
    pub fn invalid_config(field: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidConfig {
            field,
            value,
            reason,
        }
    }
}
