//! Session summary assembly.
//!
//! One immutable record per completed session, merging the metrics
//! payload, the phase log, and the quality-control flags. This is the
//! value handed to the submission layer; the engine itself performs no
//! network or storage I/O. Sessions abandoned before completion never
//! reach this module.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::core::error::EngineError;
use crate::core::qc::QualityFlags;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientInfo {
    pub platform: String,
    pub tz: String,
}

impl ClientInfo {
    /// Placeholder identity used when no platform shell supplies one.
    pub fn headless() -> Self {
        Self {
            platform: "engine".to_string(),
            tz: "UTC".to_string(),
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::headless()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRecord {
    pub id: String,
    pub task: String,
    pub created_at: String,
    pub client: ClientInfo,
    pub metrics: Value,
    pub qc: QualityFlags,
    pub phases: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SummaryRecord {
    /// Builds the record for a completed session. `test_type` and
    /// `completed` are stamped into the metrics payload so downstream
    /// consumers can route it without inspecting the envelope.
    pub fn assemble<M, P>(
        task: &str,
        metrics: &M,
        phases: &P,
        qc: QualityFlags,
    ) -> Result<Self, EngineError>
    where
        M: Serialize,
        P: Serialize,
    {
        let mut metrics = serde_json::to_value(metrics)?;
        if let Value::Object(map) = &mut metrics {
            map.insert("test_type".to_string(), Value::String(task.to_string()));
            map.insert("completed".to_string(), Value::Bool(true));
        }

        let record = Self {
            id: Uuid::new_v4().to_string(),
            task: task.to_string(),
            created_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
            client: ClientInfo::headless(),
            metrics,
            qc,
            phases: serde_json::to_value(phases)?,
            notes: None,
        };
        info!(task, id = %record.id, "session summary assembled");
        Ok(record)
    }

    pub fn with_client(mut self, client: ClientInfo) -> Self {
        self.client = client;
        self
    }

    pub fn with_notes<T: Into<String>>(mut self, notes: T) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
