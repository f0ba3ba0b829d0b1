//! Run traces
//!
//! Information Hiding:
//! - Redaction of sensitive fields happens inside `TraceRecord` setters
//! - Storage backend hidden behind `TraceStore`
//! - Id generation hidden behind `gen_trace_id`

use crate::agents::guardrail::{ClassificationVerdict, GuardrailMode};
use crate::agents::messages::{Citation, RunState, SpecialistAnswer, SpecialistId};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemTraceStore;
pub use memory::InMemoryTraceStore;

/// A fresh trace id, e.g. `trace_3f0c...`
pub fn gen_trace_id() -> String {
    format!("trace_{}", Uuid::new_v4().simple())
}

/// Trace ids end up in file names; keep them to a safe alphabet.
pub fn is_valid_trace_id(trace_id: &str) -> bool {
    !trace_id.is_empty()
        && trace_id.len() <= 128
        && trace_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub state: RunState,
    pub at: DateTime<Utc>,
}

/// Everything recorded about one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub trace_id: String,
    pub workflow_name: String,
    pub include_sensitive_data: bool,
    pub guardrail_mode: GuardrailMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub query: Option<String>,
    pub verdict: Option<ClassificationVerdict>,
    pub specialist: Option<SpecialistId>,
    pub answer: Option<String>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub error: Option<String>,
    #[serde(default)]
    pub events: Vec<TraceEvent>,
}

impl TraceRecord {
    pub fn new(
        trace_id: impl Into<String>,
        workflow_name: impl Into<String>,
        include_sensitive_data: bool,
        guardrail_mode: GuardrailMode,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            workflow_name: workflow_name.into(),
            include_sensitive_data,
            guardrail_mode,
            started_at: Utc::now(),
            finished_at: None,
            query: None,
            verdict: None,
            specialist: None,
            answer: None,
            citations: Vec::new(),
            error: None,
            events: Vec::new(),
        }
    }

    /// Metadata attached to every model request made for this run
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert("trace_id".to_string(), self.trace_id.clone());
        metadata.insert("workflow_name".to_string(), self.workflow_name.clone());
        metadata
    }

    pub fn record_transition(&mut self, state: RunState) {
        let at = Utc::now();
        if state.is_terminal() {
            self.finished_at = Some(at);
        }
        self.events.push(TraceEvent { state, at });
    }

    pub fn set_query(&mut self, query: &str) {
        if self.include_sensitive_data {
            self.query = Some(query.to_string());
        }
    }

    pub fn set_verdict(&mut self, verdict: &ClassificationVerdict) {
        self.verdict = Some(if self.include_sensitive_data {
            verdict.clone()
        } else {
            verdict.redacted()
        });
    }

    pub fn set_answer(&mut self, specialist: &SpecialistId, answer: &SpecialistAnswer) {
        self.specialist = Some(specialist.clone());
        self.citations = answer.citations.clone();
        if self.include_sensitive_data {
            self.answer = Some(answer.text.clone());
        }
    }

    pub fn set_specialist(&mut self, specialist: &SpecialistId) {
        self.specialist = Some(specialist.clone());
    }

    pub fn set_error(&mut self, error: impl ToString) {
        self.error = Some(error.to_string());
    }

    pub fn final_state(&self) -> Option<RunState> {
        self.events.last().map(|e| e.state)
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Persistence for trace records
#[async_trait]
pub trait TraceStore: Send + Sync {
    async fn save(&self, record: &TraceRecord) -> Result<()>;

    /// `None` when no trace with that id exists
    async fn load(&self, trace_id: &str) -> Result<Option<TraceRecord>>;

    async fn list(&self) -> Result<Vec<String>>;

    async fn exists(&self, trace_id: &str) -> Result<bool> {
        Ok(self.load(trace_id).await?.is_some())
    }
}
