//! In-Memory Trace Store
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for tests and single-process runs

use super::{TraceRecord, TraceStore};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Data is lost when the process terminates
pub struct InMemoryTraceStore {
    records: Arc<RwLock<HashMap<String, TraceRecord>>>,
}

impl InMemoryTraceStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTraceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TraceStore for InMemoryTraceStore {
    async fn save(&self, record: &TraceRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.trace_id.clone(), record.clone());
        tracing::debug!("[InMemoryTraceStore] Saved trace '{}'", record.trace_id);
        Ok(())
    }

    async fn load(&self, trace_id: &str) -> Result<Option<TraceRecord>> {
        let records = self.records.read().await;
        Ok(records.get(trace_id).cloned())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let records = self.records.read().await;
        let mut ids: Vec<&TraceRecord> = records.values().collect();
        ids.sort_by_key(|r| r.started_at);
        Ok(ids.into_iter().map(|r| r.trace_id.clone()).collect())
    }

    async fn exists(&self, trace_id: &str) -> Result<bool> {
        let records = self.records.read().await;
        Ok(records.contains_key(trace_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::guardrail::GuardrailMode;
    use crate::agents::messages::RunState;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemoryTraceStore::new();
        let mut record = TraceRecord::new("trace_1", "wf", true, GuardrailMode::Blocking);
        record.record_transition(RunState::Start);

        store.save(&record).await.unwrap();
        let loaded = store.load("trace_1").await.unwrap().unwrap();

        assert_eq!(loaded.workflow_name, "wf");
        assert_eq!(loaded.final_state(), Some(RunState::Start));
        assert!(store.exists("trace_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_load_missing_trace() {
        let store = InMemoryTraceStore::new();
        assert!(store.load("nope").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_overwrites_same_id() {
        let store = InMemoryTraceStore::new();
        let mut record = TraceRecord::new("trace_1", "wf", true, GuardrailMode::Blocking);
        store.save(&record).await.unwrap();

        record.record_transition(RunState::Start);
        store.save(&record).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["trace_1".to_string()]);
        let loaded = store.load("trace_1").await.unwrap().unwrap();
        assert_eq!(loaded.events.len(), 1);
    }
}
