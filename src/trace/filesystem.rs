//! File System Trace Store
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Directory structure management hidden behind interface
//! - Each trace is stored as {base_path}/{trace_id}.json

use super::{is_valid_trace_id, TraceRecord, TraceStore};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

pub struct FileSystemTraceStore {
    base_path: PathBuf,
}

impl FileSystemTraceStore {
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path)
            .await
            .context("Failed to create trace directory")?;

        Ok(Self { base_path })
    }

    fn trace_path(&self, trace_id: &str) -> Result<PathBuf> {
        if !is_valid_trace_id(trace_id) {
            bail!("Invalid trace id: {:?}", trace_id);
        }
        Ok(self.base_path.join(format!("{}.json", trace_id)))
    }
}

#[async_trait]
impl TraceStore for FileSystemTraceStore {
    async fn save(&self, record: &TraceRecord) -> Result<()> {
        let path = self.trace_path(&record.trace_id)?;
        let json =
            serde_json::to_string_pretty(record).context("Failed to serialize trace record")?;

        fs::write(&path, json)
            .await
            .context(format!("Failed to write trace file: {:?}", path))?;

        tracing::debug!(
            "[FileSystemTraceStore] Saved trace '{}' to {:?}",
            record.trace_id,
            path
        );
        Ok(())
    }

    async fn load(&self, trace_id: &str) -> Result<Option<TraceRecord>> {
        let path = self.trace_path(trace_id)?;

        if !path.exists() {
            tracing::debug!("[FileSystemTraceStore] Trace '{}' does not exist", trace_id);
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .await
            .context(format!("Failed to read trace file: {:?}", path))?;

        let record: TraceRecord =
            serde_json::from_str(&json).context("Failed to deserialize trace record")?;
        Ok(Some(record))
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut traces = Vec::new();
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .context("Failed to read trace directory")?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(trace_id) = path.file_stem().and_then(|s| s.to_str()) {
                    traces.push(trace_id.to_string());
                }
            }
        }

        traces.sort();
        tracing::debug!("[FileSystemTraceStore] Listed {} traces", traces.len());
        Ok(traces)
    }

    async fn exists(&self, trace_id: &str) -> Result<bool> {
        Ok(self.trace_path(trace_id)?.exists())
    }
}
