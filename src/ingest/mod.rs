//! Document ingestion: upload a file, create a vector store, attach, poll
//!
//! Information Hiding:
//! - Hides step ordering and which failures are fatal
//! - Hides the polling schedule
//! - Exposes `run` (mutating) and `check_status` (read-only)

use crate::config::{IngestionConfig, Settings};
use crate::core::vector_store::{FileStatus, VectorStoreClient, VectorStoreFile};
use crate::error::{ConfigError, IngestError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Processing status of every file in a vector store at one point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub vector_store_id: String,
    pub files: Vec<VectorStoreFile>,
}

impl StatusSnapshot {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    /// True when no file is still being processed
    pub fn is_settled(&self) -> bool {
        self.files.iter().all(|f| f.status.is_terminal())
    }

    pub fn all_completed(&self) -> bool {
        !self.is_empty() && self.files.iter().all(|f| f.status == FileStatus::Completed)
    }

    pub fn file(&self, file_id: &str) -> Option<&VectorStoreFile> {
        self.files.iter().find(|f| f.id == file_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    pub vector_store_id: String,
    pub file_id: String,
    pub filename: String,
    /// `None` when the status could not be read after a successful attach
    pub status: Option<StatusSnapshot>,
}

pub struct IngestionFlow {
    client: VectorStoreClient,
    poll_interval: Duration,
    max_polls: u32,
}

impl IngestionFlow {
    pub fn new(client: VectorStoreClient, config: &IngestionConfig) -> Self {
        Self {
            client,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls.max(1),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let client = VectorStoreClient::new(
            Settings::api_key()?,
            settings.llm.base_url.clone(),
            settings.llm.request_timeout_ms,
        );
        Ok(Self::new(client, &settings.ingestion))
    }

    /// Upload `path` into a new vector store named `store_name`.
    ///
    /// A missing file fails before any network call. Upload, create and attach
    /// failures are fatal; a failed status read afterwards is only logged.
    pub async fn run(&self, path: &Path, store_name: &str) -> Result<IngestionReport, IngestError> {
        if !path.is_file() {
            return Err(ConfigError::MissingInputFile(path.to_path_buf()).into());
        }

        let contents = tokio::fs::read(path).await.map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document")
            .to_string();

        let uploaded = self.client.upload_file(&filename, contents).await?;
        tracing::info!("[IngestionFlow] Uploaded '{}' as {}", filename, uploaded.id);

        let store = self.client.create_vector_store(store_name).await?;
        tracing::info!("[IngestionFlow] Created vector store {}", store.id);

        self.client.attach_file(&store.id, &uploaded.id).await?;

        let status = match self.poll_until_processed(&store.id, &uploaded.id).await {
            Ok(snapshot) => Some(snapshot),
            Err(IngestError::Capability(e)) => {
                tracing::warn!("[IngestionFlow] Could not read processing status: {}", e);
                None
            }
            Err(IngestError::PollExhausted { attempts, .. }) => {
                tracing::warn!(
                    "[IngestionFlow] File still processing after {} checks; re-check later with --check-only {}",
                    attempts,
                    store.id
                );
                None
            }
            Err(e) => return Err(e),
        };

        Ok(IngestionReport {
            vector_store_id: store.id,
            file_id: uploaded.id,
            filename,
            status,
        })
    }

    /// Read-only status listing for an existing vector store
    pub async fn check_status(&self, vector_store_id: &str) -> Result<StatusSnapshot, IngestError> {
        let files = self.client.list_files(vector_store_id).await?;
        Ok(StatusSnapshot {
            vector_store_id: vector_store_id.to_string(),
            files,
        })
    }

    /// Poll until `file_id` reaches a terminal status
    pub async fn poll_until_processed(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<StatusSnapshot, IngestError> {
        for attempt in 1..=self.max_polls {
            let snapshot = self.check_status(vector_store_id).await?;

            match snapshot.file(file_id).map(|f| (f.status, f.last_error.clone())) {
                Some((FileStatus::Completed, _)) => {
                    tracing::info!("[IngestionFlow] File {} processed", file_id);
                    return Ok(snapshot);
                }
                Some((status @ (FileStatus::Failed | FileStatus::Cancelled), last_error)) => {
                    return Err(IngestError::ProcessingFailed {
                        vector_store_id: vector_store_id.to_string(),
                        file_id: file_id.to_string(),
                        status: status.to_string(),
                        message: last_error
                            .map(|e| format!("{}: {}", e.code, e.message))
                            .unwrap_or_else(|| "no error details".to_string()),
                    });
                }
                _ => {
                    tracing::debug!(
                        "[IngestionFlow] File {} not ready (check {}/{})",
                        file_id,
                        attempt,
                        self.max_polls
                    );
                }
            }

            if attempt < self.max_polls {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(IngestError::PollExhausted {
            vector_store_id: vector_store_id.to_string(),
            attempts: self.max_polls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn flow(server: &MockServer, max_polls: u32) -> IngestionFlow {
        let client = VectorStoreClient::new("sk-test".to_string(), server.uri(), 5_000);
        let config = IngestionConfig {
            poll_interval_ms: 5,
            max_polls,
            ..IngestionConfig::default()
        };
        IngestionFlow::new(client, &config)
    }

    #[tokio::test]
    async fn test_missing_file_makes_no_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = flow(&server, 3)
            .run(Path::new("definitely-missing.pdf"), "kb")
            .await;

        assert!(matches!(
            result,
            Err(IngestError::Config(ConfigError::MissingInputFile(_)))
        ));
    }

    #[tokio::test]
    async fn test_processing_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vector_stores/vs_1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "file_1",
                    "status": "failed",
                    "last_error": {"code": "unsupported_file", "message": "bad pdf"}
                }],
                "has_more": false
            })))
            .mount(&server)
            .await;

        let err = flow(&server, 3)
            .poll_until_processed("vs_1", "file_1")
            .await
            .unwrap_err();

        match err {
            IngestError::ProcessingFailed { status, message, .. } => {
                assert_eq!(status, "failed");
                assert!(message.contains("bad pdf"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_poll_gives_up_after_max_polls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vector_stores/vs_1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "file_1", "status": "in_progress"}],
                "has_more": false
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = flow(&server, 2)
            .poll_until_processed("vs_1", "file_1")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::PollExhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_status_failure_after_attach_still_reports_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "file_9"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vector_stores"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "vs_9"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vector_stores/vs_9/files"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "file_9", "status": "in_progress"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/vector_stores/vs_9/files"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();

        let report = flow(&server, 3).run(file.path(), "kb").await.unwrap();
        assert_eq!(report.vector_store_id, "vs_9");
        assert_eq!(report.file_id, "file_9");
        assert!(report.status.is_none());
    }

    #[test]
    fn test_snapshot_helpers() {
        let snapshot: StatusSnapshot = serde_json::from_value(json!({
            "vector_store_id": "vs_1",
            "files": [
                {"id": "a", "status": "completed"},
                {"id": "b", "status": "in_progress"}
            ]
        }))
        .unwrap();

        assert_eq!(snapshot.count(FileStatus::Completed), 1);
        assert!(!snapshot.is_settled());
        assert!(!snapshot.all_completed());
        assert!(snapshot.file("b").is_some());
    }
}
