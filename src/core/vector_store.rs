//! Files and Vector Stores REST client used by document ingestion
//!
//! Information Hiding:
//! - Endpoint layout, auth headers and pagination hidden
//! - Every call runs under the configured deadline
//! - Exposes typed upload/create/attach/list operations

use crate::error::CapabilityError;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tokio::time::{timeout, Duration};

const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStore {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    InProgress,
    Completed,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FileStatus::Completed | FileStatus::Cancelled | FileStatus::Failed
        )
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::InProgress => "in_progress",
            FileStatus::Completed => "completed",
            FileStatus::Cancelled => "cancelled",
            FileStatus::Failed => "failed",
            FileStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreFile {
    pub id: String,
    pub status: FileStatus,
    #[serde(default)]
    pub last_error: Option<FileError>,
}

#[derive(Debug, Deserialize)]
struct ListReply {
    data: Vec<VectorStoreFile>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

pub struct VectorStoreClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout_ms: u64,
}

impl VectorStoreClient {
    pub fn new(api_key: String, base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_ms,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
    }

    /// `{base_url}/vector_stores/{id}/files` with the id as a single encoded segment
    fn store_files_url(&self, capability: &str, vector_store_id: &str) -> Result<Url, CapabilityError> {
        let invalid = |message: String| CapabilityError::InvalidUrl {
            capability: capability.to_string(),
            message,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["vector_stores", vector_store_id, "files"]);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        capability: &str,
        request: RequestBuilder,
    ) -> Result<T, CapabilityError> {
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|source| CapabilityError::Transport {
                    capability: capability.to_string(),
                    source,
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(CapabilityError::Api {
                    capability: capability.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }

            response
                .json::<T>()
                .await
                .map_err(|e| CapabilityError::Decode {
                    capability: capability.to_string(),
                    message: e.to_string(),
                })
        };

        match timeout(Duration::from_millis(self.timeout_ms), exchange).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout {
                capability: capability.to_string(),
                timeout_ms: self.timeout_ms,
            }),
        }
    }

    /// Upload a document with purpose `assistants`
    pub async fn upload_file(
        &self,
        filename: &str,
        contents: Vec<u8>,
    ) -> Result<UploadedFile, CapabilityError> {
        tracing::info!(
            "[VectorStoreClient] Uploading '{}' ({} bytes)",
            filename,
            contents.len()
        );

        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", Part::bytes(contents).file_name(filename.to_string()));

        let request = self
            .authorized(self.client.post(format!("{}/files", self.base_url)))
            .multipart(form);

        self.send("files.create", request).await
    }

    pub async fn create_vector_store(&self, name: &str) -> Result<VectorStore, CapabilityError> {
        tracing::info!("[VectorStoreClient] Creating vector store '{}'", name);

        let request = self
            .authorized(self.client.post(format!("{}/vector_stores", self.base_url)))
            .json(&json!({ "name": name }));

        self.send("vector_stores.create", request).await
    }

    pub async fn attach_file(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<VectorStoreFile, CapabilityError> {
        tracing::info!(
            "[VectorStoreClient] Attaching file {} to vector store {}",
            file_id,
            vector_store_id
        );

        let capability = "vector_stores.files.create";
        let url = self.store_files_url(capability, vector_store_id)?;
        let request = self
            .authorized(self.client.post(url))
            .json(&json!({ "file_id": file_id }));

        self.send(capability, request).await
    }

    /// List every file attached to a vector store. Read-only.
    pub async fn list_files(
        &self,
        vector_store_id: &str,
    ) -> Result<Vec<VectorStoreFile>, CapabilityError> {
        let capability = "vector_stores.files.list";
        let url = self.store_files_url(capability, vector_store_id)?;
        let mut files = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut query = vec![("limit", PAGE_SIZE.to_string())];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }

            let request = self
                .authorized(self.client.get(url.clone()))
                .query(&query);

            let page: ListReply = self.send(capability, request).await?;
            files.extend(page.data);

            match (page.has_more, page.last_id) {
                (true, Some(last_id)) => after = Some(last_id),
                _ => break,
            }
        }

        tracing::debug!(
            "[VectorStoreClient] Vector store {} has {} files",
            vector_store_id,
            files.len()
        );
        Ok(files)
    }
}
