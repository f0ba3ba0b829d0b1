//! Document search over a hosted vector store

use super::{Tool, ToolKind, ToolMetadata};
use crate::error::ConfigError;
use serde_json::{json, Value};

/// Upper bound the provider accepts for `max_num_results`
pub const MAX_RESULTS_LIMIT: u32 = 50;

#[derive(Debug, Clone)]
pub struct FileSearchTool {
    vector_store_ids: Vec<String>,
    max_num_results: u32,
}

impl FileSearchTool {
    pub fn new(vector_store_id: impl Into<String>, max_num_results: u32) -> Self {
        Self {
            vector_store_ids: vec![vector_store_id.into()],
            max_num_results,
        }
    }

    pub fn with_vector_stores(vector_store_ids: Vec<String>, max_num_results: u32) -> Self {
        Self {
            vector_store_ids,
            max_num_results,
        }
    }

    pub fn vector_store_ids(&self) -> &[String] {
        &self.vector_store_ids
    }

    pub fn max_num_results(&self) -> u32 {
        self.max_num_results
    }
}

impl Tool for FileSearchTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "file_search".to_string(),
            description: format!(
                "Search the knowledge base ({}) and return up to {} passages.",
                self.vector_store_ids.join(", "),
                self.max_num_results
            ),
            kind: ToolKind::FileSearch,
        }
    }

    fn definition(&self) -> Value {
        json!({
            "type": "file_search",
            "vector_store_ids": self.vector_store_ids,
            "max_num_results": self.max_num_results,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.vector_store_ids.is_empty()
            || self.vector_store_ids.iter().any(|id| id.trim().is_empty())
        {
            return Err(ConfigError::MissingKnowledgeBase);
        }

        if self.max_num_results == 0 || self.max_num_results > MAX_RESULTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "file_search max_num_results must be between 1 and {}, got {}",
                MAX_RESULTS_LIMIT, self.max_num_results
            )));
        }

        Ok(())
    }
}
