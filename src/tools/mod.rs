//! Hosted Tool Bindings
//!
//! Tools here are declarative handles to capabilities the model provider runs
//! server-side. Nothing is executed locally; a binding only knows how to
//! describe itself in a request and how to validate its own parameters.
//!
//! Information Hiding:
//! - Wire format of each hosted tool hidden behind `definition()`
//! - Parameter checks encapsulated per binding
//! - Agents only see `Arc<dyn Tool>`

pub mod file_search;
pub mod web_search;

pub use file_search::FileSearchTool;
pub use web_search::WebSearchTool;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which hosted capability a binding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    FileSearch,
    WebSearch,
}

impl ToolKind {
    /// The `type` of the output item the provider emits when it runs this tool.
    pub fn call_item_type(&self) -> &'static str {
        match self {
            ToolKind::FileSearch => "file_search_call",
            ToolKind::WebSearch => "web_search_call",
        }
    }
}

/// Tool metadata - describes what the binding gives an agent access to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub kind: ToolKind,
}

impl fmt::Display for ToolMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// Tool trait - all hosted tool bindings implement this
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;

    /// Request-side definition, e.g. `{"type": "web_search_preview"}`
    fn definition(&self) -> Value;

    /// Validate parameters at configuration time (optional)
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}
