//! Unrestricted hosted web search

use super::{Tool, ToolKind, ToolMetadata};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default)]
pub struct WebSearchTool;

impl WebSearchTool {
    pub fn new() -> Self {
        Self
    }
}

impl Tool for WebSearchTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "web_search".to_string(),
            description: "Search the web for current information.".to_string(),
            kind: ToolKind::WebSearch,
        }
    }

    fn definition(&self) -> Value {
        json!({ "type": "web_search_preview" })
    }
}
