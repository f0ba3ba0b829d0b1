//! Agent descriptors and the builder that produces them
//!
//! Information Hiding:
//! - Hides Arc wrapping of tools and handoff targets
//! - Validates tool bindings once, at construction
//! - Exposes an immutable `AgentDescriptor`

use crate::core::llm::ResponseFormat;
use crate::error::ConfigError;
use crate::tools::{Tool, ToolKind};
use serde_json::Value;
use std::sync::Arc;

/// A named actor: instructions, hosted tools, handoff targets and an optional
/// structured-output format. Immutable once built.
#[derive(Clone)]
pub struct AgentDescriptor {
    name: String,
    handoff_description: String,
    instructions: String,
    tools: Vec<Arc<dyn Tool>>,
    handoffs: Vec<Arc<AgentDescriptor>>,
    output_format: Option<ResponseFormat>,
}

impl std::fmt::Debug for AgentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDescriptor")
            .field("name", &self.name)
            .field("handoff_description", &self.handoff_description)
            .field(
                "tools",
                &self
                    .tools
                    .iter()
                    .map(|t| t.metadata().name)
                    .collect::<Vec<_>>(),
            )
            .field(
                "handoffs",
                &self.handoffs.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .field("has_output_format", &self.output_format.is_some())
            .finish()
    }
}

impl AgentDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Used by routers to understand what the agent is responsible for
    pub fn handoff_description(&self) -> &str {
        &self.handoff_description
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn handoffs(&self) -> &[Arc<AgentDescriptor>] {
        &self.handoffs
    }

    pub fn output_format(&self) -> Option<&ResponseFormat> {
        self.output_format.as_ref()
    }

    pub fn uses_tool(&self, kind: ToolKind) -> bool {
        self.tools.iter().any(|t| t.metadata().kind == kind)
    }

    /// Hosted tool definitions as sent to the model
    pub fn tool_definitions(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn find_handoff(&self, name: &str) -> Option<&Arc<AgentDescriptor>> {
        self.handoffs.iter().find(|h| h.name() == name)
    }
}

/// Builder for agent descriptors
///
/// # Example
/// ```no_run
/// use docweb::agents::AgentBuilder;
/// use docweb::tools::WebSearchTool;
///
/// let agent = AgentBuilder::new("Web Search Agent")
///     .handoff_description("Retrieves up-to-date information from the web")
///     .instructions("Search the web before answering and cite your sources.")
///     .tool(WebSearchTool::new())
///     .build()
///     .unwrap();
/// assert_eq!(agent.tools().len(), 1);
/// ```
pub struct AgentBuilder {
    name: String,
    handoff_description: Option<String>,
    instructions: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    handoffs: Vec<Arc<AgentDescriptor>>,
    output_format: Option<ResponseFormat>,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handoff_description: None,
            instructions: None,
            tools: Vec::new(),
            handoffs: Vec::new(),
            output_format: None,
        }
    }

    pub fn handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Add a tool binding; it is Arc-wrapped for sharing between agents.
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tool_arc(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn handoff(mut self, target: Arc<AgentDescriptor>) -> Self {
        self.handoffs.push(target);
        self
    }

    /// Constrain the agent's answer to a JSON schema
    pub fn output_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.output_format = Some(ResponseFormat::json_schema(name, schema));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn build(self) -> Result<AgentDescriptor, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("agent name must not be empty".to_string()));
        }

        for tool in &self.tools {
            tool.validate()?;
        }

        let mut seen = std::collections::HashSet::new();
        for target in &self.handoffs {
            if !seen.insert(target.name()) {
                return Err(ConfigError::Invalid(format!(
                    "agent '{}' lists handoff '{}' twice",
                    self.name,
                    target.name()
                )));
            }
        }

        let handoff_description = self
            .handoff_description
            .unwrap_or_else(|| format!("Specialist agent: {}", self.name));

        let instructions = self.instructions.unwrap_or_else(|| {
            format!(
                "You are an agent named {}. Use your available tools to answer.",
                self.name
            )
        });

        Ok(AgentDescriptor {
            name: self.name,
            handoff_description,
            instructions,
            tools: self.tools,
            handoffs: self.handoffs,
            output_format: self.output_format,
        })
    }
}
