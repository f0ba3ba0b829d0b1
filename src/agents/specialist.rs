//! Specialist agent - answers a query with one hosted retrieval tool
//!
//! Information Hiding:
//! - Hides request assembly (instructions, tool definitions, trace metadata)
//! - Hides citation extraction from response annotations
//! - Exposes a single `answer` operation

use crate::agents::agent_builder::AgentDescriptor;
use crate::agents::messages::{Citation, SpecialistAnswer, SpecialistId};
use crate::core::llm::{Annotation, LanguageModel, ModelRequest, ModelResponse};
use crate::error::CapabilityError;
use crate::tools::ToolKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>()\[\]"']+"#).expect("valid URL pattern"));

pub struct SpecialistAgent {
    agent: Arc<AgentDescriptor>,
    model: Arc<dyn LanguageModel>,
}

impl SpecialistAgent {
    pub fn new(agent: Arc<AgentDescriptor>, model: Arc<dyn LanguageModel>) -> Self {
        Self { agent, model }
    }

    pub fn id(&self) -> SpecialistId {
        SpecialistId::new(self.agent.name())
    }

    pub fn name(&self) -> &str {
        self.agent.name()
    }

    pub fn description(&self) -> &str {
        self.agent.handoff_description()
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.agent
    }

    /// Answer `query` using the agent's hosted tools
    pub async fn answer(
        &self,
        query: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<SpecialistAnswer, CapabilityError> {
        let start_time = Instant::now();
        tracing::info!("[{}] Answering query", self.agent.name());

        let request = ModelRequest::new(self.agent.name(), self.agent.instructions(), query)
            .with_tools(self.agent.tool_definitions())
            .with_metadata(metadata);

        let response = self.model.respond(request).await?;

        if let Some(failed) = response
            .tool_calls
            .iter()
            .find(|call| matches!(call.status.as_deref(), Some("failed") | Some("incomplete")))
        {
            return Err(CapabilityError::ToolFailed {
                capability: self.agent.name().to_string(),
                tool: failed.item_type.clone(),
                status: failed.status.clone().unwrap_or_default(),
            });
        }

        if response.text.trim().is_empty() {
            return Err(CapabilityError::EmptyOutput {
                capability: self.agent.name().to_string(),
            });
        }

        let citations = self.collect_citations(&response);
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        tracing::info!(
            "[{}] Answered in {}ms with {} citation(s)",
            self.agent.name(),
            execution_time_ms,
            citations.len()
        );

        Ok(SpecialistAnswer {
            agent_name: self.agent.name().to_string(),
            hosted_tool_calls: response
                .tool_calls
                .iter()
                .map(|call| call.item_type.clone())
                .collect(),
            text: response.text,
            citations,
            execution_time_ms,
        })
    }

    fn collect_citations(&self, response: &ModelResponse) -> Vec<Citation> {
        let mut citations: Vec<Citation> = Vec::new();

        for annotation in &response.annotations {
            let citation = match annotation {
                Annotation::UrlCitation { url, title } => Citation::Web {
                    url: url.clone(),
                    title: title.clone(),
                },
                Annotation::FileCitation { file_id, filename } => Citation::Document {
                    file_id: file_id.clone(),
                    filename: filename.clone(),
                },
                Annotation::Other => continue,
            };
            if !citations.contains(&citation) {
                citations.push(citation);
            }
        }

        // Some answers inline their sources instead of annotating them
        let has_web = citations.iter().any(|c| matches!(c, Citation::Web { .. }));
        if !has_web && self.agent.uses_tool(ToolKind::WebSearch) {
            for url in extract_urls(&response.text) {
                let citation = Citation::Web { url, title: None };
                if !citations.contains(&citation) {
                    citations.push(citation);
                }
            }
        }

        citations
    }
}

fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(&['.', ',', ';', ':'][..]).to_string())
        .collect()
}
