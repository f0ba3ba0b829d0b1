//! Input guardrail: classify a query before routing trusts it
//!
//! The classifier runs on the hosted model with a strict JSON schema, so the
//! verdict is typed. Whether a rejected verdict blocks the run or is only
//! logged is decided by `GuardrailMode`, not by the guardrail itself.

use crate::agents::agent_builder::AgentDescriptor;
use crate::core::llm::{parse_structured, LanguageModel, ModelRequest, ResponseFormat};
use crate::error::CapabilityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const VERDICT_SCHEMA_NAME: &str = "topic_classification";

/// Typed result of the guardrail step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    /// Tripwire: the query falls outside the topic policy
    pub rejected: bool,
    pub is_document_related: bool,
    pub requires_web_search: bool,
    pub reasoning: String,
}

impl ClassificationVerdict {
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "rejected": {
                    "type": "boolean",
                    "description": "True when the query is outside the topic policy and must not be answered"
                },
                "is_document_related": {
                    "type": "boolean",
                    "description": "True when the answer is likely in the document knowledge base"
                },
                "requires_web_search": {
                    "type": "boolean",
                    "description": "True when the answer needs current information from the web"
                },
                "reasoning": { "type": "string" }
            },
            "required": ["rejected", "is_document_related", "requires_web_search", "reasoning"],
            "additionalProperties": false
        })
    }

    pub fn response_format() -> ResponseFormat {
        ResponseFormat::json_schema(VERDICT_SCHEMA_NAME, Self::schema())
    }

    /// Same verdict without the free-text justification
    pub fn redacted(&self) -> Self {
        Self {
            reasoning: String::new(),
            ..self.clone()
        }
    }
}

/// What a rejected verdict does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardrailMode {
    /// Rejection ends the run before any specialist is invoked
    #[default]
    Blocking,
    /// Rejection is logged and recorded; routing proceeds
    Advisory,
}

#[async_trait]
pub trait Guardrail: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(
        &self,
        query: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<ClassificationVerdict, CapabilityError>;
}

/// Guardrail backed by the Query Validator agent
pub struct LlmClassifierGuardrail {
    agent: Arc<AgentDescriptor>,
    model: Arc<dyn LanguageModel>,
}

impl LlmClassifierGuardrail {
    pub fn new(agent: Arc<AgentDescriptor>, model: Arc<dyn LanguageModel>) -> Self {
        Self { agent, model }
    }
}

#[async_trait]
impl Guardrail for LlmClassifierGuardrail {
    fn name(&self) -> &str {
        self.agent.name()
    }

    async fn classify(
        &self,
        query: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<ClassificationVerdict, CapabilityError> {
        let format = self
            .agent
            .output_format()
            .cloned()
            .unwrap_or_else(ClassificationVerdict::response_format);

        let request = ModelRequest::new(self.agent.name(), self.agent.instructions(), query)
            .with_response_format(format)
            .with_metadata(metadata);

        let response = self.model.respond(request).await?;
        let verdict: ClassificationVerdict = parse_structured(&response.text, self.agent.name())?;

        tracing::debug!(
            "[{}] rejected={} document={} web={}",
            self.agent.name(),
            verdict.rejected,
            verdict.is_document_related,
            verdict.requires_web_search
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::agent_builder::AgentBuilder;
    use crate::testing::ScriptedModel;

    fn validator() -> Arc<AgentDescriptor> {
        Arc::new(
            AgentBuilder::new("Query Validator")
                .instructions("Classify the query.")
                .output_schema(VERDICT_SCHEMA_NAME, ClassificationVerdict::schema())
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_classifier_parses_verdict_and_sends_schema() {
        let model = Arc::new(ScriptedModel::new().reply(
            "Query Validator",
            r#"{"rejected": true, "is_document_related": false, "requires_web_search": false, "reasoning": "cooking"}"#,
        ));
        let guardrail = LlmClassifierGuardrail::new(validator(), model.clone());

        let verdict = guardrail
            .classify("What's the recipe for chocolate chip cookies?", &BTreeMap::new())
            .await
            .unwrap();

        assert!(verdict.rejected);
        assert_eq!(verdict.reasoning, "cooking");

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            calls[0].response_format,
            Some(ResponseFormat::JsonSchema(ref f)) if f.name == VERDICT_SCHEMA_NAME
        ));
    }

    #[tokio::test]
    async fn test_unparseable_verdict_is_a_failure_not_an_accept() {
        let model = Arc::new(ScriptedModel::new().reply("Query Validator", "Sure, looks fine!"));
        let guardrail = LlmClassifierGuardrail::new(validator(), model);

        let result = guardrail.classify("anything", &BTreeMap::new()).await;
        assert!(matches!(result, Err(CapabilityError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let model = Arc::new(ScriptedModel::new().fail("Query Validator", 503));
        let guardrail = LlmClassifierGuardrail::new(validator(), model);

        let result = guardrail.classify("anything", &BTreeMap::new()).await;
        assert!(matches!(result, Err(CapabilityError::Api { status: 503, .. })));
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(
            serde_json::from_str::<GuardrailMode>("\"advisory\"").unwrap(),
            GuardrailMode::Advisory
        );
        assert_eq!(GuardrailMode::default(), GuardrailMode::Blocking);
    }
}
