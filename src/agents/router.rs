//! Delegation Router - picks exactly one specialist per query
//!
//! The choice itself is a pluggable `RoutingPolicy`; the router owns the
//! specialists and guarantees the choice resolves to one of them
//! ("one-way ticket": each query is routed once, never to two specialists).
//!
//! Information Hiding:
//! - Hides specialist lookup and name resolution
//! - Hides the fallback when a policy names an unknown specialist
//! - Exposes select / dispatch / route

use crate::agents::agent_builder::AgentDescriptor;
use crate::agents::guardrail::ClassificationVerdict;
use crate::agents::messages::{SpecialistAnswer, SpecialistId};
use crate::agents::specialist::SpecialistAgent;
use crate::core::llm::{parse_structured, LanguageModel, ModelRequest, ResponseFormat};
use crate::error::{CapabilityError, ConfigError};
use crate::tools::ToolKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Routing decision returned by the model
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingDecision {
    pub agent_name: String,
    pub reasoning: String,
}

/// Strategy for choosing a specialist
#[async_trait]
pub trait RoutingPolicy: Send + Sync {
    async fn select(
        &self,
        query: &str,
        verdict: Option<&ClassificationVerdict>,
        metadata: &BTreeMap<String, String>,
    ) -> Result<SpecialistId, CapabilityError>;
}

/// Asks the Delegation Agent which handoff should take the query
pub struct LlmRoutingPolicy {
    router: Arc<AgentDescriptor>,
    model: Arc<dyn LanguageModel>,
}

impl LlmRoutingPolicy {
    pub fn new(router: Arc<AgentDescriptor>, model: Arc<dyn LanguageModel>) -> Self {
        Self { router, model }
    }

    fn decision_format(&self) -> ResponseFormat {
        let names: Vec<&str> = self.router.handoffs().iter().map(|h| h.name()).collect();
        ResponseFormat::json_schema(
            "routing_decision",
            json!({
                "type": "object",
                "properties": {
                    "agent_name": { "type": "string", "enum": names },
                    "reasoning": { "type": "string" }
                },
                "required": ["agent_name", "reasoning"],
                "additionalProperties": false
            }),
        )
    }

    fn instructions(&self) -> String {
        let specialists: Vec<String> = self
            .router
            .handoffs()
            .iter()
            .map(|h| format!("- {}: {}", h.name(), h.handoff_description()))
            .collect();

        format!(
            "{}\n\nAvailable specialists:\n{}\n\n\
             Respond with the exact name of one specialist and a short reason.",
            self.router.instructions(),
            specialists.join("\n")
        )
    }
}

#[async_trait]
impl RoutingPolicy for LlmRoutingPolicy {
    async fn select(
        &self,
        query: &str,
        verdict: Option<&ClassificationVerdict>,
        metadata: &BTreeMap<String, String>,
    ) -> Result<SpecialistId, CapabilityError> {
        let input = match verdict {
            Some(v) => format!(
                "Query: {}\n\nClassification: document_related={}, requires_web_search={}",
                query, v.is_document_related, v.requires_web_search
            ),
            None => format!("Query: {}", query),
        };

        let request = ModelRequest::new(self.router.name(), self.instructions(), input)
            .with_response_format(self.decision_format())
            .with_metadata(metadata);

        let response = self.model.respond(request).await?;
        let decision: RoutingDecision = parse_structured(&response.text, self.router.name())?;

        tracing::info!("[{}] Routing to '{}'", self.router.name(), decision.agent_name);
        // Reasoning tends to quote the query
        tracing::debug!("[{}] Routing reason: {}", self.router.name(), decision.reasoning);
        Ok(SpecialistId::new(decision.agent_name))
    }
}

/// Routes on the guardrail's classification flags alone, with no model call
pub struct ClassificationRoutingPolicy {
    router: Arc<AgentDescriptor>,
}

impl ClassificationRoutingPolicy {
    pub fn new(router: Arc<AgentDescriptor>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl RoutingPolicy for ClassificationRoutingPolicy {
    async fn select(
        &self,
        _query: &str,
        verdict: Option<&ClassificationVerdict>,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<SpecialistId, CapabilityError> {
        let target = preferred_tool(verdict)
            .and_then(|kind| self.router.handoffs().iter().find(|h| h.uses_tool(kind)))
            .or_else(|| self.router.handoffs().first());

        match target {
            Some(agent) => Ok(SpecialistId::new(agent.name())),
            None => Err(CapabilityError::EmptyOutput {
                capability: self.router.name().to_string(),
            }),
        }
    }
}

/// Web search only when the query needs fresh information and is not about the documents
fn preferred_tool(verdict: Option<&ClassificationVerdict>) -> Option<ToolKind> {
    let verdict = verdict?;
    if verdict.requires_web_search && !verdict.is_document_related {
        Some(ToolKind::WebSearch)
    } else if verdict.is_document_related {
        Some(ToolKind::FileSearch)
    } else if verdict.requires_web_search {
        Some(ToolKind::WebSearch)
    } else {
        None
    }
}

pub struct DelegationRouter {
    agent: Arc<AgentDescriptor>,
    specialists: Vec<SpecialistAgent>,
    policy: Arc<dyn RoutingPolicy>,
}

impl DelegationRouter {
    pub fn new(
        agent: Arc<AgentDescriptor>,
        model: Arc<dyn LanguageModel>,
        policy: Arc<dyn RoutingPolicy>,
    ) -> Result<Self, ConfigError> {
        if agent.handoffs().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "router '{}' has no specialists to delegate to",
                agent.name()
            )));
        }

        let specialists = agent
            .handoffs()
            .iter()
            .map(|handoff| SpecialistAgent::new(Arc::clone(handoff), Arc::clone(&model)))
            .collect();

        Ok(Self {
            agent,
            specialists,
            policy,
        })
    }

    pub fn name(&self) -> &str {
        self.agent.name()
    }

    pub fn specialists(&self) -> &[SpecialistAgent] {
        &self.specialists
    }

    /// Map any policy answer onto an actual specialist: exact name, then
    /// case-insensitive name, then the classification hint, then the first.
    fn resolve(
        &self,
        id: &SpecialistId,
        verdict: Option<&ClassificationVerdict>,
    ) -> &SpecialistAgent {
        let wanted = id.as_str().trim();

        if let Some(s) = self.specialists.iter().find(|s| s.name() == wanted) {
            return s;
        }
        if let Some(s) = self
            .specialists
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(wanted))
        {
            return s;
        }

        let by_hint = preferred_tool(verdict).and_then(|kind| {
            self.specialists
                .iter()
                .find(|s| s.descriptor().uses_tool(kind))
        });

        let fallback = by_hint.unwrap_or(&self.specialists[0]);
        tracing::warn!(
            "[{}] Unknown specialist '{}', falling back to '{}'",
            self.agent.name(),
            wanted,
            fallback.name()
        );
        fallback
    }

    /// Choose the specialist for `query`. Always names one of `specialists()`.
    pub async fn select(
        &self,
        query: &str,
        verdict: Option<&ClassificationVerdict>,
        metadata: &BTreeMap<String, String>,
    ) -> Result<SpecialistId, CapabilityError> {
        let proposed = self.policy.select(query, verdict, metadata).await?;
        Ok(self.resolve(&proposed, verdict).id())
    }

    /// Hand `query` to the specialist named by `id`
    pub async fn dispatch(
        &self,
        id: &SpecialistId,
        query: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<SpecialistAnswer, CapabilityError> {
        self.resolve(id, None).answer(query, metadata).await
    }

    /// Select then dispatch in one step
    pub async fn route(
        &self,
        query: &str,
        verdict: Option<&ClassificationVerdict>,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(SpecialistId, SpecialistAnswer), CapabilityError> {
        let id = self.select(query, verdict, metadata).await?;
        let answer = self.dispatch(&id, query, metadata).await?;
        Ok((id, answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::agent_builder::AgentBuilder;
    use crate::testing::ScriptedModel;
    use crate::tools::{FileSearchTool, WebSearchTool};

    const DOCS: &str = "Document Knowledge Agent";
    const WEB: &str = "Web Search Agent";
    const ROUTER: &str = "Delegation Agent";

    fn router_agent() -> Arc<AgentDescriptor> {
        let docs = AgentBuilder::new(DOCS)
            .tool(FileSearchTool::new("vs_1", 3))
            .build()
            .unwrap();
        let web = AgentBuilder::new(WEB).tool(WebSearchTool::new()).build().unwrap();
        Arc::new(
            AgentBuilder::new(ROUTER)
                .handoff(Arc::new(docs))
                .handoff(Arc::new(web))
                .build()
                .unwrap(),
        )
    }

    fn verdict(document: bool, web: bool) -> ClassificationVerdict {
        ClassificationVerdict {
            rejected: false,
            is_document_related: document,
            requires_web_search: web,
            reasoning: String::new(),
        }
    }

    fn llm_router(model: Arc<ScriptedModel>) -> DelegationRouter {
        let agent = router_agent();
        let policy = Arc::new(LlmRoutingPolicy::new(Arc::clone(&agent), model.clone()));
        DelegationRouter::new(agent, model, policy).unwrap()
    }

    #[tokio::test]
    async fn test_llm_policy_sends_enum_of_handoffs() {
        let model = Arc::new(ScriptedModel::new().reply(
            ROUTER,
            r#"{"agent_name": "Web Search Agent", "reasoning": "needs current news"}"#,
        ));
        let router = llm_router(model.clone());

        let id = router
            .select("latest AI developments", Some(&verdict(false, true)), &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(id.as_str(), WEB);

        let calls = model.calls_for(ROUTER);
        match &calls[0].response_format {
            Some(ResponseFormat::JsonSchema(format)) => {
                assert_eq!(
                    format.schema["properties"]["agent_name"]["enum"],
                    json!([DOCS, WEB])
                );
            }
            other => panic!("unexpected format: {other:?}"),
        }
        assert!(calls[0].input.contains("requires_web_search=true"));
    }

    #[tokio::test]
    async fn test_unknown_name_resolves_by_case_then_hint() {
        let model = Arc::new(ScriptedModel::new().reply(
            ROUTER,
            r#"{"agent_name": "web search agent", "reasoning": "x"}"#,
        ));
        let router = llm_router(model);
        let id = router.select("q", None, &BTreeMap::new()).await.unwrap();
        assert_eq!(id.as_str(), WEB);

        let model = Arc::new(ScriptedModel::new().reply(
            ROUTER,
            r#"{"agent_name": "Research Agent", "reasoning": "x"}"#,
        ));
        let router = llm_router(model);
        let id = router
            .select("q", Some(&verdict(false, true)), &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(id.as_str(), WEB);

        let id = router.select("q", None, &BTreeMap::new()).await.unwrap();
        assert_eq!(id.as_str(), DOCS);
    }

    #[tokio::test]
    async fn test_route_invokes_exactly_one_specialist() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply(ROUTER, r#"{"agent_name": "Document Knowledge Agent", "reasoning": "docs"}"#)
                .reply(DOCS, "Brainli is a research assistant.")
                .reply(WEB, "unused"),
        );
        let router = llm_router(model.clone());

        let (id, answer) = router
            .route("What is Brainli?", Some(&verdict(true, false)), &BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(id.as_str(), DOCS);
        assert_eq!(answer.agent_name, DOCS);
        assert_eq!(model.calls_for(DOCS).len(), 1);
        assert!(model.calls_for(WEB).is_empty());
    }

    #[tokio::test]
    async fn test_classification_policy_needs_no_model() {
        let agent = router_agent();
        let model = Arc::new(ScriptedModel::new());
        let policy = Arc::new(ClassificationRoutingPolicy::new(Arc::clone(&agent)));
        let router = DelegationRouter::new(agent, model.clone(), policy).unwrap();

        let web = router
            .select("q", Some(&verdict(false, true)), &BTreeMap::new())
            .await
            .unwrap();
        let docs = router
            .select("q", Some(&verdict(true, true)), &BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(web.as_str(), WEB);
        assert_eq!(docs.as_str(), DOCS);
        assert!(model.calls().is_empty());
    }

    #[test]
    fn test_router_without_handoffs_is_rejected() {
        let agent = Arc::new(AgentBuilder::new(ROUTER).build().unwrap());
        let model: Arc<dyn LanguageModel> = Arc::new(ScriptedModel::new());
        let policy = Arc::new(ClassificationRoutingPolicy::new(Arc::clone(&agent)));
        assert!(matches!(
            DelegationRouter::new(agent, model, policy),
            Err(ConfigError::Invalid(_))
        ));
    }
}
