//! Factory for the default agent system
//!
//! Information Hiding:
//! - Hides agent names, instructions and tool assignment
//! - Encapsulates wiring of guardrail, router and specialists
//! - Provides simple creation interface from `Settings`
//!
//! Implementation Note:
//! - Factory is a thin convenience layer over AgentBuilder

use crate::agents::agent_builder::{AgentBuilder, AgentDescriptor};
use crate::agents::guardrail::{ClassificationVerdict, LlmClassifierGuardrail, VERDICT_SCHEMA_NAME};
use crate::agents::orchestrator::Orchestrator;
use crate::agents::router::{DelegationRouter, LlmRoutingPolicy, RoutingPolicy};
use crate::config::{GuardrailConfig, KnowledgeBaseConfig, Settings};
use crate::core::llm::LanguageModel;
use crate::error::ConfigError;
use crate::tools::{FileSearchTool, WebSearchTool};
use std::sync::Arc;
use std::time::Duration;

pub const DOCUMENT_AGENT: &str = "Document Knowledge Agent";
pub const WEB_AGENT: &str = "Web Search Agent";
pub const DELEGATION_AGENT: &str = "Delegation Agent";
pub const GUARDRAIL_AGENT: &str = "Query Validator";

/// Document specialist searching the configured knowledge base
pub fn create_document_agent(
    knowledge_base: &KnowledgeBaseConfig,
) -> Result<AgentDescriptor, ConfigError> {
    let vector_store_id = knowledge_base
        .vector_store_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or(ConfigError::MissingKnowledgeBase)?;

    AgentBuilder::new(DOCUMENT_AGENT)
        .handoff_description("Specialist agent for answering questions using document knowledge")
        .instructions(
            "You are a document knowledge agent who provides accurate information from documents in the knowledge base.\n\
             Your primary purpose is to answer questions using the file search tool to retrieve relevant information from documents.\n\
             Always cite your sources when retrieving information.\n\
             Be precise and factual in your responses, and acknowledge when information might not be available in the documents.\n\
             Use the file search tool to look for relevant information before answering.",
        )
        .tool(FileSearchTool::new(
            vector_store_id,
            knowledge_base.max_num_results,
        ))
        .build()
}

pub fn create_web_agent() -> Result<AgentDescriptor, ConfigError> {
    AgentBuilder::new(WEB_AGENT)
        .handoff_description("Specialist agent for retrieving up-to-date information from the web")
        .instructions(
            "You provide up-to-date information from the web on a wide range of topics.\n\
             Your primary role is to search the internet for current information that may not be available in static documents.\n\
             Always use the web search tool to find current and accurate information before responding.\n\
             Clearly indicate when information comes from web searches and cite your sources.\n\
             If search results are limited, acknowledge that and explain what you were able to find.",
        )
        .tool(WebSearchTool::new())
        .build()
}

pub fn create_delegation_agent(
    specialists: Vec<Arc<AgentDescriptor>>,
) -> Result<AgentDescriptor, ConfigError> {
    let mut builder = AgentBuilder::new(DELEGATION_AGENT).instructions(format!(
        "You are the primary agent who receives user queries and determines which specialist to route them to.\n\
         For questions about documents, research papers, or information that might be in the knowledge base, delegate to the {}.\n\
         For questions requiring current information, news, or real-time data, delegate to the {}.\n\
         Analyze the query carefully to make the appropriate routing decision.",
        DOCUMENT_AGENT, WEB_AGENT
    ));
    for specialist in specialists {
        builder = builder.handoff(specialist);
    }
    builder.build()
}

/// Query Validator: classification instructions plus the configured topic policy
pub fn create_guardrail_agent(guardrail: &GuardrailConfig) -> Result<AgentDescriptor, ConfigError> {
    AgentBuilder::new(GUARDRAIL_AGENT)
        .instructions(format!(
            "Determine if the user query is appropriate to answer and classify it for routing.\n\n\
             Topic policy: {}\n\n\
             Set rejected to true only when the query falls outside the topic policy. \
             Set is_document_related when the answer is likely in the document knowledge base, \
             and requires_web_search when it needs current information, news or real-time data.",
            guardrail.policy
        ))
        .output_schema(VERDICT_SCHEMA_NAME, ClassificationVerdict::schema())
        .build()
}

/// The guardrail agent and the delegation agent (with its two specialists)
#[derive(Debug, Clone)]
pub struct AgentSystem {
    guardrail: Arc<AgentDescriptor>,
    delegation: Arc<AgentDescriptor>,
}

impl AgentSystem {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let document = Arc::new(create_document_agent(&settings.knowledge_base)?);
        let web = Arc::new(create_web_agent()?);

        let delegation = Arc::new(create_delegation_agent(vec![document, web])?);
        let guardrail = Arc::new(create_guardrail_agent(&settings.guardrail)?);

        tracing::debug!(
            "[AgentSystem] Built '{}' with {} specialists",
            delegation.name(),
            delegation.handoffs().len()
        );

        Ok(Self {
            guardrail,
            delegation,
        })
    }

    pub fn guardrail_agent(&self) -> &Arc<AgentDescriptor> {
        &self.guardrail
    }

    pub fn delegation_agent(&self) -> &Arc<AgentDescriptor> {
        &self.delegation
    }

    /// Orchestrator routing through the Delegation Agent's model decision
    pub fn orchestrator(
        &self,
        model: Arc<dyn LanguageModel>,
        settings: &Settings,
    ) -> Result<Orchestrator, ConfigError> {
        let policy = Arc::new(LlmRoutingPolicy::new(
            Arc::clone(&self.delegation),
            Arc::clone(&model),
        ));
        self.orchestrator_with_policy(model, settings, policy)
    }

    pub fn orchestrator_with_policy(
        &self,
        model: Arc<dyn LanguageModel>,
        settings: &Settings,
        policy: Arc<dyn RoutingPolicy>,
    ) -> Result<Orchestrator, ConfigError> {
        let router = DelegationRouter::new(Arc::clone(&self.delegation), Arc::clone(&model), policy)?;
        let guardrail = Arc::new(LlmClassifierGuardrail::new(
            Arc::clone(&self.guardrail),
            model,
        ));

        Ok(Orchestrator::new(guardrail, router)
            .with_mode(settings.guardrail.mode)
            .with_timeout(Duration::from_millis(settings.llm.request_timeout_ms)))
    }
}
