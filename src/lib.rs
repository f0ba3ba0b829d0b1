//! docweb - guarded delegation between a document specialist and a web specialist
//!
//! A guardrail classifies each query; accepted queries are routed to exactly
//! one specialist, which answers with a hosted retrieval tool (file search over
//! a vector store, or web search). Document ingestion builds that vector store.
//!
//! Nothing here is global: build `Settings` and an `AgentSystem` once and pass
//! them where they are needed.

pub mod agents;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod testing;
pub mod tools;
pub mod trace;
pub mod utils;

pub use agents::{AgentBuilder, AgentSystem, Orchestrator, RunConfig, RunResult};
pub use config::Settings;
pub use core::llm::{JsonSchemaFormat, LLMClient, LanguageModel, ResponseFormat};
pub use error::{CapabilityError, ConfigError, IngestError, RunError};
