//! Error taxonomy
//!
//! Three families:
//! - `ConfigError`: fatal, the process should exit before any external call
//! - `CapabilityError`: an external capability (model, search, ingestion API) failed
//! - `RunError`: a capability failure that ended an orchestrated run
//!
//! A guardrail rejection is not an error; see `RunOutcome::Rejected`.

use crate::agents::messages::RunState;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingCredential,

    #[error("input file not found: {}", .0.display())]
    MissingInputFile(PathBuf),

    #[error("knowledge base identifier is not configured (set VECTOR_STORE_ID)")]
    MissingKnowledgeBase,

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{capability}: HTTP request failed: {source}")]
    Transport {
        capability: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{capability}: API error {status}: {body}")]
    Api {
        capability: String,
        status: u16,
        body: String,
    },

    #[error("{capability}: failed to decode response: {message}")]
    Decode { capability: String, message: String },

    #[error("{capability}: no response within {timeout_ms}ms")]
    Timeout { capability: String, timeout_ms: u64 },

    #[error("{capability}: response contained no output text")]
    EmptyOutput { capability: String },

    #[error("{capability}: cannot build request URL: {message}")]
    InvalidUrl { capability: String, message: String },

    #[error("{capability}: hosted tool '{tool}' reported status '{status}'")]
    ToolFailed {
        capability: String,
        tool: String,
        status: String,
    },
}

impl CapabilityError {
    pub fn capability(&self) -> &str {
        match self {
            CapabilityError::Transport { capability, .. }
            | CapabilityError::Api { capability, .. }
            | CapabilityError::Decode { capability, .. }
            | CapabilityError::Timeout { capability, .. }
            | CapabilityError::EmptyOutput { capability }
            | CapabilityError::InvalidUrl { capability, .. }
            | CapabilityError::ToolFailed { capability, .. } => capability,
        }
    }

    /// Transport failures, rate limiting and server errors may succeed on a second attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            CapabilityError::Transport { .. } => true,
            CapabilityError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("run {trace_id} failed while {state}: {source}")]
    Failed {
        trace_id: String,
        state: RunState,
        #[source]
        source: CapabilityError,
    },
}

impl RunError {
    pub fn trace_id(&self) -> &str {
        match self {
            RunError::Failed { trace_id, .. } => trace_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file {file_id} in vector store {vector_store_id} ended as {status}: {message}")]
    ProcessingFailed {
        vector_store_id: String,
        file_id: String,
        status: String,
        message: String,
    },

    #[error("vector store {vector_store_id} still processing after {attempts} status checks")]
    PollExhausted {
        vector_store_id: String,
        attempts: u32,
    },
}
