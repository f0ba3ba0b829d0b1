use crate::agents::guardrail::ClassificationVerdict;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one specialist among a router's handoffs (its agent name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecialistId(String);

impl SpecialistId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecialistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpecialistId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SpecialistId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Citation {
    Web {
        url: String,
        title: Option<String>,
    },
    Document {
        file_id: String,
        filename: Option<String>,
    },
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Citation::Web { url, title: Some(title) } => write!(f, "{} <{}>", title, url),
            Citation::Web { url, title: None } => write!(f, "<{}>", url),
            Citation::Document {
                filename: Some(filename),
                ..
            } => write!(f, "{}", filename),
            Citation::Document { file_id, .. } => write!(f, "{}", file_id),
        }
    }
}

/// What a specialist hands back for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistAnswer {
    pub agent_name: String,
    pub text: String,
    pub citations: Vec<Citation>,
    pub hosted_tool_calls: Vec<String>,
    pub execution_time_ms: u64,
}

/// Per-request state machine:
/// `Start → GuardrailPending → {Rejected | RoutingPending} → SpecialistPending → Done | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Start,
    GuardrailPending,
    Rejected,
    RoutingPending,
    SpecialistPending,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Rejected | RunState::Done | RunState::Failed)
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Start, GuardrailPending)
                | (GuardrailPending, Rejected)
                | (GuardrailPending, RoutingPending)
                | (GuardrailPending, Failed)
                | (RoutingPending, SpecialistPending)
                | (RoutingPending, Failed)
                | (SpecialistPending, Done)
                | (SpecialistPending, Failed)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Start => "starting",
            RunState::GuardrailPending => "awaiting guardrail",
            RunState::Rejected => "rejected",
            RunState::RoutingPending => "routing",
            RunState::SpecialistPending => "awaiting specialist",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Terminal success-shaped outcomes. Failures are `RunError`.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Rejected {
        verdict: ClassificationVerdict,
    },
    Done {
        specialist: SpecialistId,
        answer: SpecialistAnswer,
        verdict: ClassificationVerdict,
    },
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub trace_id: String,
    pub workflow_name: String,
    pub outcome: RunOutcome,
    pub transitions: Vec<RunState>,
}

impl RunResult {
    pub fn final_output(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Done { answer, .. } => Some(&answer.text),
            RunOutcome::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.outcome, RunOutcome::Rejected { .. })
    }

    pub fn specialist(&self) -> Option<&SpecialistId> {
        match &self.outcome {
            RunOutcome::Done { specialist, .. } => Some(specialist),
            RunOutcome::Rejected { .. } => None,
        }
    }

    pub fn verdict(&self) -> &ClassificationVerdict {
        match &self.outcome {
            RunOutcome::Rejected { verdict } | RunOutcome::Done { verdict, .. } => verdict,
        }
    }

    pub fn final_state(&self) -> RunState {
        match self.outcome {
            RunOutcome::Rejected { .. } => RunState::Rejected,
            RunOutcome::Done { .. } => RunState::Done,
        }
    }
}
