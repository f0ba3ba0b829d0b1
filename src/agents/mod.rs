pub mod agent_builder;
pub mod factory;
pub mod guardrail;
pub mod messages;
pub mod orchestrator;
pub mod router;
pub mod specialist;

pub use agent_builder::{AgentBuilder, AgentDescriptor};
pub use factory::AgentSystem;
pub use guardrail::{ClassificationVerdict, Guardrail, GuardrailMode, LlmClassifierGuardrail};
pub use messages::{Citation, RunOutcome, RunResult, RunState, SpecialistAnswer, SpecialistId};
pub use orchestrator::{Orchestrator, RunConfig};
pub use router::{ClassificationRoutingPolicy, DelegationRouter, LlmRoutingPolicy, RoutingPolicy};
pub use specialist::SpecialistAgent;
