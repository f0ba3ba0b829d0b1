//! Run Orchestrator - drives one query through guardrail, routing and a specialist
//!
//! Information Hiding:
//! - Hides the per-run state machine and its transition log
//! - Hides deadline enforcement around every external call
//! - Hides trace record assembly and persistence
//!
//! `Orchestrator` holds no per-run state, so one instance serves concurrent
//! runs through `&self`.

use crate::agents::guardrail::{Guardrail, GuardrailMode};
use crate::agents::messages::{RunOutcome, RunResult, RunState};
use crate::agents::router::DelegationRouter;
use crate::config::TraceConfig;
use crate::error::{CapabilityError, RunError};
use crate::trace::{gen_trace_id, is_valid_trace_id, TraceRecord, TraceStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-run configuration: trace metadata plus optional overrides
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub workflow_name: String,
    pub trace_include_sensitive_data: bool,
    /// Generated when absent or not limited to `[A-Za-z0-9_-]{1,128}`
    pub trace_id: Option<String>,
    /// Falls back to the orchestrator's mode when absent
    pub guardrail_mode: Option<GuardrailMode>,
}

impl RunConfig {
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            trace_include_sensitive_data: true,
            trace_id: None,
            guardrail_mode: None,
        }
    }

    pub fn from_settings(config: &TraceConfig) -> Self {
        Self {
            trace_include_sensitive_data: config.include_sensitive_data,
            ..Self::new(config.workflow_name.clone())
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_sensitive_data(mut self, include: bool) -> Self {
        self.trace_include_sensitive_data = include;
        self
    }

    pub fn with_guardrail_mode(mut self, mode: GuardrailMode) -> Self {
        self.guardrail_mode = Some(mode);
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from_settings(&TraceConfig::default())
    }
}

/// Mutable bookkeeping for a single run
struct RunTracker {
    state: RunState,
    transitions: Vec<RunState>,
    record: TraceRecord,
}

impl RunTracker {
    fn new(mut record: TraceRecord) -> Self {
        record.record_transition(RunState::Start);
        Self {
            state: RunState::Start,
            transitions: vec![RunState::Start],
            record,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!("[Orchestrator] {} -> {}", self.state, next);
        self.state = next;
        self.transitions.push(next);
        self.record.record_transition(next);
    }
}

pub struct Orchestrator {
    guardrail: Arc<dyn Guardrail>,
    router: DelegationRouter,
    mode: GuardrailMode,
    timeout: Duration,
    trace_store: Option<Arc<dyn TraceStore>>,
}

impl Orchestrator {
    pub fn new(guardrail: Arc<dyn Guardrail>, router: DelegationRouter) -> Self {
        Self {
            guardrail,
            router,
            mode: GuardrailMode::default(),
            timeout: DEFAULT_TIMEOUT,
            trace_store: None,
        }
    }

    pub fn with_mode(mut self, mode: GuardrailMode) -> Self {
        self.mode = mode;
        self
    }

    /// Deadline applied to each guardrail, routing and specialist call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_trace_store(mut self, store: Arc<dyn TraceStore>) -> Self {
        self.trace_store = Some(store);
        self
    }

    pub fn mode(&self) -> GuardrailMode {
        self.mode
    }

    pub fn router(&self) -> &DelegationRouter {
        &self.router
    }

    /// Run one query to a terminal state.
    ///
    /// `Ok` covers both `Done` and `Rejected`; `Err(RunError::Failed)` is the
    /// failed terminal state and still carries the trace id.
    pub async fn run(&self, query: &str, config: &RunConfig) -> Result<RunResult, RunError> {
        let trace_id = match &config.trace_id {
            Some(id) if is_valid_trace_id(id) => id.clone(),
            Some(id) => {
                let fresh = gen_trace_id();
                tracing::warn!(
                    "[Orchestrator] Trace id {:?} is not storable, using {}",
                    id,
                    fresh
                );
                fresh
            }
            None => gen_trace_id(),
        };
        let span = tracing::info_span!(
            "run",
            trace_id = %trace_id,
            workflow = %config.workflow_name
        );
        self.execute(query, config, trace_id).instrument(span).await
    }

    async fn execute(
        &self,
        query: &str,
        config: &RunConfig,
        trace_id: String,
    ) -> Result<RunResult, RunError> {
        let mode = config.guardrail_mode.unwrap_or(self.mode);
        let mut record = TraceRecord::new(
            trace_id.clone(),
            config.workflow_name.clone(),
            config.trace_include_sensitive_data,
            mode,
        );
        record.set_query(query);
        let metadata = record.metadata();
        let mut run = RunTracker::new(record);

        if config.trace_include_sensitive_data {
            tracing::info!("[Orchestrator] Processing query: {}", query);
        } else {
            tracing::info!("[Orchestrator] Processing query ({} chars)", query.len());
        }

        // Guardrail
        run.advance(RunState::GuardrailPending);
        let verdict = match self
            .with_deadline(self.guardrail.name(), self.guardrail.classify(query, &metadata))
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => return Err(self.fail(run, e).await),
        };
        run.record.set_verdict(&verdict);

        if verdict.rejected {
            match mode {
                GuardrailMode::Blocking => {
                    tracing::info!("[Orchestrator] Query rejected by {}", self.guardrail.name());
                    run.advance(RunState::Rejected);
                    self.persist(&run.record).await;
                    return Ok(RunResult {
                        trace_id,
                        workflow_name: config.workflow_name.clone(),
                        outcome: RunOutcome::Rejected { verdict },
                        transitions: run.transitions,
                    });
                }
                GuardrailMode::Advisory => {
                    tracing::warn!(
                        "[Orchestrator] {} flagged the query; advisory mode, continuing",
                        self.guardrail.name()
                    );
                }
            }
        }

        // Routing
        run.advance(RunState::RoutingPending);
        let specialist = match self
            .with_deadline(
                self.router.name(),
                self.router.select(query, Some(&verdict), &metadata),
            )
            .await
        {
            Ok(id) => id,
            Err(e) => return Err(self.fail(run, e).await),
        };
        run.record.set_specialist(&specialist);

        // Specialist
        run.advance(RunState::SpecialistPending);
        let answer = match self
            .with_deadline(
                specialist.as_str(),
                self.router.dispatch(&specialist, query, &metadata),
            )
            .await
        {
            Ok(answer) => answer,
            Err(e) => return Err(self.fail(run, e).await),
        };

        run.record.set_answer(&specialist, &answer);
        run.advance(RunState::Done);
        tracing::info!(
            "[Orchestrator] Completed via '{}' in {}ms",
            specialist,
            answer.execution_time_ms
        );
        self.persist(&run.record).await;

        Ok(RunResult {
            trace_id,
            workflow_name: config.workflow_name.clone(),
            outcome: RunOutcome::Done {
                specialist,
                answer,
                verdict,
            },
            transitions: run.transitions,
        })
    }

    async fn with_deadline<T, F>(&self, capability: &str, call: F) -> Result<T, CapabilityError>
    where
        F: Future<Output = Result<T, CapabilityError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout {
                capability: capability.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    async fn fail(&self, mut run: RunTracker, error: CapabilityError) -> RunError {
        let state = run.state;
        tracing::error!("[Orchestrator] Failed while {}: {}", state, error);

        run.record.set_error(&error);
        run.advance(RunState::Failed);
        self.persist(&run.record).await;

        RunError::Failed {
            trace_id: run.record.trace_id,
            state,
            source: error,
        }
    }

    /// Trace persistence never changes a run's outcome
    async fn persist(&self, record: &TraceRecord) {
        if let Some(store) = &self.trace_store {
            if let Err(e) = store.save(record).await {
                tracing::warn!(
                    "[Orchestrator] Failed to save trace '{}': {:#}",
                    record.trace_id,
                    e
                );
            }
        }
    }
}
