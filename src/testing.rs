//! In-process language model for tests and offline demos
//!
//! Replies are scripted per agent name. A queue with one entry left keeps
//! returning that entry, so a single `reply` covers any number of calls.

use crate::core::llm::{Annotation, HostedToolCall, LanguageModel, ModelRequest, ModelResponse};
use crate::error::CapabilityError;
use crate::tools::ToolKind;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Scripted {
    Reply(ModelResponse),
    Fail(u16),
}

#[derive(Default)]
pub struct ScriptedModel {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, agent: &str, entry: Scripted) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(agent.to_string()).or_default().push_back(entry);
        }
        self
    }

    /// Plain text answer for `agent`
    pub fn reply(self, agent: &str, text: impl Into<String>) -> Self {
        let response = ModelResponse {
            text: text.into(),
            ..Default::default()
        };
        self.push(agent, Scripted::Reply(response))
    }

    pub fn reply_with(self, agent: &str, response: ModelResponse) -> Self {
        self.push(agent, Scripted::Reply(response))
    }

    /// Answer carrying a web citation and a completed `web_search_call`
    pub fn reply_with_web_citation(self, agent: &str, text: &str, url: &str) -> Self {
        let response = ModelResponse {
            id: None,
            text: text.to_string(),
            annotations: vec![Annotation::UrlCitation {
                url: url.to_string(),
                title: None,
            }],
            tool_calls: vec![HostedToolCall {
                item_type: ToolKind::WebSearch.call_item_type().to_string(),
                status: Some("completed".to_string()),
            }],
        };
        self.push(agent, Scripted::Reply(response))
    }

    /// Fail calls for `agent` with an API error of the given status
    pub fn fail(self, agent: &str, status: u16) -> Self {
        self.push(agent, Scripted::Fail(status))
    }

    pub fn delay(mut self, agent: &str, delay: Duration) -> Self {
        self.delays.insert(agent.to_string(), delay);
        self
    }

    /// Every request received so far, in order
    pub fn calls(&self) -> Vec<ModelRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_for(&self, agent: &str) -> Vec<ModelRequest> {
        self.calls()
            .into_iter()
            .filter(|request| request.agent_name == agent)
            .collect()
    }

    fn next_entry(&self, agent: &str) -> Option<Scripted> {
        let mut scripts = self.scripts.lock().ok()?;
        let queue = scripts.get_mut(agent)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, CapabilityError> {
        let agent = request.agent_name.clone();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }

        if let Some(delay) = self.delays.get(&agent) {
            tokio::time::sleep(*delay).await;
        }

        match self.next_entry(&agent) {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail(status)) => Err(CapabilityError::Api {
                capability: agent,
                status,
                body: "scripted failure".to_string(),
            }),
            None => Err(CapabilityError::EmptyOutput { capability: agent }),
        }
    }
}
