use crate::config::LLMConfig;
use crate::error::CapabilityError;
use crate::tools::ToolKind;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonSchema(JsonSchemaFormat),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

impl ResponseFormat {
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        ResponseFormat::JsonSchema(JsonSchemaFormat {
            name: name.into(),
            description: None,
            schema,
            strict: true,
        })
    }
}

/// One call to the hosted model: an agent's instructions, the user input and the
/// hosted tools the agent may use.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub agent_name: String,
    pub instructions: String,
    pub input: String,
    pub tools: Vec<Value>,
    pub response_format: Option<ResponseFormat>,
    pub metadata: BTreeMap<String, String>,
}

impl ModelRequest {
    pub fn new(
        agent_name: impl Into<String>,
        instructions: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        let agent_name = agent_name.into();
        let mut metadata = BTreeMap::new();
        metadata.insert("agent".to_string(), agent_name.clone());

        Self {
            agent_name,
            instructions: instructions.into(),
            input: input.into(),
            tools: Vec::new(),
            response_format: None,
            metadata,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_metadata(mut self, metadata: &BTreeMap<String, String>) -> Self {
        for (key, value) in metadata {
            self.metadata.insert(key.clone(), value.clone());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    UrlCitation {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
    FileCitation {
        file_id: String,
        #[serde(default)]
        filename: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// A hosted tool invocation reported in the response output
#[derive(Debug, Clone, PartialEq)]
pub struct HostedToolCall {
    pub item_type: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub id: Option<String>,
    pub text: String,
    pub annotations: Vec<Annotation>,
    pub tool_calls: Vec<HostedToolCall>,
}

/// The language-understanding backend agents run on.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, CapabilityError>;
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [Value],
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextOptions<'a>>,
    metadata: &'a BTreeMap<String, String>,
}

fn no_tools(tools: &&[Value]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Serialize)]
struct TextOptions<'a> {
    format: &'a ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    FileSearchCall {
        #[serde(default)]
        status: Option<String>,
    },
    WebSearchCall {
        #[serde(default)]
        status: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputContent {
    OutputText {
        text: String,
        #[serde(default)]
        annotations: Vec<Annotation>,
    },
    Refusal {
        refusal: String,
    },
    #[serde(other)]
    Other,
}

impl From<ResponsesReply> for ModelResponse {
    fn from(reply: ResponsesReply) -> Self {
        let mut response = ModelResponse {
            id: reply.id,
            ..Default::default()
        };

        for item in reply.output {
            match item {
                OutputItem::Message { content } => {
                    for part in content {
                        match part {
                            OutputContent::OutputText { text, annotations } => {
                                response.text.push_str(&text);
                                response.annotations.extend(annotations);
                            }
                            OutputContent::Refusal { refusal } => response.text.push_str(&refusal),
                            OutputContent::Other => {}
                        }
                    }
                }
                OutputItem::FileSearchCall { status } => response.tool_calls.push(HostedToolCall {
                    item_type: ToolKind::FileSearch.call_item_type().to_string(),
                    status,
                }),
                OutputItem::WebSearchCall { status } => response.tool_calls.push(HostedToolCall {
                    item_type: ToolKind::WebSearch.call_item_type().to_string(),
                    status,
                }),
                OutputItem::Other => {}
            }
        }

        response
    }
}

/// Client for the OpenAI Responses API
pub struct LLMClient {
    client: Client,
    api_key: String,
    settings: LLMConfig,
}

impl LLMClient {
    pub fn new(api_key: String, settings: LLMConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.settings.base_url.trim_end_matches('/'))
    }

    async fn send_once(
        &self,
        request: &ResponsesRequest<'_>,
        capability: &str,
    ) -> Result<ModelResponse, CapabilityError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|source| CapabilityError::Transport {
                capability: capability.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CapabilityError::Api {
                capability: capability.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let reply = response
            .json::<ResponsesReply>()
            .await
            .map_err(|e| CapabilityError::Decode {
                capability: capability.to_string(),
                message: e.to_string(),
            })?;

        Ok(reply.into())
    }
}

#[async_trait]
impl LanguageModel for LLMClient {
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, CapabilityError> {
        const BASE_DELAY_MS: u64 = 1000;

        let capability = request.agent_name.as_str();
        let body = ResponsesRequest {
            model: &self.settings.model,
            instructions: &request.instructions,
            input: &request.input,
            tools: &request.tools,
            temperature: self.settings.temperature,
            max_output_tokens: self.settings.max_tokens,
            text: request
                .response_format
                .as_ref()
                .map(|format| TextOptions { format }),
            metadata: &request.metadata,
        };

        let mut attempt = 0;
        loop {
            tracing::debug!(
                "[LLMClient] Calling model '{}' for '{}' (attempt {})",
                self.settings.model,
                capability,
                attempt + 1
            );

            match self.send_once(&body, capability).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    let delay = BASE_DELAY_MS.saturating_mul(2_u64.saturating_pow(attempt));
                    tracing::warn!(
                        "[LLMClient] {} - retrying (attempt {}/{}) after {}ms",
                        e,
                        attempt + 2,
                        self.settings.max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Parse a structured (JSON) model answer.
///
/// Models sometimes wrap JSON in prose or code fences even when asked not to,
/// so the outermost `{...}` is tried when the whole text does not parse.
pub fn parse_structured<T: DeserializeOwned>(
    text: &str,
    capability: &str,
) -> Result<T, CapabilityError> {
    match serde_json::from_str::<T>(text.trim()) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
                if start < end {
                    if let Ok(value) = serde_json::from_str::<T>(&text[start..=end]) {
                        return Ok(value);
                    }
                }
            }
            Err(CapabilityError::Decode {
                capability: capability.to_string(),
                message: first_error.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Pick {
        agent_name: String,
    }

    #[test]
    fn test_reply_collects_text_annotations_and_tool_calls() {
        let reply: ResponsesReply = serde_json::from_value(json!({
            "id": "resp_1",
            "output": [
                {"type": "web_search_call", "id": "ws_1", "status": "completed"},
                {"type": "reasoning", "id": "rs_1"},
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "Trends: ...", "annotations": [
                        {"type": "url_citation", "url": "https://example.com/bi", "title": "BI 2024", "start_index": 0, "end_index": 5},
                        {"type": "container_file_citation", "file_id": "x"}
                    ]}
                ]}
            ]
        }))
        .unwrap();

        let response = ModelResponse::from(reply);
        assert_eq!(response.id.as_deref(), Some("resp_1"));
        assert_eq!(response.text, "Trends: ...");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].item_type, "web_search_call");
        assert_eq!(
            response.annotations[0],
            Annotation::UrlCitation {
                url: "https://example.com/bi".to_string(),
                title: Some("BI 2024".to_string()),
            }
        );
        assert_eq!(response.annotations[1], Annotation::Other);
    }

    #[test]
    fn test_json_schema_format_serializes_flat() {
        let format = ResponseFormat::json_schema("verdict", json!({"type": "object"}));
        let value = serde_json::to_value(&format).unwrap();

        assert_eq!(value["type"], "json_schema");
        assert_eq!(value["name"], "verdict");
        assert_eq!(value["strict"], true);
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_parse_structured_accepts_wrapped_json() {
        let text = "Here you go:\n```json\n{\"agent_name\": \"Web Search Agent\"}\n```";
        let pick: Pick = parse_structured(text, "router").unwrap();
        assert_eq!(pick.agent_name, "Web Search Agent");
    }

    #[test]
    fn test_parse_structured_rejects_prose() {
        let result = parse_structured::<Pick>("I think the web agent", "router");
        assert!(matches!(result, Err(CapabilityError::Decode { .. })));
    }

    #[test]
    fn test_request_metadata_names_agent() {
        let mut extra = BTreeMap::new();
        extra.insert("trace_id".to_string(), "t-1".to_string());
        let request = ModelRequest::new("Query Validator", "classify", "hello").with_metadata(&extra);

        assert_eq!(request.metadata["agent"], "Query Validator");
        assert_eq!(request.metadata["trace_id"], "t-1");
    }
}
