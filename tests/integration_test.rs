//! Integration tests for docweb
//!
//! The hosted APIs are served by wiremock, so no API key or network is needed.

use docweb::agents::factory::{DELEGATION_AGENT, DOCUMENT_AGENT, GUARDRAIL_AGENT, WEB_AGENT};
use docweb::agents::messages::{Citation, RunState};
use docweb::config::IngestionConfig;
use docweb::core::vector_store::{FileStatus, VectorStoreClient};
use docweb::ingest::IngestionFlow;
use docweb::trace::{InMemoryTraceStore, TraceStore};
use docweb::{AgentSystem, CapabilityError, ConfigError, IngestError, LLMClient, RunConfig, RunError, Settings};
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer) -> Settings {
    let mut settings = Settings::default();
    settings.llm.base_url = server.uri();
    settings.llm.request_timeout_ms = 5_000;
    settings.knowledge_base.vector_store_id = Some("vs_test".to_string());
    settings
}

fn message(text: &str) -> Value {
    json!({
        "type": "message",
        "role": "assistant",
        "content": [{"type": "output_text", "text": text, "annotations": []}]
    })
}

fn reply(output: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"id": "resp_test", "output": output}))
}

async fn mount_agent(server: &MockServer, agent: &str, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(body_partial_json(json!({"metadata": {"agent": agent}})))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

fn verdict(rejected: bool, document: bool, web: bool) -> String {
    json!({
        "rejected": rejected,
        "is_document_related": document,
        "requires_web_search": web,
        "reasoning": "test verdict"
    })
    .to_string()
}

fn orchestrator(settings: &Settings) -> docweb::Orchestrator {
    let system = AgentSystem::from_settings(settings).unwrap();
    let model = Arc::new(LLMClient::new("sk-test".to_string(), settings.llm.clone()));
    system.orchestrator(model, settings).unwrap()
}

#[tokio::test]
async fn test_off_topic_query_is_rejected_without_routing() {
    let server = MockServer::start().await;
    mount_agent(&server, GUARDRAIL_AGENT, reply(vec![message(&verdict(true, false, false))]), 1).await;
    mount_agent(&server, DELEGATION_AGENT, reply(vec![]), 0).await;
    mount_agent(&server, DOCUMENT_AGENT, reply(vec![]), 0).await;
    mount_agent(&server, WEB_AGENT, reply(vec![]), 0).await;

    let settings = settings_for(&server);
    let result = orchestrator(&settings)
        .run(
            "What's the recipe for chocolate chip cookies?",
            &RunConfig::from_settings(&settings.tracing),
        )
        .await
        .unwrap();

    assert!(result.is_rejected());
    assert_eq!(result.final_state(), RunState::Rejected);
    assert!(result.final_output().is_none());
}

#[tokio::test]
async fn test_current_events_query_is_answered_by_web_specialist() {
    let server = MockServer::start().await;
    mount_agent(&server, GUARDRAIL_AGENT, reply(vec![message(&verdict(false, false, true))]), 1).await;
    mount_agent(
        &server,
        DELEGATION_AGENT,
        reply(vec![message(
            r#"{"agent_name": "Web Search Agent", "reasoning": "asks about 2024 trends"}"#,
        )]),
        1,
    )
    .await;
    mount_agent(&server, DOCUMENT_AGENT, reply(vec![]), 0).await;

    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(body_partial_json(json!({
            "metadata": {"agent": WEB_AGENT},
            "tools": [{"type": "web_search_preview"}]
        })))
        .respond_with(reply(vec![
            json!({"type": "web_search_call", "id": "ws_1", "status": "completed"}),
            json!({
                "type": "message",
                "role": "assistant",
                "content": [{
                    "type": "output_text",
                    "text": "Key BI trends in 2024 include augmented analytics and data mesh.",
                    "annotations": [{
                        "type": "url_citation",
                        "url": "https://example.com/bi-2024",
                        "title": "BI Trends 2024",
                        "start_index": 0,
                        "end_index": 10
                    }]
                }]
            }),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings_for(&server);
    let config = RunConfig::from_settings(&settings.tracing).with_trace_id("trace_bi");
    let result = orchestrator(&settings)
        .run(
            "What are the latest business intelligence trends in 2024?",
            &config,
        )
        .await
        .unwrap();

    assert_eq!(result.trace_id, "trace_bi");
    assert_eq!(result.specialist().unwrap().as_str(), WEB_AGENT);
    assert!(!result.final_output().unwrap().is_empty());

    match &result.outcome {
        docweb::agents::RunOutcome::Done { answer, .. } => {
            assert_eq!(
                answer.citations,
                vec![Citation::Web {
                    url: "https://example.com/bi-2024".to_string(),
                    title: Some("BI Trends 2024".to_string()),
                }]
            );
            assert_eq!(answer.hosted_tool_calls, vec!["web_search_call"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_requests_carry_trace_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(body_partial_json(json!({
            "metadata": {
                "agent": GUARDRAIL_AGENT,
                "trace_id": "trace_meta",
                "workflow_name": "Metadata Workflow"
            },
            "text": {"format": {"type": "json_schema", "strict": true}}
        })))
        .respond_with(reply(vec![message(&verdict(true, false, false))]))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings_for(&server);
    let config = RunConfig::new("Metadata Workflow").with_trace_id("trace_meta");
    let result = orchestrator(&settings).run("cookies", &config).await.unwrap();
    assert!(result.is_rejected());
}

#[tokio::test]
async fn test_advisory_mode_routes_rejected_query() {
    let server = MockServer::start().await;
    mount_agent(&server, GUARDRAIL_AGENT, reply(vec![message(&verdict(true, true, false))]), 1).await;
    mount_agent(
        &server,
        DELEGATION_AGENT,
        reply(vec![message(
            r#"{"agent_name": "Document Knowledge Agent", "reasoning": "document question"}"#,
        )]),
        1,
    )
    .await;
    mount_agent(
        &server,
        DOCUMENT_AGENT,
        reply(vec![message("The document does not cover this topic.")]),
        1,
    )
    .await;

    let mut settings = settings_for(&server);
    settings.guardrail.mode = docweb::agents::GuardrailMode::Advisory;

    let result = orchestrator(&settings)
        .run("Tell me about Brainli", &RunConfig::from_settings(&settings.tracing))
        .await
        .unwrap();

    assert!(result.verdict().rejected);
    assert_eq!(result.final_state(), RunState::Done);
    assert_eq!(result.specialist().unwrap().as_str(), DOCUMENT_AGENT);
}

#[tokio::test]
async fn test_backend_error_fails_run_and_is_traced() {
    let server = MockServer::start().await;
    mount_agent(
        &server,
        GUARDRAIL_AGENT,
        ResponseTemplate::new(503).set_body_string("overloaded"),
        1,
    )
    .await;

    let settings = settings_for(&server);
    let store = Arc::new(InMemoryTraceStore::new());
    let orchestrator = orchestrator(&settings).with_trace_store(store.clone());

    let err = orchestrator
        .run("What is Brainli?", &RunConfig::default().with_trace_id("trace_503"))
        .await
        .unwrap_err();

    let RunError::Failed { trace_id, state, source } = err;
    assert_eq!(trace_id, "trace_503");
    assert_eq!(state, RunState::GuardrailPending);
    assert!(matches!(source, CapabilityError::Api { status: 503, .. }));

    let record = store.load("trace_503").await.unwrap().unwrap();
    assert_eq!(record.final_state(), Some(RunState::Failed));
}

#[tokio::test]
async fn test_slow_backend_hits_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(
            reply(vec![message(&verdict(false, true, false))]).set_delay(Duration::from_millis(1_000)),
        )
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.llm.request_timeout_ms = 100;

    let err = orchestrator(&settings)
        .run("What is Brainli?", &RunConfig::default())
        .await
        .unwrap_err();

    let RunError::Failed { source, .. } = err;
    assert!(matches!(source, CapabilityError::Timeout { timeout_ms: 100, .. }));
}

fn ingestion_flow(server: &MockServer) -> IngestionFlow {
    let client = VectorStoreClient::new("sk-test".to_string(), server.uri(), 5_000);
    let config = IngestionConfig {
        poll_interval_ms: 10,
        max_polls: 5,
        ..IngestionConfig::default()
    };
    IngestionFlow::new(client, &config)
}

#[tokio::test]
async fn test_missing_document_fails_before_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = ingestion_flow(&server)
        .run(Path::new("no-such-dir/test.pdf"), "document_knowledge_base")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::Config(ConfigError::MissingInputFile(ref p)) if p.ends_with("test.pdf")
    ));
}

#[tokio::test]
async fn test_ingested_store_id_is_accepted_by_status_check() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file_rt",
            "filename": "test.pdf",
            "bytes": 13
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vector_stores"))
        .and(body_partial_json(json!({"name": "document_knowledge_base"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "vs_rt",
            "name": "document_knowledge_base"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vector_stores/vs_rt/files"))
        .and(body_partial_json(json!({"file_id": "file_rt"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "file_rt", "status": "in_progress"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vector_stores/vs_rt/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "file_rt", "status": "completed"}],
            "has_more": false
        })))
        .mount(&server)
        .await;

    let mut document = tempfile::NamedTempFile::new().unwrap();
    document.write_all(b"%PDF-1.4 brainli").unwrap();

    let flow = ingestion_flow(&server);
    let report = flow
        .run(document.path(), "document_knowledge_base")
        .await
        .unwrap();
    assert_eq!(report.vector_store_id, "vs_rt");
    assert!(report.status.as_ref().unwrap().all_completed());

    let snapshot = flow.check_status(&report.vector_store_id).await.unwrap();
    assert_eq!(snapshot.vector_store_id, "vs_rt");
    assert_eq!(snapshot.file("file_rt").unwrap().status, FileStatus::Completed);
}

#[tokio::test]
async fn test_status_check_is_read_only_and_repeatable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vector_stores/vs_existing/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "file_a", "status": "completed"},
                {"id": "file_b", "status": "in_progress"}
            ],
            "has_more": false
        })))
        .expect(2)
        .mount(&server)
        .await;

    let flow = ingestion_flow(&server);
    let first = flow.check_status("vs_existing").await.unwrap();
    let second = flow.check_status("vs_existing").await.unwrap();

    assert_eq!(first.files.len(), 2);
    assert_eq!(first.count(FileStatus::InProgress), second.count(FileStatus::InProgress));
    assert!(!first.is_settled());
}

#[tokio::test]
async fn test_status_check_propagates_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vector_stores/vs_missing/files"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No vector store found"))
        .mount(&server)
        .await;

    let err = ingestion_flow(&server)
        .check_status("vs_missing")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Capability(CapabilityError::Api { status: 404, .. })
    ));
}
