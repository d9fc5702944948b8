//! Integration tests for the memvitals agent.
//!
//! These drive the real socket server end-to-end against a scripted
//! counter source.

use std::sync::Arc;

use memvitals_agent::config::AgentConfig;
use memvitals_agent::handlers::QueryHandler;
use memvitals_agent::protocol::{read_frame, write_frame};
use memvitals_agent::server::QueryServer;
use memvitals_proto::{
    MethodCall, QueryResult, Reply, MEMORY_ERROR, METHOD_GET_MEMORY_USAGE,
    METHOD_GET_PEAK_MEMORY_USAGE,
};
use memvitals_telemetry::FakeMemorySource;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

/// Test configuration loading from YAML.
#[test]
fn test_config_yaml_parsing() {
    let yaml = r#"
socket_path: /tmp/memvitals-test.sock
log_level: debug
log_format: pretty
log_file: ""
low_mem_threshold_percent: 15
"#;

    let config: AgentConfig = serde_yaml::from_str(yaml).expect("Failed to parse YAML");

    assert_eq!(config.socket_path, "/tmp/memvitals-test.sock");
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.low_mem_threshold_percent, 15);
    assert!(config.validate().is_ok());
}

/// Partial YAML keeps defaults for omitted keys.
#[test]
fn test_config_partial_yaml_uses_defaults() {
    let config: AgentConfig = serde_yaml::from_str("log_level: warn\n").unwrap();
    assert_eq!(config.log_level, "warn");
    assert_eq!(config.low_mem_threshold_percent, 10);
    assert!(!config.socket_path.is_empty());
}

/// Missing config file falls back to defaults rather than failing.
#[test]
fn test_missing_config_file_uses_defaults() {
    let config = AgentConfig::load_from_path("/nonexistent/memvitals/agent.yaml");
    assert!(config.validate().is_ok());
}

fn start_server(socket: &std::path::Path, source: FakeMemorySource) -> (Arc<QueryServer>, JoinHandle<()>) {
    let handler = Arc::new(QueryHandler::new(Arc::new(source)));
    let server = Arc::new(QueryServer::bind(socket, handler).expect("bind socket"));

    let accept = {
        let server = server.clone();
        tokio::spawn(async move {
            let _ = server.run().await;
        })
    };

    (server, accept)
}

async fn query(stream: &mut UnixStream, id: &str, method: &str) -> Reply {
    write_frame(stream, &MethodCall::new(id, method))
        .await
        .expect("write request");
    read_frame(stream)
        .await
        .expect("read reply")
        .expect("reply present")
}

/// A single connection can issue all three kinds of request and gets the
/// matching reply statuses, in order.
#[tokio::test]
async fn test_queries_over_socket() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("agent.sock");

    let (server, accept) = start_server(&socket, FakeMemorySource::default());

    let mut stream = UnixStream::connect(&socket).await.expect("connect");

    match query(&mut stream, "q1", METHOD_GET_MEMORY_USAGE).await {
        Reply::Ok {
            id,
            result: QueryResult::Memory(report),
        } => {
            assert_eq!(id, "q1");
            assert_eq!(report.heap_total, 96);
            assert_eq!(report.system_total, 8192);
            assert!(report.heap_used <= report.heap_total);
        }
        other => panic!("expected memory report, got {other:?}"),
    }

    match query(&mut stream, "q2", METHOD_GET_PEAK_MEMORY_USAGE).await {
        Reply::Ok {
            id,
            result: QueryResult::Peak(mb),
        } => {
            assert_eq!(id, "q2");
            assert_eq!(mb, 96);
        }
        other => panic!("expected peak reading, got {other:?}"),
    }

    match query(&mut stream, "q3", "doSomethingElse").await {
        Reply::NotImplemented { id } => assert_eq!(id, "q3"),
        other => panic!("expected notImplemented, got {other:?}"),
    }

    accept.abort();
    server.cleanup();
}

/// A failed query is answered with a typed error and does not poison the
/// connection for later queries.
#[tokio::test]
async fn test_failures_are_typed_and_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("agent.sock");

    let (server, accept) = start_server(&socket, FakeMemorySource::default().fail_system());

    let mut stream = UnixStream::connect(&socket).await.expect("connect");

    match query(&mut stream, "e1", METHOD_GET_MEMORY_USAGE).await {
        Reply::Error { id, error } => {
            assert_eq!(id, "e1");
            assert_eq!(error.code, MEMORY_ERROR);
            assert!(!error.details.is_empty());
        }
        other => panic!("expected error reply, got {other:?}"),
    }

    // Peak only needs heap counters; the earlier failure must not matter.
    match query(&mut stream, "e2", METHOD_GET_PEAK_MEMORY_USAGE).await {
        Reply::Ok {
            result: QueryResult::Peak(mb),
            ..
        } => assert_eq!(mb, 96),
        other => panic!("expected peak reading, got {other:?}"),
    }

    accept.abort();
    server.cleanup();
}

/// Concurrent connections are served independently.
#[tokio::test]
async fn test_concurrent_connections() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("agent.sock");

    let (server, accept) = start_server(&socket, FakeMemorySource::default());

    let mut tasks = Vec::new();
    for n in 0..4 {
        let socket = socket.clone();
        tasks.push(tokio::spawn(async move {
            let mut stream = UnixStream::connect(&socket).await.expect("connect");
            let id = format!("c{n}");
            match query(&mut stream, &id, METHOD_GET_MEMORY_USAGE).await {
                Reply::Ok { id: reply_id, .. } => assert_eq!(reply_id, id),
                other => panic!("expected report, got {other:?}"),
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    accept.abort();
    server.cleanup();
}
