use std::sync::Arc;
use std::time::Duration;

use agora_db::{create_pool, run_migrations, DbRuntimeSettings};
use agora_evidence::EvidenceSource;
use agora_gateway::{
    CompletionBackend, GatewayConfig, GatewayError, GenerateRequest, GenerateResponse,
    ModelGateway,
};
use agora_server::transport::BroadcastNotifier;
use agora_server::{app, AppState};
use async_trait::async_trait;
use serde_json::json;
use tokio::net::TcpListener;

struct FixedSummary;

#[async_trait]
impl CompletionBackend for FixedSummary {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        Ok(GenerateResponse {
            model: request.model.clone(),
            text: r#"{"topic": "Weekend plans"}"#.to_string(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn thread_events_stream_summary_notifications() {
    // 1. Setup DB
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agora.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();

    // 2. Setup AppState
    let gateway = ModelGateway::new(Arc::new(FixedSummary), GatewayConfig::default());
    let state = AppState::new(
        pool,
        gateway,
        EvidenceSource::new(vec![]),
        Arc::new(BroadcastNotifier::new(16)),
        false,
    );

    // 3. Start Server
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_url = format!("http://{}", addr);
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });

    let client = reqwest::Client::new();
    for (thread_id, content) in [("t-1", "Hike on Saturday?"), ("t-2", "Unrelated")] {
        let created = client
            .post(format!("{server_url}/api/threads"))
            .json(&json!({ "thread_id": thread_id, "title": thread_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), 201);
        let posted = client
            .post(format!("{server_url}/api/threads/{thread_id}/messages"))
            .json(&json!({ "author_id": "u-1", "author_name": "Dana", "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(posted.status(), 201);
    }

    let missing = client
        .get(format!("{server_url}/api/threads/nope/events"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    // 4. Connect to SSE Stream
    let mut response = client
        .get(format!("{server_url}/api/threads/t-1/events"))
        .send()
        .await
        .expect("Failed to connect to SSE stream");
    assert!(response.status().is_success());

    tokio::time::sleep(Duration::from_millis(100)).await;

    // 5. Trigger facilitation on another thread, then on the watched one
    for thread_id in ["t-2", "t-1"] {
        let report: serde_json::Value = client
            .post(format!("{server_url}/api/threads/{thread_id}/facilitate"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(report["intervened"], true, "{report}");
    }

    // 6. Verify only the watched thread's events arrive
    let mut received = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !received.contains("event: thread:state") {
        let chunk = tokio::time::timeout_at(deadline, response.chunk())
            .await
            .expect("timed out waiting for SSE events")
            .unwrap()
            .expect("stream ended");
        received.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(received.contains("event: summary:new"));
    assert!(received.contains("Weekend plans"));
    // t-2 was summarized first; its events must not reach this subscriber.
    assert_eq!(received.matches("event: summary:new").count(), 1);
    let summary_at = received.find("event: summary:new").unwrap();
    let state_at = received.find("event: thread:state").unwrap();
    assert!(summary_at < state_at);
}
