use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::mpsc;
use tower::ServiceExt;

use fleetwatch_common::record::LogRecord;
use fleetwatch_server::commands::CommandQueue;
use fleetwatch_server::ingest::IngestCoordinator;
use fleetwatch_server::registry::AgentRegistry;
use fleetwatch_server::rest::{router, AppState};
use fleetwatch_workers::alert::AlertStore;
use fleetwatch_workers::response::{ResponseConfig, ResponsePolicy};
use fleetwatch_workers::scoring::{default_scorers, ScoringEngine};
use fleetwatch_workers::topology::TopologyBuilder;
use fleetwatch_workers::worker::PipelineWorker;

struct Harness {
    state: AppState,
    rx: mpsc::Receiver<LogRecord>,
    worker: PipelineWorker,
}

fn harness() -> Harness {
    let registry = AgentRegistry::new(90_000, 300_000);
    let queue = CommandQueue::new(registry.clone(), 300_000);
    let topology = TopologyBuilder::new(86_400_000);
    let alerts = AlertStore::new(3_600_000, 0.5, 10_000);

    let (tx, rx) = mpsc::channel(64);
    let ingest = IngestCoordinator::new(registry.clone(), queue.clone(), tx, 500, 300_000);

    let worker = PipelineWorker::new(
        ScoringEngine::new(default_scorers()),
        alerts.clone(),
        topology.clone(),
        ResponsePolicy::new(ResponseConfig::default()),
        Arc::new(queue.clone()),
    );

    Harness {
        state: AppState {
            registry,
            queue,
            ingest,
            topology,
            alerts,
        },
        rx,
        worker,
    }
}

impl Harness {
    fn app(&self) -> axum::Router {
        router(self.state.clone())
    }

    /// Processes every record currently sitting in the pipeline
    /// channel, synchronously, the way the spawned worker would.
    fn drain_pipeline(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(record) = self.rx.try_recv() {
            self.worker.handle(&record);
            processed += 1;
        }
        processed
    }
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn post(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn now_ms() -> i64 {
    fleetwatch_common::time::now_ms()
}

#[tokio::test]
async fn healthz_reports_fleet_counts() {
    let h = harness();
    let (status, body) = get(h.app(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["agents"].as_object().unwrap().is_empty());

    post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({"agent_id": "agent-1", "platform": "linux"}),
    )
    .await;
    let (_, body) = get(h.app(), "/healthz").await;
    assert_eq!(body["agents"]["online"], 1);
}

#[tokio::test]
async fn heartbeat_mints_auto_id() {
    let h = harness();
    let (status, body) = post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({
            "agent_id": "auto",
            "platform": "linux",
            "capabilities": ["exec", "collect"],
            "fingerprint": "hw-abc",
            "facts": {"kernel": "6.8"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let agent_id = body["agent_id"].as_str().unwrap().to_string();
    assert!(agent_id.starts_with("agent-"));
    assert_eq!(body["liveness"], "online");
    assert_eq!(body["pending_commands"], 0);

    let (status, agent) = get(h.app(), &format!("/v1/agents/{agent_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(agent["facts"]["kernel"], "6.8");
    assert_eq!(agent["liveness"], "online");
}

#[tokio::test]
async fn list_agents_filters_by_platform() {
    let h = harness();
    post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({"agent_id": "agent-lin", "platform": "linux"}),
    )
    .await;
    post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({"agent_id": "agent-win", "platform": "windows"}),
    )
    .await;

    let (status, body) = get(h.app(), "/v1/agents?platform=windows").await;
    assert_eq!(status, StatusCode::OK);
    let agents = body.as_array().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["agent_id"], "agent-win");

    let (status, _) = get(h.app(), "/v1/agents?liveness=sleeping").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remove_agent_then_404() {
    let h = harness();
    post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({"agent_id": "agent-1", "platform": "linux"}),
    )
    .await;

    let resp = h
        .app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v1/agents/agent-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, body) = get(h.app(), "/v1/agents/agent-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_agent");
}

#[tokio::test]
async fn logs_to_unknown_agent_404() {
    let h = harness();
    let (status, body) = post(
        h.app(),
        "/v1/agents/ghost/logs",
        serde_json::json!({"entries": [{"message": "hi", "timestamp_ms": now_ms()}]}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_agent");
}

#[tokio::test]
async fn oversized_batch_rejected_whole() {
    let h = harness();
    post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({"agent_id": "agent-1", "platform": "linux"}),
    )
    .await;

    let ts = now_ms();
    let entries: Vec<serde_json::Value> = (0..501)
        .map(|i| serde_json::json!({"message": format!("m{i}"), "timestamp_ms": ts}))
        .collect();
    let (status, body) = post(
        h.app(),
        "/v1/agents/agent-1/logs",
        serde_json::json!({"entries": entries}),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "batch_too_large");
}

#[tokio::test]
async fn partial_batch_reaches_pipeline() {
    let mut h = harness();
    post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({"agent_id": "agent-1", "platform": "linux"}),
    )
    .await;

    let ts = now_ms();
    let mut entries: Vec<serde_json::Value> = (0..7)
        .map(|i| serde_json::json!({"message": format!("ok-{i}"), "timestamp_ms": ts}))
        .collect();
    entries.push(serde_json::json!({"message": "", "timestamp_ms": ts}));
    entries.push(serde_json::json!({"message": "no timestamp"}));
    entries.push(serde_json::json!({"message": "future", "timestamp_ms": ts + 3_600_000}));

    let (status, receipt) = post(
        h.app(),
        "/v1/agents/agent-1/logs",
        serde_json::json!({"entries": entries}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(receipt["accepted"], 7);
    assert_eq!(receipt["rejected"], 3);
    assert_eq!(receipt["rejections"][0]["index"], 7);
    assert_eq!(receipt["rejections"][0]["reason"], "empty_message");
    assert_eq!(receipt["rejections"][1]["reason"], "missing_timestamp");
    assert_eq!(receipt["rejections"][2]["reason"], "timestamp_in_future");

    // Only the accepted records made it onto the channel.
    assert_eq!(h.drain_pipeline(), 7);
}

#[tokio::test]
async fn command_lifecycle_over_rest() {
    let h = harness();
    post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({"agent_id": "agent-1", "platform": "linux"}),
    )
    .await;

    let (status, command) = post(
        h.app(),
        "/v1/commands",
        serde_json::json!({
            "agent_id": "agent-1",
            "technique": "collect_processes",
            "priority": "high",
            "payload": {"depth": 2}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let command_id = command["id"].as_str().unwrap().to_string();
    assert!(command_id.starts_with("cmd_"));
    assert_eq!(command["state"], "queued");
    assert_eq!(command["origin"], serde_json::json!({"kind": "operator"}));

    // Poll delivers exactly once.
    let (status, delivered) = get(h.app(), "/v1/agents/agent-1/commands").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivered.as_array().unwrap().len(), 1);
    assert_eq!(delivered[0]["state"], "delivered");
    let (_, again) = get(h.app(), "/v1/agents/agent-1/commands").await;
    assert!(again.as_array().unwrap().is_empty());

    let (status, updated) = post(
        h.app(),
        &format!("/v1/commands/{command_id}/result"),
        serde_json::json!({"status": "completed", "result": {"processes": 42}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["state"], "completed");

    let (_, fetched) = get(h.app(), &format!("/v1/commands/{command_id}")).await;
    assert_eq!(fetched["result"]["processes"], 42);

    let (_, stats) = get(h.app(), "/v1/commands/stats").await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["by_state"]["completed"], 1);
}

#[tokio::test]
async fn result_for_queued_command_conflicts() {
    let h = harness();
    post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({"agent_id": "agent-1", "platform": "linux"}),
    )
    .await;
    let (_, command) = post(
        h.app(),
        "/v1/commands",
        serde_json::json!({"agent_id": "agent-1", "technique": "isolate"}),
    )
    .await;
    let command_id = command["id"].as_str().unwrap();

    let (status, body) = post(
        h.app(),
        &format!("/v1/commands/{command_id}/result"),
        serde_json::json!({"status": "completed"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn cancel_queued_command_skips_delivery() {
    let h = harness();
    post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({"agent_id": "agent-1", "platform": "linux"}),
    )
    .await;
    let (_, command) = post(
        h.app(),
        "/v1/commands",
        serde_json::json!({"agent_id": "agent-1", "technique": "isolate"}),
    )
    .await;
    let command_id = command["id"].as_str().unwrap();

    let (status, cancelled) = post(
        h.app(),
        &format!("/v1/commands/{command_id}/cancel"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["state"], "cancelled");

    let (_, delivered) = get(h.app(), "/v1/agents/agent-1/commands").await;
    assert!(delivered.as_array().unwrap().is_empty());
}

/// End-to-end: heartbeat, malicious log batch, pipeline pass, then the
/// alert, topology node, and auto-response command are all observable
/// through the API, and the agent completes the response command.
#[tokio::test]
async fn detection_to_response_end_to_end() {
    let mut h = harness();

    let (_, ack) = post(
        h.app(),
        "/v1/agents/heartbeat",
        serde_json::json!({
            "agent_id": "auto",
            "platform": "linux",
            "fingerprint": "hw-e2e"
        }),
    )
    .await;
    let agent_id = ack["agent_id"].as_str().unwrap().to_string();

    // Three sustained compromise hits trip the response policy.
    let ts = now_ms();
    let entries: Vec<serde_json::Value> = (0..3)
        .map(|i| {
            serde_json::json!({
                "message": format!("ransomware beacon to c2 server, attempt {i}"),
                "timestamp_ms": ts + i,
                "source": "process",
                "severity": "error",
                "attributes": {"host": "10.0.0.5", "source_ip": "10.0.0.5", "destination_ip": "10.0.0.9"}
            })
        })
        .collect();
    let (status, receipt) = post(
        h.app(),
        &format!("/v1/agents/{agent_id}/logs"),
        serde_json::json!({"entries": entries}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(receipt["accepted"], 3);
    assert_eq!(h.drain_pipeline(), 3);

    // One deduplicated alert with three pieces of evidence.
    let (status, alerts) = get(h.app(), &format!("/v1/alerts?agent_id={agent_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["label"], "system_compromise");
    assert_eq!(alerts[0]["evidence_count"], 3);
    assert_eq!(alerts[0]["severity"], "critical");

    // The observed hosts appear in the topology snapshot.
    let (_, topo) = get(h.app(), "/v1/topology").await;
    assert!(topo["version"].as_u64().unwrap() >= 1);
    let nodes = topo["nodes"].as_array().unwrap();
    let keys: Vec<&str> = nodes.iter().map(|n| n["key"].as_str().unwrap()).collect();
    assert!(keys.contains(&"10.0.0.5"));
    assert!(keys.contains(&"10.0.0.9"));
    let edges = topo["edges"].as_array().unwrap();
    assert!(edges
        .iter()
        .any(|e| e["src"] == "10.0.0.5" && e["dst"] == "10.0.0.9"));

    // The response policy queued an isolation command for the agent.
    let (_, delivered) = get(h.app(), &format!("/v1/agents/{agent_id}/commands")).await;
    let delivered = delivered.as_array().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0]["technique"], "isolate");
    assert_eq!(delivered[0]["priority"], "critical");
    assert_eq!(delivered[0]["origin"]["kind"], "finding");

    // The agent executes and reports back.
    let command_id = delivered[0]["id"].as_str().unwrap();
    post(
        h.app(),
        &format!("/v1/commands/{command_id}/result"),
        serde_json::json!({"status": "executing"}),
    )
    .await;
    let (_, done) = post(
        h.app(),
        &format!("/v1/commands/{command_id}/result"),
        serde_json::json!({"status": "completed", "result": {"isolated": true}}),
    )
    .await;
    assert_eq!(done["state"], "completed");

    // Raw findings remain auditable after promotion.
    let (_, findings) = get(h.app(), "/v1/findings").await;
    assert_eq!(findings.as_array().unwrap().len(), 3);
}
