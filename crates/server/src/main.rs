use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use fleetwatch_common::time::now_ms;
use fleetwatch_server::commands::{run_timeout_sweep, CommandQueue};
use fleetwatch_server::config::ServerConfig;
use fleetwatch_server::ingest::IngestCoordinator;
use fleetwatch_server::registry::AgentRegistry;
use fleetwatch_server::rest::{self, AppState};
use fleetwatch_workers::alert::AlertStore;
use fleetwatch_workers::response::{ResponseConfig, ResponsePolicy};
use fleetwatch_workers::scoring::{default_scorers, ScoringEngine};
use fleetwatch_workers::topology::TopologyBuilder;
use fleetwatch_workers::worker::PipelineWorker;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();

    let registry = AgentRegistry::new(config.stale_after_ms, config.offline_after_ms);
    let queue = CommandQueue::new(registry.clone(), config.default_command_timeout_ms);
    let topology = TopologyBuilder::new(config.topology_staleness_ms);
    let alerts = AlertStore::new(
        config.dedup_window_ms,
        config.min_alert_score,
        config.max_audit_findings,
    );

    let (tx, rx) = mpsc::channel(config.pipeline_depth);
    let ingest = IngestCoordinator::new(
        registry.clone(),
        queue.clone(),
        tx,
        config.max_batch_size,
        config.max_future_skew_ms,
    );

    let worker = PipelineWorker::new(
        ScoringEngine::new(default_scorers()),
        alerts.clone(),
        topology.clone(),
        ResponsePolicy::new(ResponseConfig::default()),
        Arc::new(queue.clone()),
    );
    tokio::spawn(worker.run(rx));

    tokio::spawn(run_timeout_sweep(queue.clone(), config.sweep_interval_ms));

    let prune_topology = topology.clone();
    let prune_interval_ms = config.prune_interval_ms;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(prune_interval_ms));
        loop {
            ticker.tick().await;
            let pruned = prune_topology.prune(now_ms());
            if pruned > 0 {
                tracing::info!(pruned, "stale topology nodes removed");
            }
        }
    });

    let app_state = AppState {
        registry,
        queue,
        ingest,
        topology,
        alerts,
    };
    let app = rest::router(app_state);
    let rest_addr = config.rest_addr;

    tracing::info!(%rest_addr, "REST server starting");
    let listener = tokio::net::TcpListener::bind(rest_addr)
        .await
        .expect("failed to bind REST address");
    axum::serve(listener, app)
        .await
        .expect("REST server failed");
}
