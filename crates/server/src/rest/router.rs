use axum::routing::{get, post};
use axum::Router;

use fleetwatch_workers::alert::AlertStore;
use fleetwatch_workers::topology::TopologyBuilder;

use crate::commands::CommandQueue;
use crate::ingest::IngestCoordinator;
use crate::registry::AgentRegistry;

use super::{agents, alerts, commands, health, heartbeat, logs, topology};

#[derive(Clone)]
pub struct AppState {
    pub registry: AgentRegistry,
    pub queue: CommandQueue,
    pub ingest: IngestCoordinator,
    pub topology: TopologyBuilder,
    pub alerts: AlertStore,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/ready", get(health::ready))
        .route("/v1/agents/heartbeat", post(heartbeat::heartbeat))
        .route("/v1/agents", get(agents::list_agents))
        .route(
            "/v1/agents/{agent_id}",
            get(agents::get_agent).delete(agents::remove_agent),
        )
        .route("/v1/agents/{agent_id}/logs", post(logs::submit_logs))
        .route("/v1/agents/{agent_id}/commands", get(commands::poll_commands))
        .route("/v1/commands", post(commands::enqueue_command))
        .route("/v1/commands/stats", get(commands::command_stats))
        .route("/v1/commands/{command_id}", get(commands::get_command))
        .route(
            "/v1/commands/{command_id}/result",
            post(commands::report_result),
        )
        .route(
            "/v1/commands/{command_id}/cancel",
            post(commands::cancel_command),
        )
        .route("/v1/topology", get(topology::get_topology))
        .route("/v1/alerts", get(alerts::list_alerts))
        .route("/v1/findings", get(alerts::list_findings))
        .with_state(state)
}
