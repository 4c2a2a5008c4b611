use std::collections::{BTreeSet, HashMap};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use fleetwatch_common::time::now_ms;

use crate::error::ApiError;
use crate::registry::{AgentFilter, AgentRecord, Liveness};
use crate::rest::AppState;

#[derive(Serialize)]
pub struct AgentView {
    pub agent_id: String,
    pub platform: String,
    pub capabilities: BTreeSet<String>,
    pub facts: HashMap<String, String>,
    pub liveness: Liveness,
    pub registered_at_ms: i64,
    pub last_heartbeat_ms: i64,
}

impl AgentView {
    fn from_record(record: AgentRecord, liveness: Liveness) -> Self {
        Self {
            agent_id: record.agent_id,
            platform: record.platform,
            capabilities: record.capabilities,
            facts: record.facts,
            liveness,
            registered_at_ms: record.registered_at_ms,
            last_heartbeat_ms: record.last_heartbeat_ms,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub liveness: Option<String>,
    pub platform: Option<String>,
}

pub async fn list_agents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AgentView>>, StatusCode> {
    let liveness = match params.liveness.as_deref() {
        Some(raw) => Some(Liveness::parse(raw).ok_or(StatusCode::BAD_REQUEST)?),
        None => None,
    };
    let filter = AgentFilter {
        liveness,
        platform: params.platform,
    };

    let now = now_ms();
    let agents = state
        .registry
        .list(&filter, now)
        .into_iter()
        .map(|record| {
            let liveness = state.registry.liveness(&record, now);
            AgentView::from_record(record, liveness)
        })
        .collect();
    Ok(Json(agents))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<AgentView>, ApiError> {
    let record = state
        .registry
        .get(&agent_id)
        .ok_or(ApiError::UnknownAgent(agent_id))?;
    let liveness = state.registry.liveness(&record, now_ms());
    Ok(Json(AgentView::from_record(record, liveness)))
}

pub async fn remove_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .registry
        .remove(&agent_id)
        .ok_or(ApiError::UnknownAgent(agent_id))?;
    Ok(StatusCode::NO_CONTENT)
}
