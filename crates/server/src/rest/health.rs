use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use fleetwatch_common::time::now_ms;

use crate::rest::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Fleet counts per liveness bucket.
    pub agents: HashMap<String, usize>,
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let agents = state
        .registry
        .counts_by_liveness(now_ms())
        .into_iter()
        .map(|(liveness, count)| (liveness.as_str().to_string(), count))
        .collect();
    Json(HealthResponse {
        status: "ok".into(),
        agents,
    })
}

pub async fn ready() -> StatusCode {
    StatusCode::OK
}
