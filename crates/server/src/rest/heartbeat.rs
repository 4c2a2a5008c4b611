use std::collections::{BTreeSet, HashMap};

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::ingest::HeartbeatAck;
use crate::rest::AppState;

#[derive(Deserialize)]
pub struct HeartbeatRequest {
    /// "auto" (or empty) asks the server to mint a stable id from the
    /// platform fingerprint.
    #[serde(default = "auto_id")]
    pub agent_id: String,
    pub platform: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub facts: HashMap<String, String>,
}

fn auto_id() -> String {
    "auto".to_string()
}

pub async fn heartbeat(
    State(state): State<AppState>,
    Json(req): Json<HeartbeatRequest>,
) -> Json<HeartbeatAck> {
    let ack = state.ingest.submit_heartbeat(
        &req.agent_id,
        &req.platform,
        req.capabilities,
        &req.fingerprint,
        req.facts,
    );
    Json(ack)
}
