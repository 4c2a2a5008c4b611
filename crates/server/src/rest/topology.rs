use axum::extract::State;
use axum::Json;

use fleetwatch_workers::topology::TopologySnapshot;

use crate::rest::AppState;

pub async fn get_topology(State(state): State<AppState>) -> Json<TopologySnapshot> {
    Json(state.topology.snapshot())
}
