use axum::extract::{Query, State};
use axum::Json;

use fleetwatch_workers::alert::{Alert, AlertFilter};
use fleetwatch_workers::scoring::Finding;

use crate::rest::AppState;

pub async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> Json<Vec<Alert>> {
    Json(state.alerts.list(&filter))
}

/// Raw scored findings, pre-dedup. Kept for audit and tuning.
pub async fn list_findings(State(state): State<AppState>) -> Json<Vec<Finding>> {
    Json(state.alerts.findings())
}
