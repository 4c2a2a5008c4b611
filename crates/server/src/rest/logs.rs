use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use fleetwatch_common::record::RawLogEntry;

use crate::error::ApiError;
use crate::ingest::IngestReceipt;
use crate::rest::AppState;

#[derive(Deserialize)]
pub struct LogBatch {
    pub entries: Vec<RawLogEntry>,
}

pub async fn submit_logs(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(batch): Json<LogBatch>,
) -> Result<(StatusCode, Json<IngestReceipt>), ApiError> {
    let receipt = state.ingest.submit_logs(&agent_id, batch.entries)?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}
