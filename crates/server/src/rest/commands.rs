use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use fleetwatch_common::command::{Command, CommandOrigin, CommandState, Priority};

use crate::commands::QueueStats;
use crate::error::ApiError;
use crate::rest::AppState;

#[derive(Deserialize)]
pub struct EnqueueRequest {
    pub agent_id: String,
    pub technique: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub priority: Priority,
    pub timeout_ms: Option<i64>,
}

pub async fn enqueue_command(
    State(state): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<Command>), ApiError> {
    let command = state.queue.enqueue(
        &req.agent_id,
        &req.technique,
        req.payload,
        req.priority,
        req.timeout_ms,
        CommandOrigin::Operator,
    )?;
    Ok((StatusCode::CREATED, Json(command)))
}

pub async fn poll_commands(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Vec<Command>>, ApiError> {
    Ok(Json(state.queue.poll(&agent_id)?))
}

pub async fn get_command(
    State(state): State<AppState>,
    Path(command_id): Path<String>,
) -> Result<Json<Command>, ApiError> {
    state
        .queue
        .get(&command_id)
        .map(Json)
        .ok_or(ApiError::UnknownCommand(command_id))
}

#[derive(Deserialize)]
pub struct ResultRequest {
    pub status: CommandState,
    pub result: Option<serde_json::Value>,
}

pub async fn report_result(
    State(state): State<AppState>,
    Path(command_id): Path<String>,
    Json(req): Json<ResultRequest>,
) -> Result<Json<Command>, ApiError> {
    let command = state
        .queue
        .report_result(&command_id, req.status, req.result)?;
    Ok(Json(command))
}

pub async fn cancel_command(
    State(state): State<AppState>,
    Path(command_id): Path<String>,
) -> Result<Json<Command>, ApiError> {
    Ok(Json(state.queue.cancel(&command_id)?))
}

pub async fn command_stats(State(state): State<AppState>) -> Json<QueueStats> {
    Json(state.queue.stats())
}
