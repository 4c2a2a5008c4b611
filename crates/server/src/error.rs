use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use fleetwatch_common::command::CommandState;

/// Error taxonomy for the coordination surface. Validation errors are
/// returned synchronously; pipeline errors never reach the agent.
#[derive(Debug, PartialEq)]
pub enum ApiError {
    UnknownAgent(String),
    UnknownCommand(String),
    InvalidTransition {
        command_id: String,
        from: CommandState,
        to: CommandState,
    },
    BatchTooLarge {
        size: usize,
        max: usize,
    },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAgent(id) => write!(f, "unknown agent: {id}"),
            Self::UnknownCommand(id) => write!(f, "unknown command: {id}"),
            Self::InvalidTransition {
                command_id,
                from,
                to,
            } => write!(
                f,
                "invalid transition for {command_id}: {} -> {}",
                from.as_str(),
                to.as_str()
            ),
            Self::BatchTooLarge { size, max } => {
                write!(f, "batch of {size} records exceeds limit of {max}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownAgent(_) => "unknown_agent",
            Self::UnknownCommand(_) => "unknown_command",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::BatchTooLarge { .. } => "batch_too_large",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::UnknownAgent(_) | Self::UnknownCommand(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::BatchTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
