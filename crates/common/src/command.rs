use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    Queued,
    Delivered,
    Executing,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl CommandState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    /// The command lifecycle:
    /// queued -> delivered -> executing -> {completed | failed | timed_out | cancelled}.
    /// Cancellation is allowed up to and including executing; a timeout
    /// can only hit a command that has left the queue.
    pub fn can_transition(self, next: CommandState) -> bool {
        use CommandState::*;
        matches!(
            (self, next),
            (Queued, Delivered)
                | (Queued, Cancelled)
                | (Delivered, Executing)
                | (Delivered, Completed)
                | (Delivered, Failed)
                | (Delivered, TimedOut)
                | (Delivered, Cancelled)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Executing, TimedOut)
                | (Executing, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Delivered => "delivered",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Where a command came from: an operator request or an automated
/// response to a finding. Back-reference by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum CommandOrigin {
    Operator,
    Finding(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    pub agent_id: String,
    pub technique: String,
    pub payload: serde_json::Value,
    pub priority: Priority,
    pub state: CommandState,
    pub origin: CommandOrigin,
    pub created_at_ms: i64,
    pub timeout_at_ms: i64,
    pub delivered_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
    pub result: Option<serde_json::Value>,
}

impl Command {
    /// Applies a lifecycle transition, stamping the matching timestamp.
    /// Returns the rejected target state if the move is invalid.
    pub fn advance(&mut self, next: CommandState, now_ms: i64) -> Result<(), CommandState> {
        if !self.state.can_transition(next) {
            return Err(next);
        }
        match next {
            CommandState::Delivered => self.delivered_at_ms = Some(now_ms),
            CommandState::Completed
            | CommandState::Failed
            | CommandState::TimedOut
            | CommandState::Cancelled => self.completed_at_ms = Some(now_ms),
            _ => {}
        }
        self.state = next;
        Ok(())
    }
}
