use std::sync::{Arc, Mutex};

use fleetwatch_common::command::{CommandOrigin, Priority};

#[derive(Debug)]
pub struct SinkError(pub String);

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "command sink: {}", self.0)
    }
}

impl std::error::Error for SinkError {}

/// Where auto-response commands go. The server's command queue
/// implements this; tests use [`InMemorySink`].
pub trait CommandSink: Send + Sync {
    fn enqueue(
        &self,
        agent_id: &str,
        technique: &str,
        payload: serde_json::Value,
        priority: Priority,
        timeout_ms: i64,
        origin: CommandOrigin,
    ) -> Result<String, SinkError>;
}

#[derive(Debug, Clone)]
pub struct IssuedCommand {
    pub agent_id: String,
    pub technique: String,
    pub payload: serde_json::Value,
    pub priority: Priority,
    pub timeout_ms: i64,
    pub origin: CommandOrigin,
}

#[derive(Clone, Default)]
pub struct InMemorySink {
    issued: Arc<Mutex<Vec<IssuedCommand>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> Vec<IssuedCommand> {
        self.issued.lock().expect("sink lock poisoned").clone()
    }
}

impl CommandSink for InMemorySink {
    fn enqueue(
        &self,
        agent_id: &str,
        technique: &str,
        payload: serde_json::Value,
        priority: Priority,
        timeout_ms: i64,
        origin: CommandOrigin,
    ) -> Result<String, SinkError> {
        let mut issued = self.issued.lock().expect("sink lock poisoned");
        issued.push(IssuedCommand {
            agent_id: agent_id.to_string(),
            technique: technique.to_string(),
            payload,
            priority,
            timeout_ms,
            origin,
        });
        Ok(format!("cmd_test{:08}", issued.len()))
    }
}
