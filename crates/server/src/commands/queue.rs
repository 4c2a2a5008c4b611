use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use fleetwatch_common::command::{Command, CommandOrigin, CommandState, Priority};
use fleetwatch_common::ids::command_id;
use fleetwatch_common::time::now_ms;

use fleetwatch_workers::response::{CommandSink, SinkError};

use crate::error::ApiError;
use crate::registry::AgentRegistry;

#[derive(Debug, Default, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub by_state: HashMap<String, usize>,
}

/// Owns every command from creation to terminal state. The per-agent
/// queued list lives in its own dashmap entry, so poll and enqueue for
/// one agent never contend with another agent's traffic, and the
/// command map entry lock serializes racing terminal transitions.
#[derive(Clone)]
pub struct CommandQueue {
    commands: Arc<DashMap<String, Command>>,
    queued: Arc<DashMap<String, Vec<String>>>,
    registry: AgentRegistry,
    default_timeout_ms: i64,
}

impl CommandQueue {
    pub fn new(registry: AgentRegistry, default_timeout_ms: i64) -> Self {
        Self {
            commands: Arc::new(DashMap::new()),
            queued: Arc::new(DashMap::new()),
            registry,
            default_timeout_ms,
        }
    }

    pub fn enqueue(
        &self,
        agent_id: &str,
        technique: &str,
        payload: serde_json::Value,
        priority: Priority,
        timeout_ms: Option<i64>,
        origin: CommandOrigin,
    ) -> Result<Command, ApiError> {
        if !self.registry.contains(agent_id) {
            return Err(ApiError::UnknownAgent(agent_id.to_string()));
        }

        let now = now_ms();
        let timeout_ms = timeout_ms.unwrap_or(self.default_timeout_ms);
        let command = Command {
            id: command_id(),
            agent_id: agent_id.to_string(),
            technique: technique.to_string(),
            payload,
            priority,
            state: CommandState::Queued,
            origin,
            created_at_ms: now,
            timeout_at_ms: now + timeout_ms,
            delivered_at_ms: None,
            completed_at_ms: None,
            result: None,
        };

        self.commands.insert(command.id.clone(), command.clone());
        self.queued
            .entry(agent_id.to_string())
            .or_default()
            .push(command.id.clone());

        tracing::info!(
            command_id = %command.id,
            agent_id = %agent_id,
            technique = %technique,
            priority = ?priority,
            "command queued"
        );
        Ok(command)
    }

    /// Drains the agent's queued commands in priority-then-creation
    /// order and marks them delivered. The drain happens under the
    /// agent's entry lock, so a concurrent poll for the same agent
    /// observes an empty list and no command is ever delivered twice.
    pub fn poll(&self, agent_id: &str) -> Result<Vec<Command>, ApiError> {
        if !self.registry.contains(agent_id) {
            return Err(ApiError::UnknownAgent(agent_id.to_string()));
        }

        let ids = match self.queued.get_mut(agent_id) {
            Some(mut entry) => std::mem::take(entry.value_mut()),
            None => return Ok(Vec::new()),
        };

        let now = now_ms();
        let mut delivered = Vec::new();
        for id in ids {
            let Some(mut command) = self.commands.get_mut(&id) else {
                continue;
            };
            // Cancelled-while-queued commands are skipped, not delivered.
            if command.advance(CommandState::Delivered, now).is_ok() {
                delivered.push(command.clone());
            }
        }

        delivered.sort_by_key(|c| (Reverse(c.priority), c.created_at_ms));
        if !delivered.is_empty() {
            tracing::debug!(agent_id = %agent_id, count = delivered.len(), "commands delivered");
        }
        Ok(delivered)
    }

    /// Applies an agent-reported lifecycle update. Valid only from
    /// delivered/executing; anything else is rejected and logged, never
    /// silently accepted.
    pub fn report_result(
        &self,
        command_id: &str,
        status: CommandState,
        result: Option<serde_json::Value>,
    ) -> Result<Command, ApiError> {
        let mut command = self
            .commands
            .get_mut(command_id)
            .ok_or_else(|| ApiError::UnknownCommand(command_id.to_string()))?;

        let from = command.state;
        if command.advance(status, now_ms()).is_err() {
            let err = ApiError::InvalidTransition {
                command_id: command_id.to_string(),
                from,
                to: status,
            };
            tracing::warn!(command_id = %command_id, error = %err, "result dropped");
            return Err(err);
        }
        if result.is_some() {
            command.result = result;
        }
        tracing::info!(command_id = %command_id, status = status.as_str(), "result recorded");
        Ok(command.clone())
    }

    /// Cancels a command. After delivery this is best-effort: the state
    /// is recorded but remote execution is not assumed to stop.
    pub fn cancel(&self, command_id: &str) -> Result<Command, ApiError> {
        let mut command = self
            .commands
            .get_mut(command_id)
            .ok_or_else(|| ApiError::UnknownCommand(command_id.to_string()))?;

        let from = command.state;
        command
            .advance(CommandState::Cancelled, now_ms())
            .map_err(|to| ApiError::InvalidTransition {
                command_id: command_id.to_string(),
                from,
                to,
            })?;
        tracing::info!(command_id = %command_id, "command cancelled");
        Ok(command.clone())
    }

    pub fn get(&self, command_id: &str) -> Option<Command> {
        self.commands.get(command_id).map(|c| c.clone())
    }

    /// Commands still awaiting delivery. Cancelled ids linger in the
    /// queued list until the next poll drains them, so the count goes
    /// by command state, not list length.
    pub fn pending_count(&self, agent_id: &str) -> usize {
        self.queued
            .get(agent_id)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|id| {
                        self.commands
                            .get(id.as_str())
                            .is_some_and(|c| c.state == CommandState::Queued)
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    /// Moves delivered/executing commands past their deadline to
    /// timed_out. Racing a concurrent `report_result` is safe: the
    /// entry lock serializes both, the loser's transition is rejected.
    /// Timed-out commands are never retried here.
    pub fn sweep(&self, now_ms: i64) -> usize {
        let overdue: Vec<String> = self
            .commands
            .iter()
            .filter(|entry| {
                let c = entry.value();
                matches!(c.state, CommandState::Delivered | CommandState::Executing)
                    && c.timeout_at_ms <= now_ms
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut timed_out = 0;
        for id in overdue {
            let Some(mut command) = self.commands.get_mut(&id) else {
                continue;
            };
            if command.timeout_at_ms <= now_ms
                && command.advance(CommandState::TimedOut, now_ms).is_ok()
            {
                tracing::warn!(command_id = %id, agent_id = %command.agent_id, "command timed out");
                timed_out += 1;
            }
        }
        timed_out
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats::default();
        for entry in self.commands.iter() {
            stats.total += 1;
            *stats
                .by_state
                .entry(entry.value().state.as_str().to_string())
                .or_insert(0) += 1;
        }
        stats
    }
}

impl CommandSink for CommandQueue {
    fn enqueue(
        &self,
        agent_id: &str,
        technique: &str,
        payload: serde_json::Value,
        priority: Priority,
        timeout_ms: i64,
        origin: CommandOrigin,
    ) -> Result<String, SinkError> {
        CommandQueue::enqueue(
            self,
            agent_id,
            technique,
            payload,
            priority,
            Some(timeout_ms),
            origin,
        )
        .map(|command| command.id)
        .map_err(|e| SinkError(e.to_string()))
    }
}
