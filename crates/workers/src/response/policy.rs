use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;

use fleetwatch_common::command::{CommandOrigin, Priority};

use super::sink::CommandSink;
use crate::alert::{fingerprint_string, Alert};

#[derive(Debug, Clone)]
pub struct ResponseAction {
    pub technique: String,
    pub priority: Priority,
    pub timeout_ms: i64,
}

/// External configuration for the response hook. The label-to-action
/// mapping is data, not engine logic; an empty map (or a zero command
/// budget) turns auto-response off entirely.
#[derive(Debug, Clone)]
pub struct ResponseConfig {
    pub actions: HashMap<String, ResponseAction>,
    /// Promoted alerts for the same (agent, label) needed inside the
    /// window before an action is requested.
    pub sustained_threshold: u32,
    pub window_ms: i64,
    /// Auto-enqueue budget per agent per window. Zero disables.
    pub max_auto_commands: u32,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        let mut actions = HashMap::new();
        for label in ["active_attack", "system_compromise", "attack_simulation"] {
            actions.insert(
                label.to_string(),
                ResponseAction {
                    technique: "isolate".into(),
                    priority: Priority::Critical,
                    timeout_ms: 300_000,
                },
            );
        }
        Self {
            actions,
            sustained_threshold: 3,
            window_ms: 300_000,
            max_auto_commands: 3,
        }
    }
}

/// Requests pre-registered response actions on sustained high-severity
/// activity. Retry of a timed-out command is this policy's job, by
/// enqueueing a fresh command on the next sustained trigger; it never
/// resurrects an old one.
#[derive(Clone)]
pub struct ResponsePolicy {
    config: ResponseConfig,
    promotions: Arc<DashMap<String, VecDeque<i64>>>,
    issued: Arc<DashMap<String, VecDeque<i64>>>,
}

impl ResponsePolicy {
    pub fn new(config: ResponseConfig) -> Self {
        Self {
            config,
            promotions: Arc::new(DashMap::new()),
            issued: Arc::new(DashMap::new()),
        }
    }

    /// Feeds one promoted alert through the policy. Returns the id of
    /// the enqueued response command, if the sustained threshold and
    /// the per-agent budget both allow one.
    pub fn observe(&self, alert: &Alert, now_ms: i64, sink: &dyn CommandSink) -> Option<String> {
        let action = self.config.actions.get(&alert.label)?;
        if self.config.max_auto_commands == 0 {
            return None;
        }

        let cutoff = now_ms - self.config.window_ms;
        let fp = fingerprint_string(&alert.agent_id, &alert.label);

        let sustained = {
            let mut seen = self.promotions.entry(fp.clone()).or_default();
            seen.push_back(now_ms);
            while seen.front().is_some_and(|&ts| ts < cutoff) {
                seen.pop_front();
            }
            seen.len() as u32 >= self.config.sustained_threshold
        };
        if !sustained {
            return None;
        }

        {
            let mut issued = self.issued.entry(alert.agent_id.clone()).or_default();
            while issued.front().is_some_and(|&ts| ts < cutoff) {
                issued.pop_front();
            }
            if issued.len() as u32 >= self.config.max_auto_commands {
                tracing::debug!(
                    agent_id = %alert.agent_id,
                    label = %alert.label,
                    "auto-response budget exhausted, skipping"
                );
                return None;
            }
        }

        let payload = serde_json::json!({
            "label": alert.label,
            "alert_id": alert.id,
            "score": alert.score,
        });

        match sink.enqueue(
            &alert.agent_id,
            &action.technique,
            payload,
            action.priority,
            action.timeout_ms,
            CommandOrigin::Finding(alert.id.clone()),
        ) {
            Ok(command_id) => {
                // Budget is only charged for commands that made it in.
                self.issued
                    .entry(alert.agent_id.clone())
                    .or_default()
                    .push_back(now_ms);
                // Start a fresh sustained window for this fingerprint.
                self.promotions.remove(&fp);
                tracing::info!(
                    agent_id = %alert.agent_id,
                    label = %alert.label,
                    command_id = %command_id,
                    technique = %action.technique,
                    "response command enqueued"
                );
                Some(command_id)
            }
            Err(e) => {
                tracing::error!(agent_id = %alert.agent_id, error = %e, "response enqueue failed");
                None
            }
        }
    }
}
