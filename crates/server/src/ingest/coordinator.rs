use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tokio::sync::mpsc;

use fleetwatch_common::record::{LogRecord, RawLogEntry};
use fleetwatch_common::time::now_ms;

use crate::commands::CommandQueue;
use crate::error::ApiError;
use crate::registry::{AgentRegistry, Liveness};

use super::validate::{normalize, Rejection};

#[derive(Debug, Serialize)]
pub struct HeartbeatAck {
    pub agent_id: String,
    pub liveness: Liveness,
    pub pending_commands: usize,
}

#[derive(Debug, Serialize)]
pub struct IngestReceipt {
    pub accepted: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
}

/// Agent-facing intake. Heartbeats and log batches come through here;
/// accepted records go out over the bounded pipeline channel and the
/// HTTP response never waits on downstream processing.
#[derive(Clone)]
pub struct IngestCoordinator {
    registry: AgentRegistry,
    queue: CommandQueue,
    tx: mpsc::Sender<LogRecord>,
    max_batch_size: usize,
    max_future_skew_ms: i64,
}

impl IngestCoordinator {
    pub fn new(
        registry: AgentRegistry,
        queue: CommandQueue,
        tx: mpsc::Sender<LogRecord>,
        max_batch_size: usize,
        max_future_skew_ms: i64,
    ) -> Self {
        Self {
            registry,
            queue,
            tx,
            max_batch_size,
            max_future_skew_ms,
        }
    }

    pub fn submit_heartbeat(
        &self,
        agent_id: &str,
        platform: &str,
        capabilities: BTreeSet<String>,
        fingerprint: &str,
        facts: HashMap<String, String>,
    ) -> HeartbeatAck {
        let now = now_ms();
        let record = self
            .registry
            .register_or_update(agent_id, platform, capabilities, fingerprint, now);
        self.registry.heartbeat(&record.agent_id, facts, now);

        HeartbeatAck {
            pending_commands: self.queue.pending_count(&record.agent_id),
            liveness: Liveness::Online,
            agent_id: record.agent_id,
        }
    }

    /// Validates a batch entry by entry. Malformed entries are rejected
    /// individually and reported by index; only an oversized batch or
    /// an unknown agent fails the whole request.
    pub fn submit_logs(
        &self,
        agent_id: &str,
        entries: Vec<RawLogEntry>,
    ) -> Result<IngestReceipt, ApiError> {
        if !self.registry.contains(agent_id) {
            return Err(ApiError::UnknownAgent(agent_id.to_string()));
        }
        if entries.len() > self.max_batch_size {
            return Err(ApiError::BatchTooLarge {
                size: entries.len(),
                max: self.max_batch_size,
            });
        }

        let now = now_ms();
        let mut receipt = IngestReceipt {
            accepted: 0,
            rejected: 0,
            rejections: Vec::new(),
        };

        for (index, entry) in entries.into_iter().enumerate() {
            match normalize(agent_id, entry, now, self.max_future_skew_ms) {
                Ok(record) => {
                    receipt.accepted += 1;
                    // Fire and forget. A saturated pipeline sheds the
                    // record rather than stalling the agent.
                    if let Err(e) = self.tx.try_send(record) {
                        tracing::warn!(agent_id = %agent_id, error = %e, "pipeline full, record dropped");
                    }
                }
                Err(reason) => {
                    receipt.rejected += 1;
                    receipt.rejections.push(Rejection { index, reason });
                }
            }
        }

        tracing::debug!(
            agent_id = %agent_id,
            accepted = receipt.accepted,
            rejected = receipt.rejected,
            "log batch processed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::validate::RejectReason;
    use fleetwatch_common::record::Severity;

    fn setup(pipeline_depth: usize) -> (IngestCoordinator, mpsc::Receiver<LogRecord>) {
        let registry = AgentRegistry::new(90_000, 300_000);
        let queue = CommandQueue::new(registry.clone(), 300_000);
        let (tx, rx) = mpsc::channel(pipeline_depth);
        let coordinator = IngestCoordinator::new(registry, queue, tx, 500, 300_000);
        (coordinator, rx)
    }

    fn entry(message: &str, timestamp_ms: Option<i64>) -> RawLogEntry {
        RawLogEntry {
            timestamp_ms,
            source: "process".into(),
            severity: Severity::Info,
            message: message.into(),
            attributes: Default::default(),
        }
    }

    #[test]
    fn heartbeat_mints_id_and_reports_pending() {
        let (coordinator, _rx) = setup(16);
        let ack = coordinator.submit_heartbeat(
            "auto",
            "linux",
            BTreeSet::new(),
            "hw-fingerprint",
            HashMap::new(),
        );
        assert!(ack.agent_id.starts_with("agent-"));
        assert_eq!(ack.liveness, Liveness::Online);
        assert_eq!(ack.pending_commands, 0);

        // Same fingerprint converges on the same id.
        let again = coordinator.submit_heartbeat(
            "auto",
            "linux",
            BTreeSet::new(),
            "hw-fingerprint",
            HashMap::new(),
        );
        assert_eq!(again.agent_id, ack.agent_id);
    }

    #[test]
    fn unknown_agent_batch_rejected() {
        let (coordinator, _rx) = setup(16);
        let err = coordinator
            .submit_logs("ghost", vec![entry("hello", Some(1000))])
            .unwrap_err();
        assert_eq!(err, ApiError::UnknownAgent("ghost".into()));
    }

    #[test]
    fn oversized_batch_rejected_whole() {
        let (coordinator, mut rx) = setup(1024);
        coordinator.submit_heartbeat("agent-1", "linux", BTreeSet::new(), "hw", HashMap::new());

        let batch: Vec<RawLogEntry> = (0..501).map(|i| entry(&format!("m{i}"), Some(1000))).collect();
        let err = coordinator.submit_logs("agent-1", batch).unwrap_err();
        assert_eq!(err, ApiError::BatchTooLarge { size: 501, max: 500 });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn partial_batch_accepts_valid_entries() {
        let (coordinator, mut rx) = setup(16);
        coordinator.submit_heartbeat("agent-1", "linux", BTreeSet::new(), "hw", HashMap::new());

        let now = now_ms();
        let batch = vec![
            entry("one", Some(now)),
            entry("", Some(now)),
            entry("two", Some(now)),
            entry("three", None),
            entry("four", Some(now)),
        ];
        let receipt = coordinator.submit_logs("agent-1", batch).unwrap();
        assert_eq!(receipt.accepted, 3);
        assert_eq!(receipt.rejected, 2);
        assert_eq!(receipt.rejections[0].index, 1);
        assert_eq!(receipt.rejections[0].reason, RejectReason::EmptyMessage);
        assert_eq!(receipt.rejections[1].index, 3);
        assert_eq!(receipt.rejections[1].reason, RejectReason::MissingTimestamp);

        let mut seen = Vec::new();
        while let Ok(record) = rx.try_recv() {
            seen.push(record.message);
        }
        assert_eq!(seen, vec!["one", "two", "four"]);
    }

    #[test]
    fn full_pipeline_drops_without_failing_the_batch() {
        let (coordinator, mut rx) = setup(1);
        coordinator.submit_heartbeat("agent-1", "linux", BTreeSet::new(), "hw", HashMap::new());

        let now = now_ms();
        let receipt = coordinator
            .submit_logs("agent-1", vec![entry("one", Some(now)), entry("two", Some(now))])
            .unwrap();
        // Both validated fine; the second was shed by the full channel.
        assert_eq!(receipt.accepted, 2);
        assert_eq!(rx.try_recv().unwrap().message, "one");
        assert!(rx.try_recv().is_err());
    }
}
