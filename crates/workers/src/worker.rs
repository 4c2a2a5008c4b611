use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use fleetwatch_common::record::LogRecord;
use fleetwatch_common::time::now_ms;

use crate::alert::{AlertStore, Promotion};
use crate::response::{CommandSink, ResponsePolicy};
use crate::scoring::{Finding, ScoringEngine};
use crate::topology::TopologyBuilder;

/// The detection pipeline: consumes accepted log records from the
/// ingestion channel and fans each through topology, scoring, alert
/// promotion, and the response policy. Downstream failures are logged,
/// never pushed back to the submitting agent.
pub struct PipelineWorker {
    engine: ScoringEngine,
    alerts: AlertStore,
    topology: TopologyBuilder,
    policy: ResponsePolicy,
    sink: Arc<dyn CommandSink>,
}

impl PipelineWorker {
    pub fn new(
        engine: ScoringEngine,
        alerts: AlertStore,
        topology: TopologyBuilder,
        policy: ResponsePolicy,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        Self {
            engine,
            alerts,
            topology,
            policy,
            sink,
        }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<LogRecord>) {
        tracing::info!("pipeline worker started");
        while let Some(record) = rx.recv().await {
            self.handle(&record);
        }
        tracing::info!("ingestion channel closed, pipeline worker stopping");
    }

    /// Processes a single record end to end.
    pub fn handle(&self, record: &LogRecord) {
        self.topology.ingest(record);

        let findings = self.engine.score(record);
        if findings.is_empty() {
            return;
        }
        self.alerts.audit(&findings);

        let now = now_ms();
        for finding in best_per_label(&findings) {
            match self.alerts.promote(finding, now) {
                Promotion::Raised(alert) | Promotion::Deduplicated(alert) => {
                    self.policy.observe(&alert, now, self.sink.as_ref());
                }
                Promotion::BelowThreshold => {}
            }
        }
    }
}

/// One promotion candidate per label: the highest-scoring finding.
fn best_per_label(findings: &[Finding]) -> Vec<&Finding> {
    let mut best: HashMap<&str, &Finding> = HashMap::new();
    for finding in findings {
        best.entry(finding.label.as_str())
            .and_modify(|current| {
                if finding.score > current.score {
                    *current = finding;
                }
            })
            .or_insert(finding);
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(label: &str, score: f64) -> Finding {
        Finding {
            id: fleetwatch_common::ids::record_id(),
            record_id: "r-1".into(),
            agent_id: "agent-1".into(),
            scorer: "signature".into(),
            score,
            label: label.into(),
            indicators: vec![],
            scored_at_ms: 1000,
        }
    }

    #[test]
    fn best_per_label_keeps_max_score() {
        let findings = vec![
            finding("reconnaissance", 0.4),
            finding("reconnaissance", 0.7),
            finding("active_attack", 0.8),
        ];
        let best = best_per_label(&findings);
        assert_eq!(best.len(), 2);
        let recon = best.iter().find(|f| f.label == "reconnaissance").unwrap();
        assert!((recon.score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn best_per_label_empty() {
        assert!(best_per_label(&[]).is_empty());
    }
}
