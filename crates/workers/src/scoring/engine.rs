use fleetwatch_common::record::LogRecord;
use fleetwatch_common::time::now_ms;

use super::finding::Finding;

#[derive(Debug)]
pub struct ScorerError(pub String);

impl std::fmt::Display for ScorerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scorer: {}", self.0)
    }
}

impl std::error::Error for ScorerError {}

/// A pluggable scorer. Implementations must be pure: no shared mutable
/// state, the same record always yields the same judgment. The engine
/// never serializes calls across scorers.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `None` when the record looks benign to this scorer.
    fn score(&self, record: &LogRecord) -> Result<Option<Finding>, ScorerError>;
}

pub struct ScoringEngine {
    scorers: Vec<Box<dyn Scorer>>,
}

impl ScoringEngine {
    pub fn new(scorers: Vec<Box<dyn Scorer>>) -> Self {
        Self { scorers }
    }

    /// Runs every registered scorer against the record. A failing
    /// scorer is isolated: the record is still scored by the rest, and
    /// the failure surfaces as a diagnostic finding with score 0.
    pub fn score(&self, record: &LogRecord) -> Vec<Finding> {
        let mut findings = Vec::new();

        for scorer in &self.scorers {
            match scorer.score(record) {
                Ok(Some(finding)) => findings.push(finding),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        scorer = scorer.name(),
                        record_id = %record.id,
                        error = %e,
                        "scorer failed, recording diagnostic finding"
                    );
                    findings.push(Finding {
                        id: fleetwatch_common::ids::record_id(),
                        record_id: record.id.clone(),
                        agent_id: record.agent_id.clone(),
                        scorer: scorer.name().to_string(),
                        score: 0.0,
                        label: "scorer_failure".into(),
                        indicators: vec![e.to_string()],
                        scored_at_ms: now_ms(),
                    });
                }
            }
        }

        findings
    }
}
