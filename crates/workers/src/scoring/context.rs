use fleetwatch_common::ids::record_id;
use fleetwatch_common::record::LogRecord;
use fleetwatch_common::time::now_ms;

use super::engine::{Scorer, ScorerError};
use super::finding::Finding;

/// Scores attack-simulation context carried in record attributes.
/// Records emitted by a sandboxed attack execution tag themselves with
/// `attack_technique`; container-originated activity tags
/// `container_context`.
pub struct ContextScorer;

impl Scorer for ContextScorer {
    fn name(&self) -> &str {
        "context"
    }

    fn score(&self, record: &LogRecord) -> Result<Option<Finding>, ScorerError> {
        if let Some(technique) = record.attr("attack_technique") {
            return Ok(Some(Finding {
                id: record_id(),
                record_id: record.id.clone(),
                agent_id: record.agent_id.clone(),
                scorer: self.name().to_string(),
                score: 0.85,
                label: "attack_simulation".into(),
                indicators: vec![format!("attack_technique: {technique}")],
                scored_at_ms: now_ms(),
            }));
        }

        if record.attr("container_context").is_some() || record.source == "container" {
            return Ok(Some(Finding {
                id: record_id(),
                record_id: record.id.clone(),
                agent_id: record.agent_id.clone(),
                scorer: self.name().to_string(),
                score: 0.5,
                label: "container_activity".into(),
                indicators: vec!["container execution context".into()],
                scored_at_ms: now_ms(),
            }));
        }

        Ok(None)
    }
}
