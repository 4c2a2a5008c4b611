use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

pub fn severity_for_score(score: f64) -> AlertSeverity {
    if score >= 0.8 {
        AlertSeverity::Critical
    } else if score >= 0.5 {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    }
}

/// A single scorer's raw judgment on one log record. Findings reference
/// their source record by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub record_id: String,
    pub agent_id: String,
    pub scorer: String,
    pub score: f64,
    pub label: String,
    pub indicators: Vec<String>,
    pub scored_at_ms: i64,
}
