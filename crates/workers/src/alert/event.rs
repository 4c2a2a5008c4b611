use serde::{Deserialize, Serialize};

use crate::scoring::AlertSeverity;

/// A deduplicated, thresholded finding promoted for operator and
/// automation visibility. Severity always reflects the maximum score
/// among contributing findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub fingerprint: String,
    pub agent_id: String,
    pub label: String,
    pub score: f64,
    pub severity: AlertSeverity,
    pub indicators: Vec<String>,
    /// Record that most recently contributed evidence.
    pub record_id: String,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
    pub evidence_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    pub agent_id: Option<String>,
    pub since_ms: Option<i64>,
    pub min_severity: Option<AlertSeverity>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        if let Some(agent_id) = &self.agent_id {
            if &alert.agent_id != agent_id {
                return false;
            }
        }
        if let Some(since_ms) = self.since_ms {
            if alert.last_seen_ms < since_ms {
                return false;
            }
        }
        if let Some(min) = self.min_severity {
            if alert.severity < min {
                return false;
            }
        }
        true
    }
}
