use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use fleetwatch_common::ids::alert_id;

use super::event::{Alert, AlertFilter};
use super::fingerprint::fingerprint_string;
use crate::scoring::{severity_for_score, Finding};

#[derive(Debug, Clone, PartialEq)]
pub enum Promotion {
    /// A new alert left the dedup window and was raised.
    Raised(Alert),
    /// An existing alert inside the window absorbed the finding.
    Deduplicated(Alert),
    /// Below the alerting threshold; retained for audit only.
    BelowThreshold,
}

/// In-memory alert arena plus a capped audit log of raw findings.
/// Promotion enforces the (agent, label) dedup invariant: inside the
/// dedup window a fingerprint updates its live alert in place, with
/// severity tracking the maximum contributing score.
#[derive(Clone)]
pub struct AlertStore {
    alerts: Arc<DashMap<String, Alert>>,
    by_fingerprint: Arc<DashMap<String, String>>,
    findings: Arc<Mutex<VecDeque<Finding>>>,
    dedup_window_ms: i64,
    min_alert_score: f64,
    max_findings: usize,
}

impl AlertStore {
    pub fn new(dedup_window_ms: i64, min_alert_score: f64, max_findings: usize) -> Self {
        Self {
            alerts: Arc::new(DashMap::new()),
            by_fingerprint: Arc::new(DashMap::new()),
            findings: Arc::new(Mutex::new(VecDeque::new())),
            dedup_window_ms,
            min_alert_score,
            max_findings,
        }
    }

    /// Appends findings to the audit log, evicting the oldest past the
    /// cap. Retention beyond this buffer belongs to the external store.
    pub fn audit(&self, findings: &[Finding]) {
        let mut log = self.findings.lock().expect("findings log poisoned");
        for finding in findings {
            if log.len() == self.max_findings {
                log.pop_front();
            }
            log.push_back(finding.clone());
        }
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.findings
            .lock()
            .expect("findings log poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn promote(&self, finding: &Finding, now_ms: i64) -> Promotion {
        if finding.score < self.min_alert_score {
            return Promotion::BelowThreshold;
        }

        let fp = fingerprint_string(&finding.agent_id, &finding.label);

        if let Some(alert_ref) = self.by_fingerprint.get(&fp) {
            let existing_id = alert_ref.value().clone();
            drop(alert_ref);
            if let Some(mut alert) = self.alerts.get_mut(&existing_id) {
                if now_ms - alert.last_seen_ms <= self.dedup_window_ms {
                    alert.last_seen_ms = now_ms;
                    alert.evidence_count += 1;
                    alert.record_id = finding.record_id.clone();
                    if finding.score > alert.score {
                        alert.score = finding.score;
                        alert.severity = severity_for_score(finding.score);
                    }
                    for indicator in &finding.indicators {
                        if !alert.indicators.contains(indicator) {
                            alert.indicators.push(indicator.clone());
                        }
                    }
                    return Promotion::Deduplicated(alert.clone());
                }
            }
        }

        let alert = Alert {
            id: alert_id(),
            fingerprint: fp.clone(),
            agent_id: finding.agent_id.clone(),
            label: finding.label.clone(),
            score: finding.score,
            severity: severity_for_score(finding.score),
            indicators: finding.indicators.clone(),
            record_id: finding.record_id.clone(),
            first_seen_ms: now_ms,
            last_seen_ms: now_ms,
            evidence_count: 1,
        };
        self.by_fingerprint.insert(fp, alert.id.clone());
        self.alerts.insert(alert.id.clone(), alert.clone());
        tracing::info!(
            agent_id = %alert.agent_id,
            label = %alert.label,
            score = alert.score,
            "alert raised"
        );
        Promotion::Raised(alert)
    }

    pub fn list(&self, filter: &AlertFilter) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        alerts.sort_by_key(|a| std::cmp::Reverse(a.last_seen_ms));
        alerts
    }

    pub fn get(&self, alert_id: &str) -> Option<Alert> {
        self.alerts.get(alert_id).map(|a| a.clone())
    }

    pub fn count(&self) -> usize {
        self.alerts.len()
    }
}
