use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Info
    }
}

/// A raw log entry as submitted by an agent, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLogEntry {
    pub timestamp_ms: Option<i64>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// A normalized, immutable log record. Built by the ingestion
/// coordinator from a validated [`RawLogEntry`]; downstream components
/// only ever borrow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    pub agent_id: String,
    pub timestamp_ms: i64,
    pub ingested_at_ms: i64,
    pub source: String,
    pub severity: Severity,
    pub message: String,
    pub attributes: HashMap<String, String>,
}

impl LogRecord {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
