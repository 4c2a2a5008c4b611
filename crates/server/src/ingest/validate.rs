use serde::Serialize;

use fleetwatch_common::ids::record_id;
use fleetwatch_common::record::{LogRecord, RawLogEntry};

/// Why an individual log entry was rejected. Rejections never fail the
/// batch; they are reported back by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    EmptyMessage,
    MissingTimestamp,
    TimestampInFuture,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EmptyMessage => "empty message",
            Self::MissingTimestamp => "missing timestamp",
            Self::TimestampInFuture => "timestamp in the future",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub index: usize,
    pub reason: RejectReason,
}

/// Validates one raw entry and normalizes it into an immutable record.
/// Timestamps slightly ahead of the server clock are tolerated up to
/// `max_future_skew_ms`.
pub fn normalize(
    agent_id: &str,
    entry: RawLogEntry,
    now_ms: i64,
    max_future_skew_ms: i64,
) -> Result<LogRecord, RejectReason> {
    if entry.message.trim().is_empty() {
        return Err(RejectReason::EmptyMessage);
    }
    let timestamp_ms = entry.timestamp_ms.ok_or(RejectReason::MissingTimestamp)?;
    if timestamp_ms > now_ms + max_future_skew_ms {
        return Err(RejectReason::TimestampInFuture);
    }

    Ok(LogRecord {
        id: record_id(),
        agent_id: agent_id.to_string(),
        timestamp_ms,
        ingested_at_ms: now_ms,
        source: entry.source,
        severity: entry.severity,
        message: entry.message,
        attributes: entry.attributes,
    })
}
