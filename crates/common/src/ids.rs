use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Short command id, `cmd_` plus 12 hex chars of a fresh UUID.
pub fn command_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("cmd_{}", &uuid[..12])
}

pub fn alert_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Stable agent id minted from the platform fingerprint supplied at
/// registration. The same fingerprint always maps to the same id, so a
/// re-registering agent that lost its id gets its old record back.
pub fn agent_id_from_fingerprint(platform: &str, fingerprint: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(platform.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(fingerprint.as_bytes());
    let digest = hasher.finalize();
    format!("agent-{}", &hex::encode(digest)[..12])
}
