use std::hash::{Hash, Hasher};

/// Dedup key for the (agent, label) alert invariant: however many
/// findings fire, one fingerprint maps to at most one live alert
/// inside the dedup window.
pub fn fingerprint(agent_id: &str, label: &str) -> u64 {
    let mut hasher = std::hash::DefaultHasher::new();
    agent_id.hash(&mut hasher);
    label.hash(&mut hasher);
    hasher.finish()
}

pub fn fingerprint_string(agent_id: &str, label: &str) -> String {
    format!("{:016x}", fingerprint(agent_id, label))
}
