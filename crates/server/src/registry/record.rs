use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Online,
    Stale,
    Offline,
}

impl Liveness {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Stale => "stale",
            Self::Offline => "offline",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "online" => Some(Self::Online),
            "stale" => Some(Self::Stale),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub platform: String,
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub facts: HashMap<String, String>,
    pub registered_at_ms: i64,
    pub last_heartbeat_ms: i64,
}

impl AgentRecord {
    /// Liveness is derived from the last heartbeat, which makes the
    /// online/stale/offline transitions monotonic and a heartbeat an
    /// instant reset to online from any prior state.
    pub fn liveness(&self, now_ms: i64, stale_after_ms: i64, offline_after_ms: i64) -> Liveness {
        let silent_for = now_ms - self.last_heartbeat_ms;
        if silent_for <= stale_after_ms {
            Liveness::Online
        } else if silent_for <= offline_after_ms {
            Liveness::Stale
        } else {
            Liveness::Offline
        }
    }
}
