use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::DashMap;

use fleetwatch_common::ids::agent_id_from_fingerprint;

use super::record::{AgentRecord, Liveness};

#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    pub liveness: Option<Liveness>,
    pub platform: Option<String>,
}

/// The agent arena. All mutation goes through these methods; other
/// components only read records by id. No agent is ever removed
/// automatically, only via the explicit administrative [`remove`].
///
/// [`remove`]: AgentRegistry::remove
#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<DashMap<String, AgentRecord>>,
    stale_after_ms: i64,
    offline_after_ms: i64,
}

impl AgentRegistry {
    pub fn new(stale_after_ms: i64, offline_after_ms: i64) -> Self {
        Self {
            agents: Arc::new(DashMap::new()),
            stale_after_ms,
            offline_after_ms,
        }
    }

    /// Idempotent upsert. An unset or "auto" id mints a stable id from
    /// the platform fingerprint, so a re-registering agent that lost
    /// its id converges on the same record instead of colliding.
    pub fn register_or_update(
        &self,
        agent_id: &str,
        platform: &str,
        capabilities: BTreeSet<String>,
        fingerprint: &str,
        now_ms: i64,
    ) -> AgentRecord {
        let agent_id = if agent_id.is_empty() || agent_id == "auto" {
            agent_id_from_fingerprint(platform, fingerprint)
        } else {
            agent_id.to_string()
        };

        let mut entry = self
            .agents
            .entry(agent_id.clone())
            .or_insert_with(|| {
                tracing::info!(agent_id = %agent_id, platform = %platform, "agent registered");
                AgentRecord {
                    agent_id: agent_id.clone(),
                    platform: platform.to_string(),
                    capabilities: BTreeSet::new(),
                    facts: HashMap::new(),
                    registered_at_ms: now_ms,
                    last_heartbeat_ms: now_ms,
                }
            });
        entry.platform = platform.to_string();
        entry.capabilities = capabilities;
        entry.clone()
    }

    /// Updates last-seen and merges non-conflicting facts: new keys are
    /// inserted, existing values are never overwritten.
    pub fn heartbeat(
        &self,
        agent_id: &str,
        facts: HashMap<String, String>,
        now_ms: i64,
    ) -> Option<Liveness> {
        let mut entry = self.agents.get_mut(agent_id)?;
        entry.last_heartbeat_ms = now_ms;
        for (key, value) in facts {
            entry.facts.entry(key).or_insert(value);
        }
        Some(entry.liveness(now_ms, self.stale_after_ms, self.offline_after_ms))
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentRecord> {
        self.agents.get(agent_id).map(|r| r.clone())
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    pub fn liveness(&self, record: &AgentRecord, now_ms: i64) -> Liveness {
        record.liveness(now_ms, self.stale_after_ms, self.offline_after_ms)
    }

    pub fn list(&self, filter: &AgentFilter, now_ms: i64) -> Vec<AgentRecord> {
        let mut agents: Vec<AgentRecord> = self
            .agents
            .iter()
            .filter(|entry| {
                let record = entry.value();
                if let Some(platform) = &filter.platform {
                    if &record.platform != platform {
                        return false;
                    }
                }
                if let Some(liveness) = filter.liveness {
                    if self.liveness(record, now_ms) != liveness {
                        return false;
                    }
                }
                true
            })
            .map(|entry| entry.value().clone())
            .collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        agents
    }

    /// Explicit administrative deletion.
    pub fn remove(&self, agent_id: &str) -> Option<AgentRecord> {
        let removed = self.agents.remove(agent_id).map(|(_, r)| r);
        if removed.is_some() {
            tracing::info!(agent_id = %agent_id, "agent removed");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }

    pub fn counts_by_liveness(&self, now_ms: i64) -> HashMap<Liveness, usize> {
        let mut counts = HashMap::new();
        for entry in self.agents.iter() {
            *counts.entry(self.liveness(entry.value(), now_ms)).or_insert(0) += 1;
        }
        counts
    }
}
