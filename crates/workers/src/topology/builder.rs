use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use fleetwatch_common::record::LogRecord;
use fleetwatch_common::time::now_ms;

use super::graph::{
    normalize_host_key, NodeRole, TopologyEdge, TopologyNode, TopologySnapshot,
};

const RELATION_COMMUNICATES: &str = "communicates-with";

struct GraphInner {
    nodes: HashMap<String, TopologyNode>,
    edges: HashMap<(String, String), TopologyEdge>,
    version: u64,
}

/// Folds host and network facts from log record attributes into a live
/// graph. All reads go through versioned snapshots; the write lock is
/// held only for the duration of a single upsert or prune.
#[derive(Clone)]
pub struct TopologyBuilder {
    inner: Arc<RwLock<GraphInner>>,
    staleness_window_ms: i64,
}

impl TopologyBuilder {
    pub fn new(staleness_window_ms: i64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(GraphInner {
                nodes: HashMap::new(),
                edges: HashMap::new(),
                version: 0,
            })),
            staleness_window_ms,
        }
    }

    /// Extracts zero or more facts from the record and upserts
    /// nodes/edges accordingly. Records without host facts are a no-op.
    pub fn ingest(&self, record: &LogRecord) {
        let host = record
            .attr("host")
            .or_else(|| record.attr("hostname"))
            .map(normalize_host_key);
        let src_ip = record.attr("source_ip").map(normalize_host_key);
        let dst_ip = record.attr("destination_ip").map(normalize_host_key);

        if host.is_none() && src_ip.is_none() && dst_ip.is_none() {
            return;
        }

        let now = record.timestamp_ms;
        let mut inner = self.inner.write().expect("topology lock poisoned");

        let primary = host.clone().or_else(|| src_ip.clone());

        for key in [host, src_ip.clone(), dst_ip.clone()].into_iter().flatten() {
            let node = inner.nodes.entry(key.clone()).or_insert_with(|| TopologyNode {
                key,
                role: NodeRole::Unknown,
                zone: "internal".into(),
                services: BTreeSet::new(),
                seen_by: BTreeSet::new(),
                first_seen_ms: now,
                last_seen_ms: now,
            });
            node.last_seen_ms = node.last_seen_ms.max(now);
            node.seen_by.insert(record.agent_id.clone());
        }

        // Zone/role/service facts attach to the host the record is about.
        if let Some(primary) = primary {
            if let Some(node) = inner.nodes.get_mut(&primary) {
                if let Some(zone) = record.attr("zone") {
                    node.zone = zone.to_string();
                }
                if let Some(role) = record.attr("role") {
                    let parsed = NodeRole::parse(role);
                    if parsed != NodeRole::Unknown {
                        node.role = parsed;
                    }
                }
                if let Some(service) = record.attr("service") {
                    node.services.insert(service.to_string());
                    if node.role == NodeRole::Unknown {
                        node.role = NodeRole::from_service(service);
                    }
                }
            }

            if let (Some(src), Some(dst)) = (src_ip.as_deref(), dst_ip.as_deref()) {
                Self::upsert_edge(&mut inner, src, dst, now);
            } else if let Some(dst) = dst_ip.as_deref() {
                let src = primary.clone();
                Self::upsert_edge(&mut inner, &src, dst, now);
            }
        }

        inner.version += 1;
    }

    fn upsert_edge(inner: &mut GraphInner, src: &str, dst: &str, now: i64) {
        if src == dst {
            return;
        }
        let key = (src.to_string(), dst.to_string());
        let edge = inner.edges.entry(key).or_insert_with(|| TopologyEdge {
            src: src.to_string(),
            dst: dst.to_string(),
            relation: RELATION_COMMUNICATES.into(),
            first_seen_ms: now,
            last_seen_ms: now,
            evidence_count: 0,
        });
        edge.last_seen_ms = edge.last_seen_ms.max(now);
        edge.evidence_count += 1;
    }

    pub fn snapshot(&self) -> TopologySnapshot {
        let inner = self.inner.read().expect("topology lock poisoned");
        let mut nodes: Vec<TopologyNode> = inner.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        let mut edges: Vec<TopologyEdge> = inner.edges.values().cloned().collect();
        edges.sort_by(|a, b| (&a.src, &a.dst).cmp(&(&b.src, &b.dst)));
        TopologySnapshot {
            version: inner.version,
            generated_at_ms: now_ms(),
            nodes,
            edges,
        }
    }

    /// Removes nodes unseen beyond the staleness window, plus any edge
    /// touching a removed node. Runs on a schedule, not per ingest.
    pub fn prune(&self, now_ms: i64) -> usize {
        let cutoff = now_ms - self.staleness_window_ms;
        let mut inner = self.inner.write().expect("topology lock poisoned");
        let before = inner.nodes.len();
        inner.nodes.retain(|_, node| node.last_seen_ms >= cutoff);
        let removed = before - inner.nodes.len();
        if removed > 0 {
            let live: std::collections::HashSet<String> = inner.nodes.keys().cloned().collect();
            inner
                .edges
                .retain(|_, edge| live.contains(&edge.src) && live.contains(&edge.dst));
            inner.version += 1;
            tracing::debug!(removed, "pruned stale topology nodes");
        }
        removed
    }
}
