use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Host identities are de-duplicated by this key no matter which agent
/// reported them.
pub fn normalize_host_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Unknown,
    Workstation,
    WebServer,
    DatabaseServer,
    FileServer,
    DomainController,
}

impl NodeRole {
    /// Classifies from an observed service name, the way discovered
    /// daemons hint at a host's function.
    pub fn from_service(service: &str) -> Self {
        let service = service.to_lowercase();
        if ["httpd", "nginx", "apache", "http"].iter().any(|s| service.contains(s)) {
            Self::WebServer
        } else if ["mysql", "postgres", "mssql", "oracle"].iter().any(|s| service.contains(s)) {
            Self::DatabaseServer
        } else if ["smb", "samba", "nfs"].iter().any(|s| service.contains(s)) {
            Self::FileServer
        } else if ["ldap", "kerberos", "ntds"].iter().any(|s| service.contains(s)) {
            Self::DomainController
        } else {
            Self::Unknown
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "workstation" => Self::Workstation,
            "web_server" | "web-server" => Self::WebServer,
            "database_server" | "database-server" => Self::DatabaseServer,
            "file_server" | "file-server" => Self::FileServer,
            "domain_controller" | "domain-controller" => Self::DomainController,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyNode {
    pub key: String,
    pub role: NodeRole,
    pub zone: String,
    pub services: BTreeSet<String>,
    /// Agents that have observed this host.
    pub seen_by: BTreeSet<String>,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyEdge {
    pub src: String,
    pub dst: String,
    pub relation: String,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
    pub evidence_count: u64,
}

/// A consistent point-in-time view. Each mutation of the underlying
/// graph bumps `version`, so consumers can cheaply detect change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub version: u64,
    pub generated_at_ms: i64,
    pub nodes: Vec<TopologyNode>,
    pub edges: Vec<TopologyEdge>,
}
