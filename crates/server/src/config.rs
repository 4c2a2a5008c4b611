use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub rest_addr: SocketAddr,
    /// Missed-heartbeat window before an agent is reported stale (T1).
    pub stale_after_ms: i64,
    /// Window before a stale agent is reported offline (T2 > T1).
    pub offline_after_ms: i64,
    pub max_batch_size: usize,
    /// Tolerated clock skew for record timestamps.
    pub max_future_skew_ms: i64,
    /// Bound of the ingestion-to-pipeline channel.
    pub pipeline_depth: usize,
    pub sweep_interval_ms: u64,
    pub prune_interval_ms: u64,
    pub topology_staleness_ms: i64,
    pub dedup_window_ms: i64,
    pub min_alert_score: f64,
    pub max_audit_findings: usize,
    pub default_command_timeout_ms: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: "0.0.0.0:8080".parse().unwrap(),
            stale_after_ms: 90_000,
            offline_after_ms: 300_000,
            max_batch_size: 500,
            max_future_skew_ms: 300_000,
            pipeline_depth: 10_000,
            sweep_interval_ms: 5_000,
            prune_interval_ms: 60_000,
            topology_staleness_ms: 86_400_000,
            dedup_window_ms: 3_600_000,
            min_alert_score: 0.5,
            max_audit_findings: 10_000,
            default_command_timeout_ms: 300_000,
        }
    }
}

impl ServerConfig {
    /// Environment overrides on top of the defaults; unparsable values
    /// fall back silently to keep startup simple.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(addr) = env_parse::<SocketAddr>("FLEETWATCH_REST_ADDR") {
            config.rest_addr = addr;
        }
        if let Some(v) = env_parse("FLEETWATCH_STALE_AFTER_MS") {
            config.stale_after_ms = v;
        }
        if let Some(v) = env_parse("FLEETWATCH_OFFLINE_AFTER_MS") {
            config.offline_after_ms = v;
        }
        if let Some(v) = env_parse("FLEETWATCH_MAX_BATCH_SIZE") {
            config.max_batch_size = v;
        }
        if let Some(v) = env_parse("FLEETWATCH_DEDUP_WINDOW_MS") {
            config.dedup_window_ms = v;
        }
        if let Some(v) = env_parse("FLEETWATCH_MIN_ALERT_SCORE") {
            config.min_alert_score = v;
        }
        if let Some(v) = env_parse("FLEETWATCH_COMMAND_TIMEOUT_MS") {
            config.default_command_timeout_ms = v;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = ServerConfig::default();
        assert!(config.offline_after_ms > config.stale_after_ms);
        assert!(config.min_alert_score > 0.0 && config.min_alert_score <= 1.0);
        assert!(config.max_batch_size > 0);
    }
}
