use fleetwatch_common::ids::record_id;
use fleetwatch_common::record::LogRecord;
use fleetwatch_common::time::now_ms;

use super::engine::{Scorer, ScorerError};
use super::finding::Finding;

struct PatternCategory {
    name: &'static str,
    label: &'static str,
    base_score: f64,
    patterns: &'static [&'static str],
}

const CATEGORIES: &[PatternCategory] = &[
    PatternCategory {
        name: "attack_tools",
        label: "attack_tool_usage",
        base_score: 0.7,
        patterns: &[
            "nmap", "sqlmap", "metasploit", "msfconsole", "exploit", "nikto", "dirb", "gobuster",
            "hydra", "mimikatz", "psexec", "powershell -enc", "certutil -decode", "bitsadmin",
            "regsvr32",
        ],
    },
    PatternCategory {
        name: "suspicious_commands",
        label: "reconnaissance",
        base_score: 0.4,
        patterns: &[
            "whoami", "net user", "net localgroup", "tasklist", "ps aux", "netstat", "arp -a",
            "ipconfig", "ifconfig", "route print", "cat /etc/passwd", "cat /etc/shadow",
            "sudo -l", "chmod +x", "nc -", "netcat",
        ],
    },
    PatternCategory {
        name: "malicious_patterns",
        label: "active_attack",
        base_score: 0.8,
        patterns: &[
            "reverse shell", "bind shell", "backdoor", "rootkit", "privilege escalation",
            "lateral movement", "credential dump", "hash dump", "code injection",
            "sql injection", "directory traversal",
        ],
    },
    PatternCategory {
        name: "network_attacks",
        label: "network_attack",
        base_score: 0.6,
        patterns: &[
            "port scan", "vulnerability scan", "brute force", "arp spoofing", "dns poisoning",
            "man in the middle",
        ],
    },
    PatternCategory {
        name: "system_compromise",
        label: "system_compromise",
        base_score: 0.9,
        patterns: &[
            "malware", "ransomware", "trojan", "keylogger", "botnet", "c2 server",
            "command and control", "exfiltration",
        ],
    },
    PatternCategory {
        name: "auth_failures",
        label: "authentication_attack",
        base_score: 0.5,
        patterns: &[
            "failed login", "authentication failed", "invalid credentials", "access denied",
            "unauthorized access",
        ],
    },
];

/// Signature-based scorer over the record message. The strongest
/// matched category sets the base score; each additional matched
/// pattern adds a 10% correlation boost, capped at 1.0.
pub struct SignatureScorer;

impl Scorer for SignatureScorer {
    fn name(&self) -> &str {
        "signature"
    }

    fn score(&self, record: &LogRecord) -> Result<Option<Finding>, ScorerError> {
        let message = record.message.to_lowercase();

        let mut indicators = Vec::new();
        let mut best: Option<&PatternCategory> = None;
        let mut matches = 0usize;

        for category in CATEGORIES {
            for pattern in category.patterns {
                if message.contains(pattern) {
                    indicators.push(format!("{}: {}", category.name, pattern));
                    matches += 1;
                    if best.map_or(true, |b| category.base_score > b.base_score) {
                        best = Some(category);
                    }
                }
            }
        }

        let Some(category) = best else {
            return Ok(None);
        };

        let base = category.base_score;
        let boost = (matches.saturating_sub(1)) as f64 * base * 0.1;
        let score = (base + boost).min(1.0);

        Ok(Some(Finding {
            id: record_id(),
            record_id: record.id.clone(),
            agent_id: record.agent_id.clone(),
            scorer: self.name().to_string(),
            score,
            label: category.label.to_string(),
            indicators,
            scored_at_ms: now_ms(),
        }))
    }
}
