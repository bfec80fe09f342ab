use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Base URL of the rule management API.
    pub server: String,
    /// Directory Prometheus reads `rule_files` from.
    pub rules_dir: String,
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "yes")]
    pub reload: bool,
    #[serde(default = "default_suffix")]
    pub file_suffix: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// Restricts management to these instances when set.
    #[serde(default)]
    pub prom_ids: Option<Vec<i64>>,
}

fn default_interval() -> u64 {
    30
}

fn default_suffix() -> String {
    ".rules.yml".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn yes() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full() {
        let yaml = r#"
server: http://rules-api:8080
rules_dir: /etc/prometheus/rules
interval_seconds: 15
reload: false
file_suffix: .yml
request_timeout_seconds: 3
prom_ids: [10, 20]
"#;
        let cfg: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.interval_seconds, 15);
        assert!(!cfg.reload);
        assert_eq!(cfg.file_suffix, ".yml");
        assert_eq!(cfg.prom_ids, Some(vec![10, 20]));
    }

    #[test]
    fn defaults_applied() {
        let yaml = "server: http://s\nrules_dir: /r\n";
        let cfg: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.interval_seconds, 30);
        assert!(cfg.reload);
        assert_eq!(cfg.file_suffix, ".rules.yml");
        assert_eq!(cfg.request_timeout_seconds, 10);
        assert!(cfg.prom_ids.is_none());
    }

    #[test]
    fn missing_server_fails() {
        let result: Result<EngineConfig, _> = serde_yaml::from_str("rules_dir: /r\n");
        assert!(result.is_err());
    }
}
