use std::path::{Path, PathBuf};

use super::schema::EngineConfig;

pub const SERVER_ENV: &str = "RULEENGINE_SERVER";
pub const RULES_DIR_ENV: &str = "RULEENGINE_RULES_DIR";

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Validation(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse(e)
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        return dir.join("ruleengine").join("config.yml");
    }
    PathBuf::from("/etc/ruleengine/config.yml")
}

pub fn load_from_file(path: &Path) -> Result<EngineConfig, LoadError> {
    let cfg = read_from_file(path)?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_from_str(yaml: &str) -> Result<EngineConfig, LoadError> {
    let cfg = read_from_str(yaml)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Parses without validating, for callers that still apply overrides.
pub fn read_from_file(path: &Path) -> Result<EngineConfig, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    read_from_str(&contents)
}

pub fn read_from_str(yaml: &str) -> Result<EngineConfig, LoadError> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Applies `RULEENGINE_*` variables and explicit overrides on top of `cfg`,
/// then re-validates. Explicit values win over the environment.
pub fn apply_overrides(
    mut cfg: EngineConfig,
    server: Option<&str>,
    rules_dir: Option<&str>,
) -> Result<EngineConfig, LoadError> {
    if let Ok(v) = std::env::var(SERVER_ENV) {
        cfg.server = v;
    }
    if let Ok(v) = std::env::var(RULES_DIR_ENV) {
        cfg.rules_dir = v;
    }
    if let Some(s) = server {
        cfg.server = s.to_string();
    }
    if let Some(d) = rules_dir {
        cfg.rules_dir = d.to_string();
    }
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &EngineConfig) -> Result<(), LoadError> {
    if cfg.server.is_empty() {
        return Err(LoadError::Validation("server URL must not be empty".into()));
    }
    if cfg.rules_dir.is_empty() {
        return Err(LoadError::Validation("rules_dir must not be empty".into()));
    }
    if cfg.interval_seconds == 0 {
        return Err(LoadError::Validation("interval_seconds must be > 0".into()));
    }
    if cfg.request_timeout_seconds == 0 {
        return Err(LoadError::Validation(
            "request_timeout_seconds must be > 0".into(),
        ));
    }
    if cfg.file_suffix.contains('/') {
        return Err(LoadError::Validation(
            "file_suffix must not contain a path separator".into(),
        ));
    }
    Ok(())
}
