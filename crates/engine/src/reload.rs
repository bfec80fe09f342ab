use std::time::Duration;

use ruleengine_common::Prom;

/// Triggers Prometheus' lifecycle reload endpoint.
pub struct Reloader {
    http: reqwest::Client,
}

#[derive(Debug)]
pub enum ReloadError {
    MissingUrl(i64),
    Transport(String),
    Rejected(u16),
}

impl std::fmt::Display for ReloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUrl(id) => write!(f, "prom {id} has no url"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Rejected(code) => write!(f, "rejected with status {code}"),
        }
    }
}

impl std::error::Error for ReloadError {}

pub fn reload_url(base: &str) -> String {
    format!("{}/-/reload", base.trim_end_matches('/'))
}

impl Reloader {
    pub fn new(timeout: Duration) -> Result<Self, ReloadError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReloadError::Transport(e.to_string()))?;
        Ok(Self { http })
    }

    pub async fn reload(&self, prom: &Prom) -> Result<(), ReloadError> {
        if prom.url.is_empty() {
            return Err(ReloadError::MissingUrl(prom.id));
        }
        let url = reload_url(&prom.url);
        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| ReloadError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            tracing::info!(prom_id = prom.id, %url, "prometheus reloaded");
            Ok(())
        } else {
            Err(ReloadError::Rejected(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_url_joins_path() {
        assert_eq!(reload_url("http://prom:9090"), "http://prom:9090/-/reload");
        assert_eq!(reload_url("http://prom:9090/"), "http://prom:9090/-/reload");
    }

    #[tokio::test]
    async fn empty_url_rejected_without_request() {
        let reloader = Reloader::new(Duration::from_secs(1)).unwrap();
        let err = reloader.reload(&Prom::with_id(4)).await.unwrap_err();
        assert!(matches!(err, ReloadError::MissingUrl(4)));
    }
}
