use std::time::Duration;

use ruleengine_common::{EnvelopeError, Prom, PromsResp, Rules, RulesResp};
use serde::de::DeserializeOwned;

/// Pulls rules and instances from the rule management API.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug)]
pub enum ClientError {
    Transport(String),
    Rejected(u16),
    Decode(String),
    Api(EnvelopeError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Rejected(code) => write!(f, "rejected with status {code}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Api(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<EnvelopeError> for ClientError {
    fn from(e: EnvelopeError) -> Self {
        Self::Api(e)
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_rules(&self) -> Result<Rules, ClientError> {
        let resp: RulesResp = self.get_json("/api/v1/rules").await?;
        Ok(resp.into_data()?)
    }

    pub async fn fetch_proms(&self) -> Result<Vec<Prom>, ClientError> {
        let resp: PromsResp = self.get_json("/api/v1/proms").await?;
        Ok(resp.into_data()?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "rule API rejected request");
            return Err(ClientError::Rejected(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
