//! Rule-group document in the layout Prometheus loads from `rule_files`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::{Rule, Rules};

/// Name of the single group every rule is emitted under. Downstream
/// tooling matches on it, so it never changes.
pub const RULE_GROUP_NAME: &str = "ruleengine";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub groups: Vec<RuleGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    pub rules: Vec<AlertRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub alert: String,
    pub expr: String,
    #[serde(rename = "for")]
    pub for_duration: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    pub rule_id: String,
    pub prom_id: String,
    pub summary: String,
    pub description: String,
}

#[derive(Debug)]
pub struct EncodeError(serde_yaml::Error);

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encode rule document: {}", self.0)
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serde_yaml::Error> for EncodeError {
    fn from(e: serde_yaml::Error) -> Self {
        Self(e)
    }
}

impl From<&Rule> for AlertRule {
    fn from(r: &Rule) -> Self {
        let rule_id = r.id.to_string();
        Self {
            alert: rule_id.clone(),
            expr: r.condition(),
            for_duration: r.for_duration.clone(),
            labels: r.labels.clone(),
            annotations: Annotations {
                rule_id,
                prom_id: r.prom_id.to_string(),
                summary: r.summary.clone(),
                description: r.description.clone(),
            },
        }
    }
}

impl RuleDocument {
    pub fn from_rules(rules: &Rules) -> Self {
        Self {
            groups: vec![RuleGroup {
                name: RULE_GROUP_NAME.to_string(),
                rules: rules.iter().map(AlertRule::from).collect(),
            }],
        }
    }

    pub fn to_yaml(&self) -> Result<Vec<u8>, EncodeError> {
        let text = serde_yaml::to_string(self)?;
        Ok(text.into_bytes())
    }

    pub fn from_yaml(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(bytes)
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }
}

impl Rules {
    /// Encodes the whole collection as a single-group rule document.
    pub fn content(&self) -> Result<Vec<u8>, EncodeError> {
        let doc = RuleDocument::from_rules(self);
        tracing::debug!(rules = self.len(), "encoding rule document");
        doc.to_yaml()
    }
}
