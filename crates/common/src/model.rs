use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;

/// A single alerting condition owned by one Prometheus instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub prom_id: i64,
    #[serde(default)]
    pub expr: String,
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub value: String,
    /// How long the condition must hold before the alert fires.
    #[serde(rename = "for", default)]
    pub for_duration: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

impl Rule {
    /// Full PromQL condition: `<expr> <op> <value>`.
    pub fn condition(&self) -> String {
        [self.expr.as_str(), self.op.as_str(), self.value.as_str()].join(" ")
    }
}

/// A monitored Prometheus instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prom {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub url: String,
}

impl Prom {
    pub fn with_id(id: i64) -> Self {
        Self {
            id,
            url: String::new(),
        }
    }
}

/// Ordered rule collection. Order follows the source and is kept in output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rules(pub Vec<Rule>);

impl Rules {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, rule: Rule) {
        self.0.push(rule);
    }

    pub fn into_inner(self) -> Vec<Rule> {
        self.0
    }

    /// Keeps only rules owned by one of `prom_ids`.
    pub fn retain_proms(&mut self, prom_ids: &[i64]) {
        self.0.retain(|r| prom_ids.contains(&r.prom_id));
    }
}

impl Deref for Rules {
    type Target = [Rule];

    fn deref(&self) -> &[Rule] {
        &self.0
    }
}

impl From<Vec<Rule>> for Rules {
    fn from(rules: Vec<Rule>) -> Self {
        Self(rules)
    }
}

impl FromIterator<Rule> for Rules {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Rules {
    type Item = Rule;
    type IntoIter = std::vec::IntoIter<Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Rules {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Rules of one instance, paired with that instance's descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromRules {
    pub prom: Prom,
    pub rules: Rules,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_keys() {
        let json = r#"{
            "id": 7,
            "prom_id": 3,
            "expr": "node_load1",
            "op": ">",
            "value": "4",
            "for": "1m",
            "labels": {"team": "infra"},
            "summary": "load",
            "description": "load is high"
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.id, 7);
        assert_eq!(rule.prom_id, 3);
        assert_eq!(rule.for_duration, "1m");
        assert_eq!(rule.labels["team"], "infra");
    }

    #[test]
    fn missing_fields_default() {
        let rule: Rule = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(rule.prom_id, 0);
        assert!(rule.labels.is_empty());
        assert!(rule.expr.is_empty());
    }

    #[test]
    fn encodes_for_key() {
        let rule = Rule {
            for_duration: "5m".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&rule).unwrap();
        assert_eq!(v["for"], "5m");
        assert!(v.get("for_duration").is_none());
    }

    #[test]
    fn condition_joins_with_spaces() {
        let rule = Rule {
            expr: "up".into(),
            op: "==".into(),
            value: "0".into(),
            ..Default::default()
        };
        assert_eq!(rule.condition(), "up == 0");
    }

    #[test]
    fn rules_decode_from_array() {
        let rules: Rules = serde_json::from_str(r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].id, 2);
    }

    #[test]
    fn retain_proms_filters() {
        let mut rules: Rules = [10, 20, 10, 30]
            .into_iter()
            .enumerate()
            .map(|(i, prom_id)| Rule {
                id: i as i64,
                prom_id,
                ..Default::default()
            })
            .collect();
        rules.retain_proms(&[10, 30]);
        let ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 2, 3]);
    }
}
