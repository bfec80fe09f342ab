pub mod document;
pub mod envelope;
pub mod model;
pub mod partition;

pub use document::{AlertRule, Annotations, EncodeError, RuleDocument, RuleGroup, RULE_GROUP_NAME};
pub use envelope::{EnvelopeError, PromsResp, Response, RulesResp};
pub use model::{Prom, PromRules, Rule, Rules};
