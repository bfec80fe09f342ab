use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Prom, Rules};

/// Listing envelope returned by the rule management API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: T,
}

pub type RulesResp = Response<Rules>;
pub type PromsResp = Response<Vec<Prom>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeError {
    pub code: i32,
    pub msg: String,
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "api returned code {}: {}", self.code, self.msg)
    }
}

impl std::error::Error for EnvelopeError {}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// Unwraps `data` when `code` is zero.
    pub fn into_data(self) -> Result<T, EnvelopeError> {
        if self.is_ok() {
            Ok(self.data)
        } else {
            Err(EnvelopeError {
                code: self.code,
                msg: self.msg,
            })
        }
    }
}
