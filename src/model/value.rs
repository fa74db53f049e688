//! Setting values.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

use crate::error::{ConfigError, ConfigResult};

/// A scalar setting value.
///
/// Objects and arrays are not representable; `from_json` is the write
/// boundary that enforces it for untyped input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ScalarValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl ScalarValue {
    /// Convert an untyped JSON value, rejecting structured values.
    pub fn from_json(key: &str, value: Value) -> ConfigResult<Self> {
        match value {
            Value::Null => Ok(ScalarValue::Null),
            Value::Bool(b) => Ok(ScalarValue::Bool(b)),
            Value::Number(n) => Ok(ScalarValue::Number(n)),
            Value::String(s) => Ok(ScalarValue::String(s)),
            Value::Array(_) | Value::Object(_) => Err(ConfigError::InvalidValueType {
                key: key.to_string(),
            }),
        }
    }

    /// Null and the empty string count as "no value" when merging.
    pub fn is_empty(&self) -> bool {
        match self {
            ScalarValue::Null => true,
            ScalarValue::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Number(n) => write!(f, "{}", n),
            ScalarValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::String(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::String(s)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::Number(n.into())
    }
}

/// One configuration entry: value, operator comment, modification time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsValue {
    #[serde(default)]
    pub value: ScalarValue,

    #[serde(default)]
    pub comment: String,

    /// Unix seconds.
    #[serde(default)]
    pub modified_at: u64,
}

impl SettingsValue {
    pub fn new(value: impl Into<ScalarValue>, comment: impl Into<String>, modified_at: u64) -> Self {
        Self {
            value: value.into(),
            comment: comment.into(),
            modified_at,
        }
    }
}
