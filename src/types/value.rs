//! Parameter value representation

use serde::{Deserialize, Serialize};
use std::fmt;

/// A configuration value as carried by the daemon's JSON API.
///
/// Numbers keep their exact JSON representation so that an integer edit
/// (`80`) is submitted as `80` and never as `80.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean toggle
    Bool(bool),
    /// Integer or floating point number
    Number(serde_json::Number),
    /// Free text, enumerated option, or any string-typed value
    Text(String),
}

impl ParamValue {
    /// Render the value as the candidate string the validator inspects.
    ///
    /// Integral floats render without a fraction, so `80.0` is checked as
    /// `80` by the integer rules.
    pub fn to_candidate(&self) -> String {
        match self {
            ParamValue::Number(n) if n.is_f64() => match n.as_f64() {
                Some(v) if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 => {
                    (v as i64).to_string()
                }
                _ => self.to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Interpret the value as a boolean, accepting the daemon's textual forms.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(n) => n.as_i64().map(|v| v != 0),
            ParamValue::Text(s) => parse_bool(s),
        }
    }

    /// Interpret the value as a floating point number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => n.as_f64(),
            ParamValue::Text(s) => s.trim().parse().ok(),
            ParamValue::Bool(_) => None,
        }
    }
}

/// Parse the boolean spellings accepted by the daemon.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Some(true),
        "false" | "off" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        // NaN and infinities have no JSON number form
        match serde_json::Number::from_f64(value) {
            Some(n) => ParamValue::Number(n),
            None => ParamValue::Text(value.to_string()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}
