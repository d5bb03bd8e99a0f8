//! Configuration parameter metadata

use serde::{Deserialize, Serialize};

use super::ParamValue;

/// Declared type of a configuration parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum ParamType {
    /// Free text
    #[default]
    String,
    /// Integer or decimal
    Number,
    /// On/off toggle
    #[serde(alias = "bool")]
    Boolean,
    /// One of a server-provided option list
    List,
}

/// One parameter as reported by the daemon for a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name, unique within a scope
    #[serde(default)]
    pub name: String,
    /// Current value
    pub value: ParamValue,
    /// Category index (see the snapshot's category table)
    #[serde(default)]
    pub category: i64,
    /// Declared type
    #[serde(rename = "type", default)]
    pub kind: ParamType,
    /// Whether the daemon honours this parameter in the current build
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Allowed options for list-typed parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<Vec<String>>,
}

fn default_enabled() -> bool {
    true
}

impl Parameter {
    /// Create a parameter with default metadata.
    pub fn new(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            category: 0,
            kind: ParamType::default(),
            enabled: true,
            list: None,
        }
    }

    /// Set the declared type.
    pub fn with_kind(mut self, kind: ParamType) -> Self {
        self.kind = kind;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_daemon_entry() {
        let json = r#"{"value": 80, "enabled": true, "category": 6, "type": "number"}"#;
        let param: Parameter = serde_json::from_str(json).unwrap();
        assert_eq!(param.kind, ParamType::Number);
        assert_eq!(param.category, 6);
        assert_eq!(param.value, ParamValue::from(80));
        assert!(param.name.is_empty());
    }

    #[test]
    fn missing_metadata_uses_defaults() {
        let param: Parameter = serde_json::from_str(r#"{"value": "mkv"}"#).unwrap();
        assert!(param.enabled);
        assert_eq!(param.kind, ParamType::String);
        assert!(param.list.is_none());
    }
}
