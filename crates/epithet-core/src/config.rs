//! Declared configuration: the operator-authored document the compiler
//! diffs against the stored schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::strategy::StrategyRef;

/// Top-level declared configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasConfig {
    /// Logical aliases, in declaration order. Order matters: an alias may
    /// reference indexes created by aliases declared before it in the same
    /// compile.
    #[serde(default)]
    pub aliases: Vec<AliasDecl>,
    /// Index templates to upsert, by name.
    #[serde(default)]
    pub templates: BTreeMap<String, Value>,
    /// Settings groups targeting index subsets (resolved by the compiler).
    #[serde(default)]
    pub settings: Vec<SettingsDecl>,
}

/// One declared alias.
///
/// `settings` and `mappings` apply to indexes the strategy creates for this
/// alias, not to the alias entity itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasDecl {
    pub name: String,
    pub strategy: StrategyRef,
    #[serde(default)]
    pub routing: Option<Value>,
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub mappings: Option<Value>,
}

impl AliasDecl {
    /// A minimal declaration with just a name and strategy reference.
    #[must_use]
    pub fn new(name: impl Into<String>, strategy: StrategyRef) -> Self {
        Self {
            name: name.into(),
            strategy,
            routing: None,
            filter: None,
            settings: None,
            mappings: None,
        }
    }
}

/// A declared settings group: targets a subset of the index set (selected
/// through the index filter) and a settings document to apply to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsDecl {
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
    #[serde(default)]
    pub slice: Option<String>,
    pub settings: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_from_json() {
        let raw = serde_json::json!({
            "aliases": [
                {"name": "events", "strategy": {"date": {"indexes": {"201401": "2014-01-01"}}}},
                {"name": "all", "strategy": {"index_pointer": {"indexes": ["201401"]}}}
            ],
            "templates": {"events_template": {"index_patterns": ["201*"]}},
            "settings": [
                {"aliases": ["events"], "slice": ":1", "settings": {"index": {"refresh_interval": "5s"}}}
            ]
        });
        let config: AliasConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.aliases.len(), 2);
        assert_eq!(config.aliases[0].name, "events");
        assert!(config.templates.contains_key("events_template"));
        assert_eq!(config.settings[0].slice.as_deref(), Some(":1"));
    }

    #[test]
    fn empty_config_is_valid() {
        let config: AliasConfig = serde_json::from_str("{}").unwrap();
        assert!(config.aliases.is_empty());
        assert!(config.templates.is_empty());
        assert!(config.settings.is_empty());
    }

    #[test]
    fn bare_strategy_string_parses() {
        let raw = serde_json::json!({"name": "users", "strategy": "single"});
        let decl: AliasDecl = serde_json::from_value(raw).unwrap();
        assert_eq!(decl.name, "users");
        assert!(decl.routing.is_none());
    }
}
