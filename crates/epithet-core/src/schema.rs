//! Persisted schema model: physical indexes, logical aliases, and the
//! control-document payload that ties them together.
//!
//! The schema is the single source of truth compiled from declared
//! configuration and pushed to the cluster by the enforcer. It is persisted
//! as the embedded-string payload of one externally-versioned control
//! document (see [`Schema::to_control_document`]), never as structured
//! sub-fields, so the cluster's automatic field-type inference can't
//! reinterpret it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};
use crate::strategy::StrategyRef;

/// Field name holding the embedded schema payload inside the control document.
pub const EMBEDDED_SCHEMA_FIELD: &str = "schema";

// ─── Routing keys ───────────────────────────────────────────────────────────

/// A comparable value used to choose which index among an alias's members a
/// document or query belongs to. Usually a timestamp; integers and plain
/// text are supported for non-temporal bucketing.
///
/// The ordering is total: keys of different classes order by class
/// (`Time < Int < Text`), keys of the same class by value. Range routers
/// only ever compare keys produced by one strategy, so cross-class ordering
/// exists purely to keep sorting well-defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingKey {
    /// An absolute instant (RFC 3339 on the wire; bare `YYYY-MM-DD` dates
    /// parse as midnight UTC).
    Time(DateTime<Utc>),
    /// An integer bucket.
    Int(i64),
    /// An opaque textual bucket.
    Text(String),
}

impl RoutingKey {
    /// Parse a routing key from user input (CLI arguments, config strings).
    ///
    /// Tries RFC 3339, then `YYYY-MM-DD`, then an integer; anything else is
    /// kept as text.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
            return Self::Time(instant.with_timezone(&Utc));
        }
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Self::from_date(date);
        }
        if let Ok(number) = input.parse::<i64>() {
            return Self::Int(number);
        }
        Self::Text(input.to_owned())
    }

    /// Midnight UTC of the given date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time");
        Self::Time(midnight.and_utc())
    }

    const fn class_rank(&self) -> u8 {
        match self {
            Self::Time(_) => 0,
            Self::Int(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

impl Ord for RoutingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.class_rank().cmp(&other.class_rank()),
        }
    }
}

impl PartialOrd for RoutingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for RoutingKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Time(instant) => serializer.serialize_str(&instant.to_rfc3339()),
            Self::Int(number) => serializer.serialize_i64(*number),
            Self::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for RoutingKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(Self::parse(&text)),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| D::Error::custom("routing key number must be an integer")),
            other => Err(D::Error::custom(format!(
                "routing key must be a string or integer, got {other}"
            ))),
        }
    }
}

// ─── Schema records ─────────────────────────────────────────────────────────

/// One physical index known to the schema. Identity is `name`.
///
/// `alias` records which alias *created* the index (provenance). It is not
/// live membership: an index may later be linked into a different alias's
/// `indexes` list without its recorded owner changing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl IndexRecord {
    /// A bare index record with just a name and provenance alias.
    #[must_use]
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
            routing: None,
            mappings: None,
            settings: None,
        }
    }

    /// Same, with a routing key.
    #[must_use]
    pub fn with_routing(
        name: impl Into<String>,
        alias: impl Into<String>,
        routing: RoutingKey,
    ) -> Self {
        let mut record = Self::new(name, alias);
        record.routing = Some(routing);
        record
    }
}

/// One logical alias: its strategy, alias-level routing/filter documents,
/// and the ordered names of its current member indexes.
///
/// `indexes` order is significant only where the strategy's router relies on
/// it (range strategies keep it in descending routing order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub name: String,
    pub strategy: StrategyRef,
    #[serde(default)]
    pub routing: Option<Value>,
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub indexes: Vec<String>,
}

/// A resolved settings group: concrete index names plus the settings
/// document to apply to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsEntry {
    pub indexes: Vec<String>,
    pub settings: Value,
}

/// The full persisted schema: aliases, indexes, templates, and computed
/// settings groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub aliases: Vec<AliasRecord>,
    #[serde(default)]
    pub indexes: Vec<IndexRecord>,
    #[serde(default)]
    pub templates: BTreeMap<String, Value>,
    #[serde(default)]
    pub settings: Vec<SettingsEntry>,
}

impl Schema {
    /// The empty schema seeded at version 0.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&AliasRecord> {
        self.aliases.iter().find(|alias| alias.name == name)
    }

    pub fn alias_mut(&mut self, name: &str) -> Option<&mut AliasRecord> {
        self.aliases.iter_mut().find(|alias| alias.name == name)
    }

    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexRecord> {
        self.indexes.iter().find(|index| index.name == name)
    }

    #[must_use]
    pub fn has_index(&self, name: &str) -> bool {
        self.index(name).is_some()
    }

    /// All known index names.
    #[must_use]
    pub fn index_names(&self) -> BTreeSet<&str> {
        self.indexes.iter().map(|index| index.name.as_str()).collect()
    }

    /// Check the structural invariant: every index referenced by an alias
    /// exists in the index set.
    pub fn validate(&self) -> SchemaResult<()> {
        let known = self.index_names();
        for alias in &self.aliases {
            for member in &alias.indexes {
                if !known.contains(member.as_str()) {
                    return Err(SchemaError::ControlDocument {
                        reason: format!(
                            "alias {} references unknown index {member}",
                            alias.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Encode this schema as the control-document body: the full schema
    /// serialized to a JSON string and embedded under a single field.
    pub fn to_control_document(&self) -> SchemaResult<Value> {
        let payload = serde_json::to_string(self)?;
        let mut doc = serde_json::Map::new();
        doc.insert(EMBEDDED_SCHEMA_FIELD.to_owned(), Value::String(payload));
        Ok(Value::Object(doc))
    }

    /// Decode a schema from a control-document body.
    pub fn from_control_document(doc: &Value) -> SchemaResult<Self> {
        let payload = doc
            .get(EMBEDDED_SCHEMA_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::ControlDocument {
                reason: format!("missing embedded '{EMBEDDED_SCHEMA_FIELD}' string field"),
            })?;
        Ok(serde_json::from_str(payload)?)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn time(y: i32, m: u32, d: u32) -> RoutingKey {
        RoutingKey::from_date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn routing_key_parse_recognizes_classes() {
        assert_eq!(RoutingKey::parse("2014-01-01"), time(2014, 1, 1));
        assert!(matches!(
            RoutingKey::parse("2014-01-01T12:30:00Z"),
            RoutingKey::Time(_)
        ));
        assert_eq!(RoutingKey::parse("42"), RoutingKey::Int(42));
        assert_eq!(
            RoutingKey::parse("shard-a"),
            RoutingKey::Text("shard-a".to_owned())
        );
    }

    #[test]
    fn routing_key_ordering_is_total() {
        let jan = time(2014, 1, 1);
        let feb = time(2014, 2, 1);
        assert!(jan < feb);
        assert!(RoutingKey::Int(1) < RoutingKey::Int(2));
        assert!(RoutingKey::Text("a".into()) < RoutingKey::Text("b".into()));
        // Cross-class: Time < Int < Text, regardless of value.
        assert!(feb < RoutingKey::Int(0));
        assert!(RoutingKey::Int(i64::MAX) < RoutingKey::Text(String::new()));
    }

    #[test]
    fn routing_key_serde_round_trip() {
        for key in [time(2014, 1, 1), RoutingKey::Int(-3), RoutingKey::Text("x".into())] {
            let encoded = serde_json::to_string(&key).unwrap();
            let decoded: RoutingKey = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, key, "round trip failed for {encoded}");
        }
    }

    #[test]
    fn date_strings_deserialize_as_time() {
        let decoded: RoutingKey = serde_json::from_str("\"2014-02-01\"").unwrap();
        assert_eq!(decoded, time(2014, 2, 1));
    }

    fn sample_schema() -> Schema {
        Schema {
            aliases: vec![AliasRecord {
                name: "events".to_owned(),
                strategy: StrategyRef::bare("date"),
                routing: None,
                filter: None,
                indexes: vec!["201401".to_owned()],
            }],
            indexes: vec![IndexRecord::with_routing("201401", "events", time(2014, 1, 1))],
            templates: BTreeMap::new(),
            settings: Vec::new(),
        }
    }

    #[test]
    fn control_document_round_trip() {
        let schema = sample_schema();
        let doc = schema.to_control_document().unwrap();
        // The payload is an embedded string, not a structured sub-document.
        assert!(doc.get(EMBEDDED_SCHEMA_FIELD).unwrap().is_string());
        let decoded = Schema::from_control_document(&doc).unwrap();
        assert_eq!(decoded, schema);
    }

    #[test]
    fn control_document_missing_field_is_an_error() {
        let err = Schema::from_control_document(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, SchemaError::ControlDocument { .. }));
    }

    #[test]
    fn validate_catches_dangling_alias_members() {
        let mut schema = sample_schema();
        schema.indexes.clear();
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("201401"));
    }

    #[test]
    fn validate_accepts_consistent_schema() {
        sample_schema().validate().unwrap();
    }

    #[test]
    fn empty_schema_has_no_members() {
        let schema = Schema::empty();
        assert!(schema.aliases.is_empty());
        assert!(schema.indexes.is_empty());
        assert!(schema.index_names().is_empty());
    }
}
