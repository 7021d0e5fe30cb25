//! Routing strategies: per-alias policy for which physical indexes exist,
//! which indexes an alias references, and how query-time routing works.
//!
//! The original registry-of-classes dispatch is a closed set here: a
//! [`StrategyKind`] names each variant, [`Strategy`] carries its typed
//! configuration, and every policy decision is an exhaustive match. The only
//! ambient input any strategy needs is "today" for the calendar variants,
//! injected through [`Clock`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::Clock;
use crate::error::{SchemaError, SchemaResult};
use crate::filter::IndexFilter;
use crate::router::Router;
use crate::schema::{AliasRecord, IndexRecord, RoutingKey, Schema};

// ─── Strategy references ────────────────────────────────────────────────────

/// How a declared alias names its strategy: either a bare kind name
/// (`"single"`) or a single-entry mapping carrying kind-specific config
/// (`{"date": {"indexes": {...}}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyRef {
    Bare(String),
    Configured(BTreeMap<String, Value>),
}

impl StrategyRef {
    /// A parameterless reference.
    #[must_use]
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::Bare(kind.into())
    }

    /// A reference with kind-specific configuration.
    #[must_use]
    pub fn configured(kind: impl Into<String>, cfg: Value) -> Self {
        let mut map = BTreeMap::new();
        map.insert(kind.into(), cfg);
        Self::Configured(map)
    }

    /// Split into `(kind name, config document)`. A configured reference
    /// must have exactly one entry.
    pub fn parts(&self, alias: &str) -> SchemaResult<(&str, Value)> {
        match self {
            Self::Bare(kind) => Ok((kind, Value::Object(serde_json::Map::new()))),
            Self::Configured(map) => {
                let mut entries = map.iter();
                let Some((kind, cfg)) = entries.next() else {
                    return Err(SchemaError::invalid_config(
                        alias,
                        "strategy reference is empty",
                    ));
                };
                if entries.next().is_some() {
                    return Err(SchemaError::invalid_config(
                        alias,
                        "strategy reference must name exactly one strategy",
                    ));
                }
                Ok((kind, cfg.clone()))
            }
        }
    }
}

// ─── Strategy kinds ─────────────────────────────────────────────────────────

/// The closed set of strategy kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    IndexPointer,
    AppendingPointer,
    AliasPointer,
    LatestIndex,
    Single,
    Date,
    Monthly,
    Annual,
}

impl StrategyKind {
    /// Look up a kind by its wire name. Returns `None` for unknown names;
    /// the caller turns that into a configuration error with alias context.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "index_pointer" => Some(Self::IndexPointer),
            "appending_pointer" => Some(Self::AppendingPointer),
            "alias_pointer" => Some(Self::AliasPointer),
            "latest_index" => Some(Self::LatestIndex),
            "single" => Some(Self::Single),
            "date" => Some(Self::Date),
            "monthly" => Some(Self::Monthly),
            "annual" => Some(Self::Annual),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IndexPointer => "index_pointer",
            Self::AppendingPointer => "appending_pointer",
            Self::AliasPointer => "alias_pointer",
            Self::LatestIndex => "latest_index",
            Self::Single => "single",
            Self::Date => "date",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Whether this kind materializes a true alias entity in the cluster.
    /// A `single` alias maps straight onto one index of the same name and
    /// is never created as an alias.
    #[must_use]
    pub const fn uses_alias(self) -> bool {
        !matches!(self, Self::Single)
    }
}

// ─── Per-kind configuration ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexPointerCfg {
    /// Exact index names the alias must reference.
    #[serde(default)]
    pub indexes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppendingPointerCfg {
    /// Upstream aliases to monitor for new indexes.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Optional slice applied when seeding membership on first link
    /// (e.g. `"-1"` = the newest watched index only).
    #[serde(default)]
    pub initial: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasPointerCfg {
    /// Upstream aliases whose indexes this alias mirrors.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Optional slice over the routing-descending index sequence.
    #[serde(default)]
    pub slice: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestIndexCfg {
    /// Upstream aliases; membership is always their single newest index.
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateCfg {
    /// Explicit index name → routing timestamp mapping.
    #[serde(default)]
    pub indexes: BTreeMap<String, RoutingKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarCfg {
    /// strftime pattern producing the period's index name
    /// (e.g. `"%Y%m"` → `201402`).
    pub index_name_pattern: String,
}

// ─── The strategy itself ────────────────────────────────────────────────────

/// A resolved strategy: kind plus typed configuration. Stateless; the
/// compiler constructs one per declared alias per compile.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    IndexPointer(IndexPointerCfg),
    AppendingPointer(AppendingPointerCfg),
    AliasPointer(AliasPointerCfg),
    LatestIndex(LatestIndexCfg),
    Single,
    Date(DateCfg),
    Monthly(CalendarCfg),
    Annual(CalendarCfg),
}

impl Strategy {
    /// Resolve a declared reference into a typed strategy. Unknown kinds and
    /// malformed configs are configuration errors naming the alias.
    pub fn resolve(reference: &StrategyRef, alias: &str) -> SchemaResult<Self> {
        let (kind_name, cfg) = reference.parts(alias)?;
        let kind = StrategyKind::from_name(kind_name).ok_or_else(|| {
            SchemaError::invalid_config(alias, format!("unknown strategy {kind_name:?}"))
        })?;
        let bad_cfg = |error: serde_json::Error| {
            SchemaError::invalid_config(alias, format!("bad {} config: {error}", kind.name()))
        };
        Ok(match kind {
            StrategyKind::IndexPointer => {
                Self::IndexPointer(serde_json::from_value(cfg).map_err(bad_cfg)?)
            }
            StrategyKind::AppendingPointer => {
                Self::AppendingPointer(serde_json::from_value(cfg).map_err(bad_cfg)?)
            }
            StrategyKind::AliasPointer => {
                Self::AliasPointer(serde_json::from_value(cfg).map_err(bad_cfg)?)
            }
            StrategyKind::LatestIndex => {
                Self::LatestIndex(serde_json::from_value(cfg).map_err(bad_cfg)?)
            }
            StrategyKind::Single => Self::Single,
            StrategyKind::Date => Self::Date(serde_json::from_value(cfg).map_err(bad_cfg)?),
            StrategyKind::Monthly => Self::Monthly(serde_json::from_value(cfg).map_err(bad_cfg)?),
            StrategyKind::Annual => Self::Annual(serde_json::from_value(cfg).map_err(bad_cfg)?),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::IndexPointer(_) => StrategyKind::IndexPointer,
            Self::AppendingPointer(_) => StrategyKind::AppendingPointer,
            Self::AliasPointer(_) => StrategyKind::AliasPointer,
            Self::LatestIndex(_) => StrategyKind::LatestIndex,
            Self::Single => StrategyKind::Single,
            Self::Date(_) => StrategyKind::Date,
            Self::Monthly(_) => StrategyKind::Monthly,
            Self::Annual(_) => StrategyKind::Annual,
        }
    }

    #[must_use]
    pub const fn uses_alias(&self) -> bool {
        self.kind().uses_alias()
    }

    /// Which indexes must be created for `alias`, given the current working
    /// schema. Returned records carry name, provenance, and routing; the
    /// compiler adds the alias's declared mappings/settings.
    pub fn create_indexes(
        &self,
        schema: &Schema,
        alias: &str,
        clock: &dyn Clock,
    ) -> SchemaResult<Vec<IndexRecord>> {
        match self {
            Self::IndexPointer(_)
            | Self::AppendingPointer(_)
            | Self::AliasPointer(_)
            | Self::LatestIndex(_) => Ok(Vec::new()),
            Self::Single => {
                if schema.has_index(alias) {
                    Ok(Vec::new())
                } else {
                    Ok(vec![IndexRecord::new(alias, alias)])
                }
            }
            Self::Date(cfg) => Ok(cfg
                .indexes
                .iter()
                .filter(|(name, _)| !schema.has_index(name))
                .map(|(name, routing)| IndexRecord::with_routing(name, alias, routing.clone()))
                .collect()),
            Self::Monthly(cfg) => {
                let period = next_month(clock.today());
                Ok(calendar_create(schema, alias, cfg, period))
            }
            Self::Annual(cfg) => {
                let period = next_year(clock.today());
                Ok(calendar_create(schema, alias, cfg, period))
            }
        }
    }

    /// The alias's new membership (ordered index names), computed after all
    /// of this compile's creates are present in `schema`. `created` holds
    /// the records created during the current compile, across all aliases.
    pub fn link_indexes(
        &self,
        schema: &Schema,
        alias: &AliasRecord,
        created: &[IndexRecord],
    ) -> SchemaResult<Vec<String>> {
        match self {
            Self::IndexPointer(cfg) => Ok(schema
                .indexes
                .iter()
                .filter(|index| cfg.indexes.contains(&index.name))
                .map(|index| index.name.clone())
                .collect()),
            Self::AppendingPointer(cfg) => {
                if alias.indexes.is_empty() {
                    // First link: seed from the watched aliases' current
                    // indexes, routing-descending, optionally sliced.
                    let filter =
                        IndexFilter::new(Some(&cfg.aliases), cfg.initial.as_deref(), &alias.name)?;
                    Ok(filter
                        .apply(&schema.indexes, &alias.name)?
                        .into_iter()
                        .map(|index| index.name)
                        .collect())
                } else {
                    let mut members = alias.indexes.clone();
                    for index in created {
                        let watched = index
                            .alias
                            .as_deref()
                            .is_some_and(|owner| cfg.aliases.iter().any(|a| a == owner));
                        if watched && !members.contains(&index.name) {
                            members.push(index.name.clone());
                        }
                    }
                    Ok(members)
                }
            }
            Self::AliasPointer(cfg) => {
                let filter =
                    IndexFilter::new(Some(&cfg.aliases), cfg.slice.as_deref(), &alias.name)?;
                Ok(filter
                    .apply(&schema.indexes, &alias.name)?
                    .into_iter()
                    .map(|index| index.name)
                    .collect())
            }
            Self::LatestIndex(cfg) => {
                let filter = IndexFilter::new(Some(&cfg.aliases), Some(":1"), &alias.name)?;
                Ok(filter
                    .apply(&schema.indexes, &alias.name)?
                    .into_iter()
                    .map(|index| index.name)
                    .collect())
            }
            Self::Single => Ok(Vec::new()),
            Self::Date(_) | Self::Monthly(_) | Self::Annual(_) => {
                // Keep existing membership, append our own newly created
                // indexes.
                let mut members = alias.indexes.clone();
                for index in created {
                    let ours = index.alias.as_deref() == Some(alias.name.as_str());
                    if ours && !members.contains(&index.name) {
                        members.push(index.name.clone());
                    }
                }
                Ok(members)
            }
        }
    }

    /// Build the query-time router for `alias` against the given schema.
    pub fn router(&self, schema: &Schema, alias: &AliasRecord) -> SchemaResult<Router> {
        match self {
            Self::IndexPointer(_) | Self::AppendingPointer(_) => Err(SchemaError::routing(
                alias.name.clone(),
                format!("{} aliases do not support routing", self.kind().name()),
            )),
            Self::Single => Ok(Router::Fixed {
                index: alias.name.clone(),
            }),
            Self::LatestIndex(_) => Ok(Router::Alias {
                alias: alias.name.clone(),
            }),
            Self::AliasPointer(_) | Self::Date(_) | Self::Monthly(_) | Self::Annual(_) => {
                let mut buckets = Vec::with_capacity(alias.indexes.len());
                for member in &alias.indexes {
                    let record = schema.index(member).ok_or_else(|| {
                        SchemaError::routing(
                            alias.name.clone(),
                            format!("member index {member} is not in the schema"),
                        )
                    })?;
                    let routing = record.routing.clone().ok_or_else(|| {
                        SchemaError::routing(
                            alias.name.clone(),
                            format!("member index {member} has no routing"),
                        )
                    })?;
                    buckets.push((routing, member.clone()));
                }
                if buckets.is_empty() {
                    return Err(SchemaError::routing(
                        alias.name.clone(),
                        "alias has no indexes",
                    ));
                }
                buckets.sort_by(|a, b| b.0.cmp(&a.0));
                Ok(Router::Range {
                    alias: alias.name.clone(),
                    buckets,
                })
            }
        }
    }
}

fn calendar_create(
    schema: &Schema,
    alias: &str,
    cfg: &CalendarCfg,
    period: chrono::NaiveDate,
) -> Vec<IndexRecord> {
    let name = period.format(&cfg.index_name_pattern).to_string();
    if schema.has_index(&name) {
        return Vec::new();
    }
    vec![IndexRecord::with_routing(
        name,
        alias,
        RoutingKey::from_date(period),
    )]
}

fn next_month(today: chrono::NaiveDate) -> chrono::NaiveDate {
    use chrono::Datelike;
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    chrono::NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is always valid")
}

fn next_year(today: chrono::NaiveDate) -> chrono::NaiveDate {
    use chrono::Datelike;
    chrono::NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
        .expect("January 1st is always valid")
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn alias_record(name: &str, members: &[&str]) -> AliasRecord {
        AliasRecord {
            name: name.to_owned(),
            strategy: StrategyRef::bare("index_pointer"),
            routing: None,
            filter: None,
            indexes: members.iter().map(|m| (*m).to_owned()).collect(),
        }
    }

    fn schema_with(indexes: Vec<IndexRecord>) -> Schema {
        Schema {
            indexes,
            ..Schema::default()
        }
    }

    #[test]
    fn bare_and_configured_references_resolve() {
        let bare = Strategy::resolve(&StrategyRef::bare("single"), "users").unwrap();
        assert_eq!(bare.kind(), StrategyKind::Single);

        let configured = Strategy::resolve(
            &StrategyRef::configured("index_pointer", json!({"indexes": ["a"]})),
            "all",
        )
        .unwrap();
        assert!(matches!(configured, Strategy::IndexPointer(ref cfg) if cfg.indexes == ["a"]));
    }

    #[test]
    fn unknown_strategy_is_a_config_error() {
        let err = Strategy::resolve(&StrategyRef::bare("weekly"), "events").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidConfig { .. }));
        assert!(err.to_string().contains("weekly"));
        assert!(err.to_string().contains("events"));
    }

    #[test]
    fn multi_entry_reference_is_rejected() {
        let mut map = BTreeMap::new();
        map.insert("date".to_owned(), json!({}));
        map.insert("monthly".to_owned(), json!({}));
        let err = Strategy::resolve(&StrategyRef::Configured(map), "events").unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[test]
    fn only_single_skips_the_alias_entity() {
        for name in [
            "index_pointer",
            "appending_pointer",
            "alias_pointer",
            "latest_index",
            "date",
            "monthly",
            "annual",
        ] {
            assert!(StrategyKind::from_name(name).unwrap().uses_alias(), "{name}");
        }
        assert!(!StrategyKind::Single.uses_alias());
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            StrategyKind::IndexPointer,
            StrategyKind::AppendingPointer,
            StrategyKind::AliasPointer,
            StrategyKind::LatestIndex,
            StrategyKind::Single,
            StrategyKind::Date,
            StrategyKind::Monthly,
            StrategyKind::Annual,
        ] {
            assert_eq!(StrategyKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn index_pointer_links_the_intersection() {
        let schema = schema_with(vec![
            IndexRecord::new("a", "something"),
            IndexRecord::new("b", "something"),
            IndexRecord::new("c", "something"),
        ]);
        let strategy = Strategy::IndexPointer(IndexPointerCfg {
            indexes: vec!["c".into(), "a".into(), "missing".into()],
        });
        let linked = strategy
            .link_indexes(&schema, &alias_record("all", &[]), &[])
            .unwrap();
        // Declaration order is irrelevant; schema order wins.
        assert_eq!(linked, ["a", "c"]);
    }

    #[test]
    fn appending_pointer_seeds_all_watched_indexes_on_first_link() {
        let schema = schema_with(vec![
            IndexRecord::with_routing("t1", "target", RoutingKey::Int(1)),
            IndexRecord::with_routing("t2", "target", RoutingKey::Int(2)),
            IndexRecord::with_routing("other", "elsewhere", RoutingKey::Int(3)),
        ]);
        let strategy = Strategy::AppendingPointer(AppendingPointerCfg {
            aliases: vec!["target".into()],
            initial: None,
        });
        let linked = strategy
            .link_indexes(&schema, &alias_record("follower", &[]), &[])
            .unwrap();
        assert_eq!(linked, ["t2", "t1"], "routing-descending seed");
    }

    #[test]
    fn appending_pointer_initial_slice_limits_the_seed() {
        let schema = schema_with(vec![
            IndexRecord::with_routing("t1", "target", RoutingKey::Int(1)),
            IndexRecord::with_routing("t2", "target", RoutingKey::Int(2)),
        ]);
        let strategy = Strategy::AppendingPointer(AppendingPointerCfg {
            aliases: vec!["target".into()],
            initial: Some("-1".into()),
        });
        let linked = strategy
            .link_indexes(&schema, &alias_record("follower", &[]), &[])
            .unwrap();
        assert_eq!(linked, ["t1"], "initial -1 keeps only the oldest");
    }

    #[test]
    fn appending_pointer_only_grows_after_seeding() {
        let schema = schema_with(vec![
            IndexRecord::new("t1", "target"),
            IndexRecord::new("t2", "target"),
            IndexRecord::new("t3", "target"),
        ]);
        let strategy = Strategy::AppendingPointer(AppendingPointerCfg {
            aliases: vec!["target".into()],
            initial: None,
        });
        let created = vec![IndexRecord::new("t3", "target"), IndexRecord::new("x", "other")];
        let linked = strategy
            .link_indexes(&schema, &alias_record("follower", &["t1", "t2"]), &created)
            .unwrap();
        assert_eq!(linked, ["t1", "t2", "t3"], "watched creates append, nothing is removed");
    }

    #[test]
    fn alias_pointer_recomputes_membership_each_time() {
        let schema = schema_with(vec![
            IndexRecord::with_routing("a1", "target", RoutingKey::Int(1)),
            IndexRecord::with_routing("a2", "target", RoutingKey::Int(2)),
        ]);
        let strategy = Strategy::AliasPointer(AliasPointerCfg {
            aliases: vec!["target".into()],
            slice: None,
        });
        // Stale membership is discarded, not merged.
        let linked = strategy
            .link_indexes(&schema, &alias_record("mirror", &["gone"]), &[])
            .unwrap();
        assert_eq!(linked, ["a2", "a1"]);
    }

    #[test]
    fn latest_index_links_only_the_newest() {
        let schema = schema_with(vec![
            IndexRecord::with_routing("a1", "target", RoutingKey::Int(1)),
            IndexRecord::with_routing("a2", "target", RoutingKey::Int(2)),
        ]);
        let strategy = Strategy::LatestIndex(LatestIndexCfg {
            aliases: vec!["target".into()],
        });
        let linked = strategy
            .link_indexes(&schema, &alias_record("current", &[]), &[])
            .unwrap();
        assert_eq!(linked, ["a2"]);
    }

    #[test]
    fn single_creates_its_index_exactly_once() {
        let strategy = Strategy::Single;
        let clock = FixedClock(date(2014, 1, 1));

        let created = strategy
            .create_indexes(&Schema::empty(), "users", &clock)
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "users");
        assert_eq!(created[0].alias.as_deref(), Some("users"));

        let schema = schema_with(created);
        assert!(strategy
            .create_indexes(&schema, "users", &clock)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn date_strategy_creates_missing_named_indexes() {
        let cfg: DateCfg = serde_json::from_value(json!({
            "indexes": {"201401": "2014-01-01", "201402": "2014-02-01"}
        }))
        .unwrap();
        let strategy = Strategy::Date(cfg);
        let clock = FixedClock(date(2014, 6, 1));

        let schema = schema_with(vec![IndexRecord::with_routing(
            "201401",
            "events",
            RoutingKey::from_date(date(2014, 1, 1)),
        )]);
        let created = strategy.create_indexes(&schema, "events", &clock).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "201402");
        assert_eq!(
            created[0].routing,
            Some(RoutingKey::from_date(date(2014, 2, 1)))
        );
    }

    #[test]
    fn monthly_strategy_creates_the_upcoming_month() {
        let strategy = Strategy::Monthly(CalendarCfg {
            index_name_pattern: "%Y%m".into(),
        });
        let created = strategy
            .create_indexes(&Schema::empty(), "events", &FixedClock(date(2014, 1, 1)))
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "201402");
        assert_eq!(
            created[0].routing,
            Some(RoutingKey::from_date(date(2014, 2, 1)))
        );
    }

    #[test]
    fn monthly_strategy_rolls_over_december() {
        let strategy = Strategy::Monthly(CalendarCfg {
            index_name_pattern: "%Y%m".into(),
        });
        let created = strategy
            .create_indexes(&Schema::empty(), "events", &FixedClock(date(2014, 12, 15)))
            .unwrap();
        assert_eq!(created[0].name, "201501");
    }

    #[test]
    fn annual_strategy_creates_next_year() {
        let strategy = Strategy::Annual(CalendarCfg {
            index_name_pattern: "%Y".into(),
        });
        let created = strategy
            .create_indexes(&Schema::empty(), "yearly", &FixedClock(date(2014, 3, 1)))
            .unwrap();
        assert_eq!(created[0].name, "2015");
        assert_eq!(
            created[0].routing,
            Some(RoutingKey::from_date(date(2015, 1, 1)))
        );
    }

    #[test]
    fn pointer_strategies_refuse_to_route() {
        let schema = Schema::empty();
        let alias = alias_record("all", &[]);
        for strategy in [
            Strategy::IndexPointer(IndexPointerCfg::default()),
            Strategy::AppendingPointer(AppendingPointerCfg::default()),
        ] {
            let err = strategy.router(&schema, &alias).unwrap_err();
            assert!(matches!(err, SchemaError::Routing { .. }));
        }
    }

    #[test]
    fn range_router_is_built_descending_whatever_the_member_order() {
        let schema = schema_with(vec![
            IndexRecord::with_routing("201401", "events", RoutingKey::from_date(date(2014, 1, 1))),
            IndexRecord::with_routing("201402", "events", RoutingKey::from_date(date(2014, 2, 1))),
        ]);
        let alias = alias_record("events", &["201401", "201402"]);
        let strategy = Strategy::Date(DateCfg::default());
        let router = strategy.router(&schema, &alias).unwrap();

        let key = RoutingKey::from_date(date(2014, 1, 15));
        assert_eq!(router.route(&key).unwrap(), "201401");
        let before_all = RoutingKey::from_date(date(2013, 12, 1));
        assert_eq!(router.route(&before_all).unwrap(), "201401");
        let newest = RoutingKey::from_date(date(2014, 2, 1));
        assert_eq!(router.route(&newest).unwrap(), "201402");
    }

    #[test]
    fn range_router_requires_routing_on_every_member() {
        let schema = schema_with(vec![IndexRecord::new("201401", "events")]);
        let alias = alias_record("events", &["201401"]);
        let err = Strategy::Date(DateCfg::default())
            .router(&schema, &alias)
            .unwrap_err();
        assert!(err.to_string().contains("no routing"));
    }

    #[test]
    fn single_router_is_fixed_on_the_alias_name() {
        let schema = schema_with(vec![IndexRecord::new("users", "users")]);
        let alias = alias_record("users", &[]);
        let router = Strategy::Single.router(&schema, &alias).unwrap();
        assert_eq!(
            router.route(&RoutingKey::Text("who cares".into())).unwrap(),
            "users"
        );
    }

    #[test]
    fn latest_index_router_answers_the_alias() {
        let schema = Schema::empty();
        let alias = alias_record("current", &[]);
        let router = Strategy::LatestIndex(LatestIndexCfg::default())
            .router(&schema, &alias)
            .unwrap();
        assert_eq!(router.route(&RoutingKey::Int(0)).unwrap(), "current");
    }
}
