//! End-to-end lifecycle against the in-memory cluster: declare → update →
//! enforce → copy → cutover, plus the halt-and-flag verification path.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;

use epithet_cluster::{ClusterClient, InMemoryCluster};
use epithet_core::{AliasConfig, FixedClock, RoutingKey, SchemaCompiler, SchemaError};
use epithet_store::{EnforceStatus, Reindexer, SchemaStore, UpdateOutcome};

fn store_on(cluster: &Arc<InMemoryCluster>) -> SchemaStore {
    let clock = FixedClock(NaiveDate::from_ymd_opt(2014, 6, 1).unwrap());
    SchemaStore::with_options(
        Arc::clone(cluster) as Arc<dyn ClusterClient>,
        "control",
        SchemaCompiler::new(Arc::new(clock)),
    )
}

fn events_config() -> AliasConfig {
    serde_json::from_value(json!({
        "aliases": [
            {"name": "events", "strategy": {"date": {"indexes": {
                "201401": "2014-01-01",
                "201402": "2014-02-01"
            }}}},
            {"name": "events_all", "strategy": {"appending_pointer": {"aliases": ["events"]}}}
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn declare_update_enforce_route() {
    let cluster = Arc::new(InMemoryCluster::new());
    let store = store_on(&cluster);

    let outcome = store.update(&events_config()).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied { version: 1 });
    assert_eq!(
        store.update(&events_config()).await.unwrap(),
        UpdateOutcome::Unchanged
    );

    let status = store.enforce().await;
    assert!(status.is_applied(), "enforcement should succeed: {status:?}");
    assert!(cluster.has_index("201401"));
    assert!(cluster.has_index("201402"));
    assert!(cluster.alias_members("events").contains("201401"));
    assert!(cluster.alias_members("events").contains("201402"));
    assert!(cluster.alias_members("events_all").contains("201401"));

    // Routing reads go through the store's cached router.
    assert_eq!(
        store
            .route("events", &RoutingKey::parse("2014-01-20"))
            .await
            .unwrap(),
        "201401"
    );
    assert_eq!(
        store
            .route("events", &RoutingKey::parse("2014-02-02"))
            .await
            .unwrap(),
        "201402"
    );
}

#[tokio::test]
async fn copy_then_cutover_repoints_every_alias() {
    let cluster = Arc::new(InMemoryCluster::new());
    let store = store_on(&cluster);

    store.update(&events_config()).await.unwrap();
    assert!(store.enforce().await.is_applied());

    // Some documents live in the index being retired.
    cluster.seed_docs(
        "201401",
        &[
            ("1", json!({"event": "signup"})),
            ("2", json!({"event": "login"})),
            ("3", json!({"event": "logout"})),
        ],
    );

    let reindexer =
        Reindexer::new(Arc::clone(&cluster) as Arc<dyn ClusterClient>).with_page_size(2);
    let report = reindexer
        .reindex("201401", "201401_new", Duration::from_millis(0))
        .await
        .unwrap();
    assert_eq!(report.docs_copied, 3);
    assert!(report.is_clean());
    assert_eq!(cluster.doc_count("201401_new"), 3);
    assert_eq!(cluster.is_write_blocked("201401"), Some(false));

    let status = store.reindex_cutover("201401").await.unwrap();
    assert!(status.is_applied(), "cutover enforcement failed: {status:?}");

    // Every alias that referenced the source now references the target and
    // no longer the source, both in the schema and live in the cluster.
    let (_, schema) = store.get_current_schema(true).await.unwrap();
    assert!(!schema.has_index("201401"));
    let target = schema.index("201401_new").unwrap();
    assert_eq!(target.alias.as_deref(), Some("events"));
    assert_eq!(target.routing, Some(RoutingKey::parse("2014-01-01")));
    for alias in ["events", "events_all"] {
        let members = &schema.alias(alias).unwrap().indexes;
        assert!(members.contains(&"201401_new".to_owned()), "{alias}: {members:?}");
        assert!(!members.contains(&"201401".to_owned()), "{alias}: {members:?}");

        let live = cluster.alias_members(alias);
        assert!(live.contains("201401_new"), "{alias} live: {live:?}");
        assert!(!live.contains("201401"), "{alias} live: {live:?}");
    }

    // Routing now lands on the replacement index.
    assert_eq!(
        store
            .route("events", &RoutingKey::parse("2014-01-20"))
            .await
            .unwrap(),
        "201401_new"
    );
}

#[tokio::test]
async fn cutover_verification_mismatch_halts_before_enforcement() {
    let cluster = Arc::new(InMemoryCluster::new());
    let store = store_on(&cluster);

    // The target name is already taken by an index with different routing:
    // verification must refuse to proceed.
    let config: AliasConfig = serde_json::from_value(json!({
        "aliases": [
            {"name": "events", "strategy": {"date": {"indexes": {
                "201401": "2014-01-01",
                "201401_new": "2014-06-01"
            }}}}
        ]
    }))
    .unwrap();
    store.update(&config).await.unwrap();

    let err = store.reindex_cutover("201401").await.unwrap_err();
    assert!(matches!(err, SchemaError::CutoverVerification { .. }));
    assert!(err.to_string().contains("201401_new"));

    // Enforcement was skipped: nothing was pushed to the cluster.
    assert!(cluster.alias_update_batches().is_empty());

    // Halt-and-flag: the control document keeps the mutation (source
    // removed) rather than rolling back.
    let (_, schema) = store.get_current_schema(true).await.unwrap();
    assert!(!schema.has_index("201401"));
    assert!(schema.has_index("201401_new"));
}

#[tokio::test]
async fn cutover_of_an_unreferenced_index_is_refused() {
    let cluster = Arc::new(InMemoryCluster::new());
    let store = store_on(&cluster);

    let config: AliasConfig = serde_json::from_value(json!({
        "aliases": [
            {"name": "events", "strategy": {"date": {"indexes": {"201401": "2014-01-01"}}}},
            {"name": "loose", "strategy": "single"}
        ]
    }))
    .unwrap();
    store.update(&config).await.unwrap();

    // `loose` exists as an index but no alias references it.
    let err = store.reindex_cutover("loose").await.unwrap_err();
    assert!(matches!(err, SchemaError::InvalidConfig { .. }));
    assert!(err.to_string().contains("nothing to cut over"));
}

#[tokio::test]
async fn two_stores_racing_on_update_produce_one_winner() {
    let cluster = Arc::new(InMemoryCluster::new());
    let store_a = store_on(&cluster);
    let store_b = store_on(&cluster);

    store_a.update(&events_config()).await.unwrap();

    // Both stores load version 1, then both try to write version 2 through
    // direct patches; the second write must observe the conflict.
    let (meta_a, schema_a) = store_a.get_current_schema(true).await.unwrap();
    let (meta_b, schema_b) = store_b.get_current_schema(true).await.unwrap();
    store_a.apply(meta_a, schema_a).await.unwrap();
    let err = store_b.apply(meta_b, schema_b).await.unwrap_err();
    assert!(matches!(err, SchemaError::VersionConflict { .. }));

    // The loser reloads and succeeds on the next version.
    let (meta_b, schema_b) = store_b.get_current_schema(true).await.unwrap();
    assert_eq!(meta_b.version, 2);
    store_b.apply(meta_b, schema_b).await.unwrap();

    // History: one immutable record per version, no gaps.
    for version in 1..=3u64 {
        assert!(
            cluster
                .get_doc("control", &version.to_string())
                .await
                .unwrap()
                .is_some(),
            "history record {version} missing"
        );
    }
}
