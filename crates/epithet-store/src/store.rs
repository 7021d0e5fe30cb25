//! The versioned schema store: single owner of the persisted control
//! document, with cached schema reads, lazily-built routers, and the
//! optimistic-concurrency write path.
//!
//! The control document lives at `id = "master"` in a dedicated control
//! index, written with an external-version precondition so exactly one
//! writer can advance each version. Every successful write also appends an
//! immutable copy at `id = <version>`, forming the history log.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use epithet_cluster::ClusterClient;
use epithet_core::{
    AliasConfig, CompileOutcome, IndexRecord, Router, RoutingKey, Schema, SchemaCompiler,
    SchemaError, SchemaResult, Strategy,
};

use crate::enforcer::{EnforceStats, SchemaEnforcer};

/// Document id of the mutable head record.
pub const CONTROL_DOC_ID: &str = "master";

/// Default name of the control index.
pub const DEFAULT_CONTROL_INDEX: &str = "epithet";

/// Version metadata for a loaded schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaMeta {
    pub version: u64,
}

/// What an `update` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The compiled schema was semantically identical; nothing was written.
    Unchanged,
    /// A new schema version was written.
    Applied { version: u64 },
}

/// Typed result of a best-effort enforcement pass. Failures are reported,
/// never propagated: enforcement runs against a live external system that
/// may be mid-change, and a scheduler loop calling it repeatedly must not
/// crash.
#[derive(Debug, Clone, PartialEq)]
pub enum EnforceStatus {
    Applied(EnforceStats),
    Failed { reason: String },
}

impl EnforceStatus {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// The schema manager.
pub struct SchemaStore {
    cluster: Arc<dyn ClusterClient>,
    control_index: String,
    compiler: SchemaCompiler,
    cached: Mutex<Option<(SchemaMeta, Schema)>>,
    routers: Mutex<HashMap<String, Router>>,
}

impl SchemaStore {
    /// A store on the default control index with the wall-clock compiler.
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self::with_options(cluster, DEFAULT_CONTROL_INDEX, SchemaCompiler::system())
    }

    /// Full constructor: custom control index name and compiler (tests pin
    /// the compiler's clock here).
    #[must_use]
    pub fn with_options(
        cluster: Arc<dyn ClusterClient>,
        control_index: impl Into<String>,
        compiler: SchemaCompiler,
    ) -> Self {
        Self {
            cluster,
            control_index: control_index.into(),
            compiler,
            cached: Mutex::new(None),
            routers: Mutex::new(HashMap::new()),
        }
    }

    /// The cached `(meta, schema)` pair, fetching from the control index
    /// when uncached or `force`d.
    pub async fn get_current_schema(&self, force: bool) -> SchemaResult<(SchemaMeta, Schema)> {
        if !force {
            if let Some(cached) = self.cached.lock().clone() {
                return Ok(cached);
            }
        }
        let doc = self
            .cluster
            .get_doc(&self.control_index, CONTROL_DOC_ID)
            .await
            .map_err(SchemaError::cluster)?
            .ok_or_else(|| SchemaError::ControlDocument {
                reason: format!(
                    "no control document in index {}; run update first",
                    self.control_index
                ),
            })?;
        let schema = Schema::from_control_document(&doc.source)?;
        let meta = SchemaMeta {
            version: doc.version,
        };
        *self.cached.lock() = Some((meta, schema.clone()));
        Ok((meta, schema))
    }

    /// Force a reload of the cached schema and drop cached routers.
    pub async fn reload(&self) -> SchemaResult<()> {
        self.routers.lock().clear();
        self.get_current_schema(true).await.map(|_| ())
    }

    /// Compile `config` against the current schema and write the result if
    /// it differs. Creates and seeds the control index on first use.
    pub async fn update(&self, config: &AliasConfig) -> SchemaResult<UpdateOutcome> {
        self.ensure_control_index().await?;
        let (meta, existing) = self.get_current_schema(true).await?;
        match self.compiler.compile(&existing, config)? {
            CompileOutcome::Unchanged => {
                tracing::debug!(
                    target: "epithet.store",
                    version = meta.version,
                    "declared config matches the stored schema, skipping write"
                );
                Ok(UpdateOutcome::Unchanged)
            }
            CompileOutcome::Changed(schema) => {
                let applied = self.apply(meta, schema).await?;
                Ok(UpdateOutcome::Applied {
                    version: applied.version,
                })
            }
        }
    }

    /// Write `schema` as the next version after `meta`, with the external
    /// version as the optimistic-concurrency precondition. Exactly one
    /// writer can win each version; losers get [`SchemaError::VersionConflict`]
    /// and must reload before retrying (no internal retry).
    pub async fn apply(&self, meta: SchemaMeta, schema: Schema) -> SchemaResult<SchemaMeta> {
        let next = meta.version + 1;
        let body = schema.to_control_document()?;

        match self
            .cluster
            .index_doc(&self.control_index, CONTROL_DOC_ID, &body, next)
            .await
        {
            Ok(()) => {}
            Err(error) if error.is_version_conflict() => {
                return Err(SchemaError::VersionConflict { attempted: next });
            }
            Err(error) => return Err(SchemaError::cluster(error)),
        }

        // Make the write immediately visible, then append the immutable
        // history record for this version.
        self.cluster
            .refresh(&self.control_index)
            .await
            .map_err(SchemaError::cluster)?;
        self.cluster
            .create_doc(&self.control_index, &next.to_string(), &body)
            .await
            .map_err(SchemaError::cluster)?;

        let applied = SchemaMeta { version: next };
        *self.cached.lock() = Some((applied, schema));
        // Cached routers closed over the previous schema.
        self.routers.lock().clear();

        tracing::info!(target: "epithet.store", version = next, "schema advanced");
        Ok(applied)
    }

    /// Direct structural edit: ensure `index_name` exists (optionally with
    /// routing) and is a member of `alias_name`, then write.
    ///
    /// This bypasses the compiler and strategy layer entirely, as an escape
    /// hatch. A later `update` recomputes membership from declared config
    /// and may undo what was added here.
    pub async fn add_index(
        &self,
        alias_name: &str,
        index_name: &str,
        routing: Option<RoutingKey>,
    ) -> SchemaResult<SchemaMeta> {
        let (meta, mut schema) = self.get_current_schema(true).await?;
        if schema.alias(alias_name).is_none() {
            return Err(SchemaError::invalid_config(
                alias_name,
                "alias is not in the schema",
            ));
        }
        if !schema.has_index(index_name) {
            let mut record = IndexRecord::new(index_name, alias_name);
            record.routing = routing;
            schema.indexes.push(record);
        }
        let alias = schema
            .alias_mut(alias_name)
            .expect("alias presence was checked above");
        if !alias.indexes.iter().any(|member| member == index_name) {
            alias.indexes.push(index_name.to_owned());
        }
        self.apply(meta, schema).await
    }

    /// Direct structural edit: drop `index_name` from every alias's
    /// membership and from the index set, then write. Same escape-hatch
    /// caveats as [`SchemaStore::add_index`].
    pub async fn remove_index(&self, index_name: &str) -> SchemaResult<SchemaMeta> {
        let (meta, mut schema) = self.get_current_schema(true).await?;
        for alias in &mut schema.aliases {
            alias.indexes.retain(|member| member != index_name);
        }
        schema.indexes.retain(|index| index.name != index_name);
        self.apply(meta, schema).await
    }

    /// The router for `alias_name`, cached until the next schema write.
    pub async fn get_router(&self, alias_name: &str) -> SchemaResult<Router> {
        if let Some(router) = self.routers.lock().get(alias_name) {
            return Ok(router.clone());
        }
        let (_, schema) = self.get_current_schema(false).await?;
        let alias = schema.alias(alias_name).ok_or_else(|| {
            SchemaError::routing(alias_name, "alias is not in the schema")
        })?;
        let strategy = Strategy::resolve(&alias.strategy, alias_name)?;
        let router = strategy.router(&schema, alias)?;
        self.routers
            .lock()
            .insert(alias_name.to_owned(), router.clone());
        Ok(router)
    }

    /// Resolve `key` against `alias_name`'s router.
    pub async fn route(&self, alias_name: &str, key: &RoutingKey) -> SchemaResult<String> {
        let router = self.get_router(alias_name).await?;
        Ok(router.route(key)?.to_owned())
    }

    /// Best-effort enforcement of the current schema against the cluster.
    /// Failures are logged and reported in the returned status, never
    /// propagated.
    pub async fn enforce(&self) -> EnforceStatus {
        match self.try_enforce().await {
            Ok(stats) => EnforceStatus::Applied(stats),
            Err(error) => {
                tracing::warn!(
                    target: "epithet.store",
                    error = %error,
                    "enforcement failed"
                );
                EnforceStatus::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }

    async fn try_enforce(&self) -> SchemaResult<EnforceStats> {
        let (_, schema) = self.get_current_schema(true).await?;
        SchemaEnforcer::new(Arc::clone(&self.cluster))
            .enforce(&schema)
            .await
    }

    /// Cut an alias set over from `source` to `<source>_new` after a copy:
    /// add the target (with the source's recorded routing and provenance)
    /// to every alias referencing the source, drop the source, verify the
    /// target's recorded fields match, then enforce.
    ///
    /// The two schema writes are sequential, not one transaction. If
    /// verification fails the control document keeps the mutation but
    /// enforcement is skipped: declared schema and live cluster diverge
    /// until someone intervenes, which is the intended halt-and-flag
    /// behavior.
    pub async fn reindex_cutover(&self, source: &str) -> SchemaResult<EnforceStatus> {
        let (meta, schema) = self.get_current_schema(true).await?;
        let source_record = schema.index(source).cloned().ok_or_else(|| {
            SchemaError::invalid_config(source, "index is not in the schema")
        })?;
        let referencing: Vec<String> = schema
            .aliases
            .iter()
            .filter(|alias| alias.indexes.iter().any(|member| member == source))
            .map(|alias| alias.name.clone())
            .collect();
        if referencing.is_empty() {
            return Err(SchemaError::invalid_config(
                source,
                "no alias references this index, nothing to cut over",
            ));
        }
        let target = format!("{source}_new");

        // First write: the target joins every alias the source is in.
        let mut next = schema.clone();
        if !next.has_index(&target) {
            let mut record = source_record.clone();
            record.name = target.clone();
            next.indexes.push(record);
        }
        for alias_name in &referencing {
            let alias = next
                .alias_mut(alias_name)
                .expect("referencing aliases come from this schema");
            if !alias.indexes.iter().any(|member| member == &target) {
                alias.indexes.push(target.clone());
            }
        }
        self.apply(meta, next).await?;

        // Second write: the source leaves the schema.
        self.remove_index(source).await?;

        // Verify the target's recorded fields before touching the cluster.
        let (_, schema) = self.get_current_schema(true).await?;
        let target_record = schema.index(&target).ok_or_else(|| SchemaError::ControlDocument {
            reason: format!("target index {target} missing after cutover writes"),
        })?;
        if target_record.routing != source_record.routing
            || target_record.alias != source_record.alias
        {
            tracing::error!(
                target: "epithet.store",
                source = %source,
                cutover_target = %target,
                "cutover verification failed, skipping enforcement"
            );
            return Err(SchemaError::CutoverVerification {
                source_index: source.to_owned(),
                target_index: target,
                reason: "recorded routing/alias fields do not match the source's".to_owned(),
            });
        }

        tracing::info!(
            target: "epithet.store",
            source = %source,
            cutover_target = %target,
            aliases = referencing.len(),
            "cutover verified, enforcing"
        );
        Ok(self.enforce().await)
    }

    async fn ensure_control_index(&self) -> SchemaResult<()> {
        if !self
            .cluster
            .index_exists(&self.control_index)
            .await
            .map_err(SchemaError::cluster)?
        {
            match self.cluster.create_index(&self.control_index, None, None).await {
                Ok(()) => {}
                Err(error) if error.is_already_exists() => {}
                Err(error) => return Err(SchemaError::cluster(error)),
            }
        }
        let seeded = self
            .cluster
            .get_doc(&self.control_index, CONTROL_DOC_ID)
            .await
            .map_err(SchemaError::cluster)?
            .is_some();
        if seeded {
            return Ok(());
        }
        // Seed version 0 with an empty schema. A racing writer seeding the
        // same version is convergence, not failure.
        let body = Schema::empty().to_control_document()?;
        match self
            .cluster
            .index_doc(&self.control_index, CONTROL_DOC_ID, &body, 0)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    target: "epithet.store",
                    control_index = %self.control_index,
                    "initialized control index at version 0"
                );
            }
            Err(error) if error.is_version_conflict() => {}
            Err(error) => return Err(SchemaError::cluster(error)),
        }
        self.cluster
            .refresh(&self.control_index)
            .await
            .map_err(SchemaError::cluster)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
