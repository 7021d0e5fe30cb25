//! Drive the external cluster to match a compiled schema.
//!
//! Enforcement is idempotent and convergence-tolerant: indexes that already
//! exist are fine, mapping merges the cluster refuses are logged and
//! skipped, and alias membership is synced by submitting only the delta
//! between live and declared state. All adds and removes for one alias
//! travel in a single batched request, which is what makes a cutover atomic
//! from the cluster's perspective.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use epithet_cluster::{AliasAction, ClusterClient};
use epithet_core::{AliasRecord, IndexRecord, Schema, SchemaError, SchemaResult};

/// What one enforcement pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforceStats {
    pub templates_put: usize,
    pub indexes_created: usize,
    pub alias_updates: usize,
    pub settings_applied: usize,
}

/// The enforcer. Stateless apart from its cluster handle.
pub struct SchemaEnforcer {
    cluster: Arc<dyn ClusterClient>,
}

impl SchemaEnforcer {
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    /// Push `schema` to the cluster: templates, indexes, alias membership
    /// deltas, settings groups. Mutates nothing locally.
    pub async fn enforce(&self, schema: &Schema) -> SchemaResult<EnforceStats> {
        let mut stats = EnforceStats::default();

        for (name, body) in &schema.templates {
            self.cluster
                .put_template(name, body)
                .await
                .map_err(SchemaError::cluster)?;
            stats.templates_put += 1;
        }

        for index in &schema.indexes {
            if self.ensure_index(index).await? {
                stats.indexes_created += 1;
            }
        }

        for alias in &schema.aliases {
            if self.sync_alias(alias).await? {
                stats.alias_updates += 1;
            }
        }

        for entry in &schema.settings {
            if entry.indexes.is_empty() {
                continue;
            }
            self.cluster
                .put_settings(&entry.indexes, &entry.settings)
                .await
                .map_err(SchemaError::cluster)?;
            stats.settings_applied += 1;
        }

        tracing::info!(
            target: "epithet.enforcer",
            templates = stats.templates_put,
            indexes_created = stats.indexes_created,
            alias_updates = stats.alias_updates,
            settings = stats.settings_applied,
            "enforcement pass complete"
        );
        Ok(stats)
    }

    /// Create an index, tolerating a pre-existing one. Returns whether a new
    /// index was actually created.
    async fn ensure_index(&self, index: &IndexRecord) -> SchemaResult<bool> {
        match self
            .cluster
            .create_index(&index.name, index.settings.as_ref(), index.mappings.as_ref())
            .await
        {
            Ok(()) => {
                tracing::info!(target: "epithet.enforcer", index = %index.name, "created index");
                Ok(true)
            }
            Err(error) if error.is_already_exists() => {
                self.merge_mappings(index).await?;
                Ok(false)
            }
            Err(error) => Err(SchemaError::cluster(error)),
        }
    }

    /// Merge-apply the declared mappings per document type onto an existing
    /// index. A merge the cluster refuses is logged, not fatal.
    async fn merge_mappings(&self, index: &IndexRecord) -> SchemaResult<()> {
        let Some(by_type) = index.mappings.as_ref().and_then(Value::as_object) else {
            return Ok(());
        };
        for (doc_type, mapping) in by_type {
            match self.cluster.put_mapping(&index.name, doc_type, mapping).await {
                Ok(()) => {}
                Err(error) if error.is_mapping_conflict() => {
                    tracing::warn!(
                        target: "epithet.enforcer",
                        index = %index.name,
                        doc_type = %doc_type,
                        error = %error,
                        "mapping merge refused, keeping the live mapping"
                    );
                }
                Err(error) => return Err(SchemaError::cluster(error)),
            }
        }
        Ok(())
    }

    /// Sync one alias's live membership to the declared membership. Returns
    /// whether an update was issued (no call at all when already in sync).
    async fn sync_alias(&self, alias: &AliasRecord) -> SchemaResult<bool> {
        let live = self
            .cluster
            .get_alias_members(&alias.name)
            .await
            .map_err(SchemaError::cluster)?;
        let desired: BTreeSet<&str> = alias.indexes.iter().map(String::as_str).collect();

        let mut actions = Vec::new();
        for member in &alias.indexes {
            if !live.contains(member.as_str()) {
                actions.push(AliasAction::Add {
                    index: member.clone(),
                    alias: alias.name.clone(),
                    routing: alias.routing.clone(),
                    filter: alias.filter.clone(),
                });
            }
        }
        for member in &live {
            if !desired.contains(member.as_str()) {
                actions.push(AliasAction::Remove {
                    index: member.clone(),
                    alias: alias.name.clone(),
                });
            }
        }

        if actions.is_empty() {
            return Ok(false);
        }
        tracing::info!(
            target: "epithet.enforcer",
            alias = %alias.name,
            actions = actions.len(),
            "syncing alias membership"
        );
        self.cluster
            .update_aliases(&actions)
            .await
            .map_err(SchemaError::cluster)?;
        Ok(true)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
