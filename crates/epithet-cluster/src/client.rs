//! The capability interface epithet consumes from the search cluster.
//!
//! Everything the core needs (index/alias/template CRUD, settings, the
//! scroll-and-bulk copy primitives, and externally-versioned control-document
//! writes) is expressed on one dyn-safe async trait so the store, enforcer,
//! and reindexer are testable against [`crate::InMemoryCluster`] and run in
//! production against [`crate::EsCluster`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClusterResult;

/// A source document moving through scan/bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: String,
    pub source: Value,
}

/// A fetched document plus its external version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDoc {
    pub version: u64,
    pub source: Value,
}

/// One page of a scroll cursor. `docs` is empty once the cursor is
/// exhausted; `scroll_id` is `None` when the cursor cannot be continued.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPage {
    pub scroll_id: Option<String>,
    pub docs: Vec<RawDocument>,
}

/// Per-document outcome of a bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failures: Vec<BulkFailure>,
}

/// One failed document in a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

/// One action in a batched alias update. Adds and removes submitted in the
/// same batch are applied by the cluster as a single atomic swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AliasAction {
    Add {
        index: String,
        alias: String,
        routing: Option<Value>,
        filter: Option<Value>,
    },
    Remove {
        index: String,
        alias: String,
    },
}

/// The search-cluster collaborator.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn index_exists(&self, index: &str) -> ClusterResult<bool>;

    /// Create an index. Fails with an already-exists error if present;
    /// callers that want idempotent creation tolerate that variant.
    async fn create_index(
        &self,
        index: &str,
        settings: Option<&Value>,
        mappings: Option<&Value>,
    ) -> ClusterResult<()>;

    async fn delete_index(&self, index: &str) -> ClusterResult<()>;

    /// Merge a mapping for one document type into an existing index.
    async fn put_mapping(&self, index: &str, doc_type: &str, mapping: &Value)
        -> ClusterResult<()>;

    /// Upsert an index template (overwrite semantics).
    async fn put_template(&self, name: &str, body: &Value) -> ClusterResult<()>;

    /// Apply a settings document to a set of indexes.
    async fn put_settings(&self, indexes: &[String], settings: &Value) -> ClusterResult<()>;

    /// Live member indexes of an alias; empty if the alias does not exist.
    async fn get_alias_members(&self, alias: &str) -> ClusterResult<BTreeSet<String>>;

    /// Apply a batch of alias add/remove actions as one request.
    async fn update_aliases(&self, actions: &[AliasAction]) -> ClusterResult<()>;

    async fn get_doc(&self, index: &str, id: &str) -> ClusterResult<Option<VersionedDoc>>;

    /// Externally-versioned write: succeeds only when `version` is strictly
    /// greater than the stored version (any version wins on a fresh id).
    async fn index_doc(
        &self,
        index: &str,
        id: &str,
        source: &Value,
        version: u64,
    ) -> ClusterResult<()>;

    /// Create-only write: fails if the document already exists.
    async fn create_doc(&self, index: &str, id: &str, source: &Value) -> ClusterResult<()>;

    /// Make recent writes to `index` visible to reads.
    async fn refresh(&self, index: &str) -> ClusterResult<()>;

    /// Open a scan cursor over every document in `index`.
    async fn scan_start(&self, index: &str, page_size: usize) -> ClusterResult<ScrollPage>;

    /// Fetch the next page of an open cursor.
    async fn scan_next(&self, scroll_id: &str) -> ClusterResult<ScrollPage>;

    /// Bulk-write documents into `index`, reporting per-document failures.
    async fn bulk_index(&self, index: &str, docs: &[RawDocument]) -> ClusterResult<BulkReport>;

    /// Set or clear the advisory write block on an index.
    async fn set_write_block(&self, index: &str, blocked: bool) -> ClusterResult<()>;
}
