//! Stateful side of epithet: the versioned schema store, the cluster
//! enforcer, and the reindex/cutover driver.

pub mod enforcer;
pub mod reindex;
pub mod store;

pub use enforcer::{EnforceStats, SchemaEnforcer};
pub use reindex::{CopyReport, Reindexer, DEFAULT_PAGE_SIZE};
pub use store::{
    EnforceStatus, SchemaMeta, SchemaStore, UpdateOutcome, CONTROL_DOC_ID, DEFAULT_CONTROL_INDEX,
};
