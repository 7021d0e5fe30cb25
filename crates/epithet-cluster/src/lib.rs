//! The search-cluster collaborator boundary for epithet.
//!
//! [`ClusterClient`] is the capability interface the store, enforcer, and
//! reindexer consume; [`InMemoryCluster`] is a faithful in-process double
//! used by the test suite; [`EsCluster`] is the Elasticsearch-backed
//! production client.

pub mod client;
pub mod error;
pub mod es;
pub mod memory;

pub use client::{
    AliasAction, BulkFailure, BulkReport, ClusterClient, RawDocument, ScrollPage, VersionedDoc,
};
pub use es::EsCluster;
pub use error::{ClusterError, ClusterResult};
pub use memory::InMemoryCluster;
