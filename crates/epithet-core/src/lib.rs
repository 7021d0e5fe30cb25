//! Core types and pure logic for the epithet alias-management pipeline.
//!
//! This crate defines the persisted schema model ([`Schema`], [`IndexRecord`],
//! [`AliasRecord`]), the declared configuration ([`AliasConfig`]), the
//! routing-strategy framework ([`Strategy`], [`Router`]), the shared index
//! filter, and the schema compiler ([`SchemaCompiler`]) that diffs declared
//! configuration against a stored schema.
//!
//! Everything here is synchronous and side-effect free; cluster I/O lives in
//! `epithet-cluster` and the stateful manager in `epithet-store`.

pub mod clock;
pub mod compiler;
pub mod config;
pub mod error;
pub mod filter;
pub mod router;
pub mod schema;
pub mod strategy;

pub use clock::{Clock, FixedClock, SystemClock};
pub use compiler::{CompileOutcome, SchemaCompiler};
pub use config::{AliasConfig, AliasDecl, SettingsDecl};
pub use error::{SchemaError, SchemaResult};
pub use filter::{IndexFilter, SliceExpr};
pub use router::Router;
pub use schema::{
    AliasRecord, IndexRecord, RoutingKey, Schema, SettingsEntry, EMBEDDED_SCHEMA_FIELD,
};
pub use strategy::{Strategy, StrategyKind, StrategyRef};
