//! The schema compiler: diff a declared configuration against the stored
//! schema and produce a full replacement schema, or report that nothing
//! semantically changed.
//!
//! Compilation is pure and synchronous. The working schema is a copy of the
//! existing one; nothing the caller handed in is mutated. The compile runs
//! in two explicit phases: the create pass must fully complete before the
//! link pass, because later-declared aliases may reference indexes created
//! by earlier ones in the same compile.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::AliasConfig;
use crate::error::{SchemaError, SchemaResult};
use crate::filter::IndexFilter;
use crate::schema::{AliasRecord, IndexRecord, Schema, SettingsEntry};
use crate::strategy::Strategy;

/// Result of a compile: either nothing semantically changed (callers must
/// not write), or the full replacement schema.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutcome {
    Unchanged,
    Changed(Schema),
}

impl CompileOutcome {
    #[must_use]
    pub const fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    /// The new schema, if one was produced.
    #[must_use]
    pub fn into_schema(self) -> Option<Schema> {
        match self {
            Self::Unchanged => None,
            Self::Changed(schema) => Some(schema),
        }
    }
}

/// Compiles declared configuration into schema documents. Owns the time
/// source handed to the calendar strategies.
#[derive(Clone)]
pub struct SchemaCompiler {
    clock: Arc<dyn Clock>,
}

impl SchemaCompiler {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// A compiler on the wall clock.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Compile `config` against `existing`. Dirty detection is by value
    /// equality of the affected substructures; a compile that reproduces the
    /// existing schema returns [`CompileOutcome::Unchanged`].
    pub fn compile(
        &self,
        existing: &Schema,
        config: &AliasConfig,
    ) -> SchemaResult<CompileOutcome> {
        let mut schema = existing.clone();
        let mut dirty = false;

        // Merge declared templates over the stored ones, overwrite by name.
        for (name, body) in &config.templates {
            if schema.templates.get(name) != Some(body) {
                schema.templates.insert(name.clone(), body.clone());
                dirty = true;
            }
        }

        let mut created_this_compile: Vec<IndexRecord> = Vec::new();
        let mut link_queue: Vec<(String, Strategy)> = Vec::new();

        // Phase 1: alias records and index creation, in declaration order.
        for decl in &config.aliases {
            let strategy = Strategy::resolve(&decl.strategy, &decl.name)?;

            if strategy.uses_alias() {
                let existing_position = schema
                    .aliases
                    .iter()
                    .position(|alias| alias.name == decl.name);
                match existing_position {
                    Some(position) => {
                        let alias = &mut schema.aliases[position];
                        if alias.filter != decl.filter || alias.routing != decl.routing {
                            dirty = true;
                        }
                        // Merge compiled fields onto the existing record so
                        // membership bookkeeping survives.
                        alias.strategy = decl.strategy.clone();
                        alias.routing = decl.routing.clone();
                        alias.filter = decl.filter.clone();
                    }
                    None => {
                        dirty = true;
                        schema.aliases.push(AliasRecord {
                            name: decl.name.clone(),
                            strategy: decl.strategy.clone(),
                            routing: decl.routing.clone(),
                            filter: decl.filter.clone(),
                            indexes: Vec::new(),
                        });
                    }
                }
            }

            for mut record in strategy.create_indexes(&schema, &decl.name, self.clock.as_ref())? {
                record.mappings = decl.mappings.clone();
                record.settings = decl.settings.clone();
                tracing::debug!(
                    target: "epithet.compiler",
                    index = %record.name,
                    alias = %decl.name,
                    "compile creates index"
                );
                created_this_compile.push(record.clone());
                schema.indexes.push(record);
                dirty = true;
            }

            if strategy.uses_alias() {
                link_queue.push((decl.name.clone(), strategy));
            }
        }

        // Phase 2: relink every queued alias now that all creates are known.
        for (alias_name, strategy) in &link_queue {
            let snapshot = schema
                .alias(alias_name)
                .cloned()
                .expect("queued aliases were added to the working schema in phase 1");
            let linked = strategy.link_indexes(&schema, &snapshot, &created_this_compile)?;
            if linked.is_empty() {
                return Err(SchemaError::invalid_config(
                    alias_name.clone(),
                    "alias has no indexes",
                ));
            }

            let before: BTreeSet<&str> = snapshot.indexes.iter().map(String::as_str).collect();
            let after: BTreeSet<&str> = linked.iter().map(String::as_str).collect();
            if before != after {
                dirty = true;
            }
            schema
                .alias_mut(alias_name)
                .expect("queued aliases were added to the working schema in phase 1")
                .indexes = linked;
        }

        // Resolve declared settings groups against the final index set.
        let mut computed = Vec::with_capacity(config.settings.len());
        for (position, decl) in config.settings.iter().enumerate() {
            let context = format!("settings[{position}]");
            let filter =
                IndexFilter::new(decl.aliases.as_deref(), decl.slice.as_deref(), &context)?;
            let targets = filter.apply(&schema.indexes, &context)?;
            computed.push(SettingsEntry {
                indexes: targets.into_iter().map(|index| index.name).collect(),
                settings: decl.settings.clone(),
            });
        }
        if computed != schema.settings {
            dirty = true;
        }
        schema.settings = computed;

        if dirty {
            Ok(CompileOutcome::Changed(schema))
        } else {
            tracing::debug!(target: "epithet.compiler", "compile produced no change");
            Ok(CompileOutcome::Unchanged)
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
