//! In-process cluster double with faithful semantics: externally-versioned
//! documents, alias sets, scroll cursors, write blocks, and recorded
//! alias-update batches.
//!
//! This is the substrate for the whole test suite; it also records every
//! alias-update batch and settings call so tests can assert on the exact
//! requests the enforcer issued.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::client::{
    AliasAction, BulkFailure, BulkReport, ClusterClient, RawDocument, ScrollPage, VersionedDoc,
};
use crate::error::{ClusterError, ClusterResult};

#[derive(Debug, Clone)]
struct StoredDoc {
    version: u64,
    source: Value,
}

#[derive(Debug, Default)]
struct IndexState {
    settings: Option<Value>,
    /// Mappings keyed by document type. Changing an existing type's mapping
    /// is reported as a merge conflict; adding a new type succeeds.
    mappings: BTreeMap<String, Value>,
    docs: BTreeMap<String, StoredDoc>,
    write_blocked: bool,
}

#[derive(Debug)]
struct ScrollState {
    snapshot: Vec<RawDocument>,
    position: usize,
    page_size: usize,
}

#[derive(Default)]
struct State {
    indexes: BTreeMap<String, IndexState>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    templates: BTreeMap<String, Value>,
    scrolls: BTreeMap<String, ScrollState>,
    next_scroll: u64,
    alias_batches: Vec<Vec<AliasAction>>,
    settings_calls: Vec<(Vec<String>, Value)>,
}

/// The in-memory cluster.
#[derive(Default)]
pub struct InMemoryCluster {
    state: Mutex<State>,
}

impl InMemoryCluster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Introspection for tests ────────────────────────────────────────────

    #[must_use]
    pub fn has_index(&self, index: &str) -> bool {
        self.state.lock().indexes.contains_key(index)
    }

    #[must_use]
    pub fn doc_count(&self, index: &str) -> usize {
        self.state
            .lock()
            .indexes
            .get(index)
            .map_or(0, |state| state.docs.len())
    }

    #[must_use]
    pub fn doc_source(&self, index: &str, id: &str) -> Option<Value> {
        self.state
            .lock()
            .indexes
            .get(index)
            .and_then(|state| state.docs.get(id))
            .map(|doc| doc.source.clone())
    }

    #[must_use]
    pub fn alias_members(&self, alias: &str) -> BTreeSet<String> {
        self.state.lock().aliases.get(alias).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn template(&self, name: &str) -> Option<Value> {
        self.state.lock().templates.get(name).cloned()
    }

    /// Every batch handed to `update_aliases`, in call order.
    #[must_use]
    pub fn alias_update_batches(&self) -> Vec<Vec<AliasAction>> {
        self.state.lock().alias_batches.clone()
    }

    /// Every `(indexes, settings)` pair handed to `put_settings`.
    #[must_use]
    pub fn settings_calls(&self) -> Vec<(Vec<String>, Value)> {
        self.state.lock().settings_calls.clone()
    }

    #[must_use]
    pub fn is_write_blocked(&self, index: &str) -> Option<bool> {
        self.state
            .lock()
            .indexes
            .get(index)
            .map(|state| state.write_blocked)
    }

    /// Seed documents directly, bypassing versioning. Test setup only.
    pub fn seed_docs(&self, index: &str, docs: &[(&str, Value)]) {
        let mut state = self.state.lock();
        let index_state = state.indexes.entry(index.to_owned()).or_default();
        for (id, source) in docs {
            index_state.docs.insert(
                (*id).to_owned(),
                StoredDoc {
                    version: 1,
                    source: source.clone(),
                },
            );
        }
    }

    fn store_mappings(index_state: &mut IndexState, mappings: &Value) {
        if let Some(by_type) = mappings.as_object() {
            for (doc_type, mapping) in by_type {
                index_state
                    .mappings
                    .insert(doc_type.clone(), mapping.clone());
            }
        }
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn index_exists(&self, index: &str) -> ClusterResult<bool> {
        Ok(self.state.lock().indexes.contains_key(index))
    }

    async fn create_index(
        &self,
        index: &str,
        settings: Option<&Value>,
        mappings: Option<&Value>,
    ) -> ClusterResult<()> {
        let mut state = self.state.lock();
        if state.indexes.contains_key(index) {
            return Err(ClusterError::IndexAlreadyExists {
                index: index.to_owned(),
            });
        }
        let mut index_state = IndexState {
            settings: settings.cloned(),
            ..IndexState::default()
        };
        if let Some(mappings) = mappings {
            Self::store_mappings(&mut index_state, mappings);
        }
        state.indexes.insert(index.to_owned(), index_state);
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> ClusterResult<()> {
        let mut state = self.state.lock();
        if state.indexes.remove(index).is_none() {
            return Err(ClusterError::IndexNotFound {
                index: index.to_owned(),
            });
        }
        for members in state.aliases.values_mut() {
            members.remove(index);
        }
        state.aliases.retain(|_, members| !members.is_empty());
        Ok(())
    }

    async fn put_mapping(
        &self,
        index: &str,
        doc_type: &str,
        mapping: &Value,
    ) -> ClusterResult<()> {
        let mut state = self.state.lock();
        let index_state =
            state
                .indexes
                .get_mut(index)
                .ok_or_else(|| ClusterError::IndexNotFound {
                    index: index.to_owned(),
                })?;
        match index_state.mappings.get(doc_type) {
            Some(existing) if existing != mapping => Err(ClusterError::MappingConflict {
                index: index.to_owned(),
                reason: format!("cannot merge changed mapping for type {doc_type}"),
            }),
            _ => {
                index_state
                    .mappings
                    .insert(doc_type.to_owned(), mapping.clone());
                Ok(())
            }
        }
    }

    async fn put_template(&self, name: &str, body: &Value) -> ClusterResult<()> {
        self.state
            .lock()
            .templates
            .insert(name.to_owned(), body.clone());
        Ok(())
    }

    async fn put_settings(&self, indexes: &[String], settings: &Value) -> ClusterResult<()> {
        let mut state = self.state.lock();
        for index in indexes {
            let index_state =
                state
                    .indexes
                    .get_mut(index)
                    .ok_or_else(|| ClusterError::IndexNotFound {
                        index: index.clone(),
                    })?;
            index_state.settings = Some(settings.clone());
        }
        state
            .settings_calls
            .push((indexes.to_vec(), settings.clone()));
        Ok(())
    }

    async fn get_alias_members(&self, alias: &str) -> ClusterResult<BTreeSet<String>> {
        Ok(self.alias_members(alias))
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> ClusterResult<()> {
        let mut state = self.state.lock();
        // Validate the whole batch before applying any of it.
        for action in actions {
            let index = match action {
                AliasAction::Add { index, .. } | AliasAction::Remove { index, .. } => index,
            };
            if !state.indexes.contains_key(index) {
                return Err(ClusterError::IndexNotFound {
                    index: index.clone(),
                });
            }
        }
        for action in actions {
            match action {
                AliasAction::Add { index, alias, .. } => {
                    state
                        .aliases
                        .entry(alias.clone())
                        .or_default()
                        .insert(index.clone());
                }
                AliasAction::Remove { index, alias } => {
                    if let Some(members) = state.aliases.get_mut(alias) {
                        members.remove(index);
                    }
                }
            }
        }
        state.aliases.retain(|_, members| !members.is_empty());
        state.alias_batches.push(actions.to_vec());
        Ok(())
    }

    async fn get_doc(&self, index: &str, id: &str) -> ClusterResult<Option<VersionedDoc>> {
        Ok(self
            .state
            .lock()
            .indexes
            .get(index)
            .and_then(|state| state.docs.get(id))
            .map(|doc| VersionedDoc {
                version: doc.version,
                source: doc.source.clone(),
            }))
    }

    async fn index_doc(
        &self,
        index: &str,
        id: &str,
        source: &Value,
        version: u64,
    ) -> ClusterResult<()> {
        let mut state = self.state.lock();
        let index_state = state.indexes.entry(index.to_owned()).or_default();
        if let Some(existing) = index_state.docs.get(id) {
            if version <= existing.version {
                return Err(ClusterError::VersionConflict {
                    index: index.to_owned(),
                    id: id.to_owned(),
                    attempted: version,
                });
            }
        }
        index_state.docs.insert(
            id.to_owned(),
            StoredDoc {
                version,
                source: source.clone(),
            },
        );
        Ok(())
    }

    async fn create_doc(&self, index: &str, id: &str, source: &Value) -> ClusterResult<()> {
        let mut state = self.state.lock();
        let index_state = state.indexes.entry(index.to_owned()).or_default();
        if index_state.docs.contains_key(id) {
            return Err(ClusterError::DocumentAlreadyExists {
                index: index.to_owned(),
                id: id.to_owned(),
            });
        }
        index_state.docs.insert(
            id.to_owned(),
            StoredDoc {
                version: 1,
                source: source.clone(),
            },
        );
        Ok(())
    }

    async fn refresh(&self, index: &str) -> ClusterResult<()> {
        if !self.state.lock().indexes.contains_key(index) {
            return Err(ClusterError::IndexNotFound {
                index: index.to_owned(),
            });
        }
        Ok(())
    }

    async fn scan_start(&self, index: &str, page_size: usize) -> ClusterResult<ScrollPage> {
        let mut state = self.state.lock();
        let snapshot: Vec<RawDocument> = state
            .indexes
            .get(index)
            .ok_or_else(|| ClusterError::IndexNotFound {
                index: index.to_owned(),
            })?
            .docs
            .iter()
            .map(|(id, doc)| RawDocument {
                id: id.clone(),
                source: doc.source.clone(),
            })
            .collect();

        state.next_scroll += 1;
        let scroll_id = format!("scroll-{}", state.next_scroll);
        let mut cursor = ScrollState {
            snapshot,
            position: 0,
            page_size: page_size.max(1),
        };
        let page = advance(&scroll_id, &mut cursor);
        if !page.docs.is_empty() {
            state.scrolls.insert(scroll_id, cursor);
        }
        Ok(page)
    }

    async fn scan_next(&self, scroll_id: &str) -> ClusterResult<ScrollPage> {
        let mut state = self.state.lock();
        let Some(cursor) = state.scrolls.get_mut(scroll_id) else {
            return Err(ClusterError::UnknownScroll {
                scroll_id: scroll_id.to_owned(),
            });
        };
        let page = advance(scroll_id, cursor);
        if page.docs.is_empty() {
            state.scrolls.remove(scroll_id);
        }
        Ok(page)
    }

    async fn bulk_index(&self, index: &str, docs: &[RawDocument]) -> ClusterResult<BulkReport> {
        let mut state = self.state.lock();
        let index_state = state.indexes.entry(index.to_owned()).or_default();
        let mut report = BulkReport::default();
        for doc in docs {
            if index_state.write_blocked {
                report.failures.push(BulkFailure {
                    id: doc.id.clone(),
                    reason: format!("index {index} is write-blocked"),
                });
                continue;
            }
            let version = index_state
                .docs
                .get(&doc.id)
                .map_or(1, |existing| existing.version + 1);
            index_state.docs.insert(
                doc.id.clone(),
                StoredDoc {
                    version,
                    source: doc.source.clone(),
                },
            );
            report.succeeded += 1;
        }
        Ok(report)
    }

    async fn set_write_block(&self, index: &str, blocked: bool) -> ClusterResult<()> {
        let mut state = self.state.lock();
        let index_state =
            state
                .indexes
                .get_mut(index)
                .ok_or_else(|| ClusterError::IndexNotFound {
                    index: index.to_owned(),
                })?;
        index_state.write_blocked = blocked;
        Ok(())
    }
}

fn advance(scroll_id: &str, cursor: &mut ScrollState) -> ScrollPage {
    let remaining = cursor.snapshot.len() - cursor.position;
    let take = remaining.min(cursor.page_size);
    let docs = cursor.snapshot[cursor.position..cursor.position + take].to_vec();
    cursor.position += take;
    ScrollPage {
        scroll_id: Some(scroll_id.to_owned()),
        docs,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
