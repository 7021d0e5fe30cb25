//! Production [`ClusterClient`] over the official `elasticsearch` crate.
//!
//! Single-node connection pool with a configurable request timeout. API
//! failures are classified by status code and the well-known exception names
//! Elasticsearch puts in error bodies (`resource_already_exists_exception`,
//! `index_not_found_exception`, version conflicts), so the tolerant call
//! sites in the enforcer and reindexer can branch on typed errors.
//!
//! Modern Elasticsearch has no document types; `put_mapping` sends the
//! per-type mapping body as the index mapping and ignores the type name at
//! the wire level.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetAliasParts,
    IndicesPutMappingParts, IndicesPutSettingsParts, IndicesPutTemplateParts, IndicesRefreshParts,
};
use elasticsearch::params::VersionType;
use elasticsearch::{BulkParts, CreateParts, Elasticsearch, GetParts, IndexParts, ScrollParts, SearchParts};
use serde_json::{json, Value};

use crate::client::{
    AliasAction, BulkFailure, BulkReport, ClusterClient, RawDocument, ScrollPage, VersionedDoc,
};
use crate::error::{ClusterError, ClusterResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const SCROLL_KEEPALIVE: &str = "5m";

/// Elasticsearch-backed cluster client.
#[derive(Debug)]
pub struct EsCluster {
    client: Elasticsearch,
}

impl EsCluster {
    /// Connect to a single node, e.g. `http://localhost:9200`.
    pub fn connect(host: &str) -> ClusterResult<Self> {
        Self::connect_with_timeout(host, DEFAULT_TIMEOUT)
    }

    /// Connect with an explicit request timeout.
    pub fn connect_with_timeout(host: &str, timeout: Duration) -> ClusterResult<Self> {
        let url: elasticsearch::http::Url = host
            .parse()
            .map_err(|error| ClusterError::request(format!("invalid host url {host:?}: {error}")))?;
        let transport = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .timeout(timeout)
            .build()
            .map_err(|error| ClusterError::request(format!("failed to build transport: {error}")))?;
        Ok(Self {
            client: Elasticsearch::new(transport),
        })
    }
}

/// Read a failed response's body and classify it.
async fn classify_failure(index: &str, response: Response) -> ClusterError {
    let status = response.status_code();
    let body = response.text().await.unwrap_or_default();
    if body.contains("resource_already_exists_exception") {
        return ClusterError::IndexAlreadyExists {
            index: index.to_owned(),
        };
    }
    if status.as_u16() == 404 || body.contains("index_not_found_exception") {
        return ClusterError::IndexNotFound {
            index: index.to_owned(),
        };
    }
    if body.contains("mapper") {
        return ClusterError::MappingConflict {
            index: index.to_owned(),
            reason: body,
        };
    }
    ClusterError::request(format!("status {status}: {body}"))
}

fn transport_error(error: elasticsearch::Error) -> ClusterError {
    ClusterError::request(error)
}

#[async_trait]
impl ClusterClient for EsCluster {
    async fn index_exists(&self, index: &str) -> ClusterResult<bool> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;
        Ok(response.status_code().is_success())
    }

    async fn create_index(
        &self,
        index: &str,
        settings: Option<&Value>,
        mappings: Option<&Value>,
    ) -> ClusterResult<()> {
        let mut body = serde_json::Map::new();
        if let Some(settings) = settings {
            body.insert("settings".to_owned(), settings.clone());
        }
        if let Some(mappings) = mappings {
            body.insert("mappings".to_owned(), mappings.clone());
        }
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(Value::Object(body))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status_code().is_success() {
            tracing::debug!(target: "epithet.cluster", index, "created index");
            return Ok(());
        }
        Err(classify_failure(index, response).await)
    }

    async fn delete_index(&self, index: &str) -> ClusterResult<()> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status_code().is_success() {
            return Ok(());
        }
        Err(classify_failure(index, response).await)
    }

    async fn put_mapping(
        &self,
        index: &str,
        _doc_type: &str,
        mapping: &Value,
    ) -> ClusterResult<()> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(transport_error)?;
        if response.status_code().is_success() {
            return Ok(());
        }
        Err(classify_failure(index, response).await)
    }

    async fn put_template(&self, name: &str, body: &Value) -> ClusterResult<()> {
        let response = self
            .client
            .indices()
            .put_template(IndicesPutTemplateParts::Name(name))
            .body(body.clone())
            .send()
            .await
            .map_err(transport_error)?;
        if response.status_code().is_success() {
            return Ok(());
        }
        Err(classify_failure(name, response).await)
    }

    async fn put_settings(&self, indexes: &[String], settings: &Value) -> ClusterResult<()> {
        let names: Vec<&str> = indexes.iter().map(String::as_str).collect();
        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&names))
            .body(settings.clone())
            .send()
            .await
            .map_err(transport_error)?;
        if response.status_code().is_success() {
            return Ok(());
        }
        Err(classify_failure(&names.join(","), response).await)
    }

    async fn get_alias_members(&self, alias: &str) -> ClusterResult<BTreeSet<String>> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status_code().as_u16() == 404 {
            return Ok(BTreeSet::new());
        }
        if !response.status_code().is_success() {
            return Err(classify_failure(alias, response).await);
        }
        let body: Value = response.json().await.map_err(transport_error)?;
        let members = body
            .as_object()
            .map(|by_index| by_index.keys().cloned().collect())
            .unwrap_or_default();
        Ok(members)
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> ClusterResult<()> {
        if actions.is_empty() {
            return Ok(());
        }
        let actions: Vec<Value> = actions
            .iter()
            .map(|action| match action {
                AliasAction::Add {
                    index,
                    alias,
                    routing,
                    filter,
                } => {
                    let mut add = serde_json::Map::new();
                    add.insert("index".to_owned(), json!(index));
                    add.insert("alias".to_owned(), json!(alias));
                    if let Some(routing) = routing {
                        add.insert("routing".to_owned(), routing.clone());
                    }
                    if let Some(filter) = filter {
                        add.insert("filter".to_owned(), filter.clone());
                    }
                    json!({ "add": add })
                }
                AliasAction::Remove { index, alias } => {
                    json!({"remove": {"index": index, "alias": alias}})
                }
            })
            .collect();
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status_code().is_success() {
            tracing::debug!(
                target: "epithet.cluster",
                actions = actions.len(),
                "applied alias batch"
            );
            return Ok(());
        }
        Err(classify_failure("_aliases", response).await)
    }

    async fn get_doc(&self, index: &str, id: &str) -> ClusterResult<Option<VersionedDoc>> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status_code().is_success() {
            return Err(classify_failure(index, response).await);
        }
        let body: Value = response.json().await.map_err(transport_error)?;
        let version = body.get("_version").and_then(Value::as_u64).unwrap_or(0);
        let source = body.get("_source").cloned().unwrap_or(Value::Null);
        Ok(Some(VersionedDoc { version, source }))
    }

    async fn index_doc(
        &self,
        index: &str,
        id: &str,
        source: &Value,
        version: u64,
    ) -> ClusterResult<()> {
        let response = self
            .client
            .index(IndexParts::IndexId(index, id))
            .version(version as i64)
            .version_type(VersionType::External)
            .body(source.clone())
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status_code();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 409 {
            return Err(ClusterError::VersionConflict {
                index: index.to_owned(),
                id: id.to_owned(),
                attempted: version,
            });
        }
        Err(classify_failure(index, response).await)
    }

    async fn create_doc(&self, index: &str, id: &str, source: &Value) -> ClusterResult<()> {
        let response = self
            .client
            .create(CreateParts::IndexId(index, id))
            .body(source.clone())
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status_code();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 409 {
            return Err(ClusterError::DocumentAlreadyExists {
                index: index.to_owned(),
                id: id.to_owned(),
            });
        }
        Err(classify_failure(index, response).await)
    }

    async fn refresh(&self, index: &str) -> ClusterResult<()> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status_code().is_success() {
            return Ok(());
        }
        Err(classify_failure(index, response).await)
    }

    async fn scan_start(&self, index: &str, page_size: usize) -> ClusterResult<ScrollPage> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .scroll(SCROLL_KEEPALIVE)
            .size(page_size as i64)
            .body(json!({"query": {"match_all": {}}, "sort": ["_doc"]}))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status_code().is_success() {
            return Err(classify_failure(index, response).await);
        }
        let body: Value = response.json().await.map_err(transport_error)?;
        Ok(parse_scroll_page(&body))
    }

    async fn scan_next(&self, scroll_id: &str) -> ClusterResult<ScrollPage> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({"scroll": SCROLL_KEEPALIVE, "scroll_id": scroll_id}))
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status_code();
        if status.as_u16() == 404 {
            return Err(ClusterError::UnknownScroll {
                scroll_id: scroll_id.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(classify_failure("_scroll", response).await);
        }
        let body: Value = response.json().await.map_err(transport_error)?;
        Ok(parse_scroll_page(&body))
    }

    async fn bulk_index(&self, index: &str, docs: &[RawDocument]) -> ClusterResult<BulkReport> {
        if docs.is_empty() {
            return Ok(BulkReport::default());
        }
        let mut body: Vec<elasticsearch::http::request::JsonBody<Value>> =
            Vec::with_capacity(docs.len() * 2);
        for doc in docs {
            body.push(json!({"index": {"_id": doc.id}}).into());
            body.push(doc.source.clone().into());
        }
        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status_code().is_success() {
            return Err(classify_failure(index, response).await);
        }
        let body: Value = response.json().await.map_err(transport_error)?;
        Ok(parse_bulk_report(&body))
    }

    async fn set_write_block(&self, index: &str, blocked: bool) -> ClusterResult<()> {
        let settings = json!({"index": {"blocks": {"write": blocked}}});
        self.put_settings(&[index.to_owned()], &settings).await
    }
}

fn parse_scroll_page(body: &Value) -> ScrollPage {
    let scroll_id = body
        .get("_scroll_id")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    let docs = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let id = hit.get("_id")?.as_str()?.to_owned();
                    let source = hit.get("_source").cloned().unwrap_or(Value::Null);
                    Some(RawDocument { id, source })
                })
                .collect()
        })
        .unwrap_or_default();
    ScrollPage { scroll_id, docs }
}

fn parse_bulk_report(body: &Value) -> BulkReport {
    let mut report = BulkReport::default();
    let Some(items) = body.get("items").and_then(Value::as_array) else {
        return report;
    };
    for item in items {
        let Some(outcome) = item
            .get("index")
            .or_else(|| item.get("create"))
            .or_else(|| item.get("update"))
        else {
            continue;
        };
        let id = outcome
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        match outcome.get("error") {
            Some(error) => report.failures.push(BulkFailure {
                id,
                reason: error.to_string(),
            }),
            None => report.succeeded += 1,
        }
    }
    report
}

// ─── Tests ──────────────────────────────────────────────────────────────────
