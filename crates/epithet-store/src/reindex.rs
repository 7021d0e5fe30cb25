//! Background document copy between physical indexes.
//!
//! The copy streams every document from the source to the target with a
//! scroll-and-bulk loop, pacing itself with a configurable sleep between
//! scroll pages to bound cluster load. The source carries an advisory write
//! block for the duration; the block is released on every exit path. Bulk
//! failures are collected per document and reported, never aborting the
//! copy; a partial copy is resumable by rerunning.

use std::sync::Arc;
use std::time::Duration;

use epithet_cluster::{BulkFailure, ClusterClient};
use epithet_core::{SchemaError, SchemaResult};

/// Scroll page size used for the copy.
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Outcome of one copy run. `failures` holds the documents that could not
/// be written; the run itself still counts as completed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyReport {
    pub pages: usize,
    pub docs_copied: usize,
    pub failures: Vec<BulkFailure>,
}

impl CopyReport {
    /// True when every document made it across.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Copies documents between indexes.
pub struct Reindexer {
    cluster: Arc<dyn ClusterClient>,
    page_size: usize,
}

impl Reindexer {
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self {
            cluster,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Copy every document from `source` to `target`, sleeping
    /// `scroll_sleep` between scroll pages.
    ///
    /// The target index is created if absent (an existing target is fine).
    /// The source is write-blocked for the duration of the copy and the
    /// block is always released, whether the copy succeeds or fails.
    pub async fn reindex(
        &self,
        source: &str,
        target: &str,
        scroll_sleep: Duration,
    ) -> SchemaResult<CopyReport> {
        match self.cluster.create_index(target, None, None).await {
            Ok(()) => {
                tracing::info!(target: "epithet.reindex", index = %target, "created target index");
            }
            Err(error) if error.is_already_exists() => {}
            Err(error) => return Err(SchemaError::cluster(error)),
        }

        self.cluster
            .set_write_block(source, true)
            .await
            .map_err(SchemaError::cluster)?;
        tracing::info!(
            target: "epithet.reindex",
            source = %source,
            target = %target,
            sleep_ms = scroll_sleep.as_millis() as u64,
            "write block set, copy starting"
        );

        let result = self.copy(source, target, scroll_sleep).await;

        // Release the block on every exit path. Failure to release is the
        // one thing this method cannot fix itself; tell the operator.
        if let Err(error) = self.cluster.set_write_block(source, false).await {
            tracing::warn!(
                target: "epithet.reindex",
                source = %source,
                error = %error,
                "failed to clear write block, clear it manually"
            );
        }

        match &result {
            Ok(report) => tracing::info!(
                target: "epithet.reindex",
                pages = report.pages,
                docs_copied = report.docs_copied,
                failures = report.failures.len(),
                "copy finished"
            ),
            Err(error) => tracing::error!(
                target: "epithet.reindex",
                source = %source,
                error = %error,
                "copy aborted"
            ),
        }
        result
    }

    async fn copy(
        &self,
        source: &str,
        target: &str,
        scroll_sleep: Duration,
    ) -> SchemaResult<CopyReport> {
        let mut report = CopyReport::default();
        let mut page = self
            .cluster
            .scan_start(source, self.page_size)
            .await
            .map_err(SchemaError::cluster)?;

        while !page.docs.is_empty() {
            let bulk = self
                .cluster
                .bulk_index(target, &page.docs)
                .await
                .map_err(SchemaError::cluster)?;
            report.pages += 1;
            report.docs_copied += bulk.succeeded;
            for failure in bulk.failures {
                tracing::error!(
                    target: "epithet.reindex",
                    id = %failure.id,
                    reason = %failure.reason,
                    "document copy failed"
                );
                report.failures.push(failure);
            }

            let Some(scroll_id) = page.scroll_id.clone() else {
                break;
            };
            // The sole intentional suspension point: cooperative pacing, not
            // synchronization.
            tokio::time::sleep(scroll_sleep).await;
            page = self
                .cluster
                .scan_next(&scroll_id)
                .await
                .map_err(SchemaError::cluster)?;
        }
        Ok(report)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
