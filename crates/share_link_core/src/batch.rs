//! crates/share_link_core/src/batch.rs
//!
//! Fans one "share this season" action out into one share per child item and
//! folds the individual outcomes into a single report.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::{BatchItemResult, BatchReport, CatalogItem};
use crate::policy::{self, PolicyOverrides, ShareDefaults};
use crate::ports::{MediaCatalog, PortError, PortResult, ShareBackend};

/// Creates shares for every direct child of a container item.
#[derive(Clone)]
pub struct BatchOrchestrator {
    backend: Arc<dyn ShareBackend>,
    catalog: Arc<dyn MediaCatalog>,
    defaults: ShareDefaults,
    max_in_flight: usize,
}

impl BatchOrchestrator {
    /// `max_in_flight` bounds how many create calls hit the backend at once.
    pub fn new(
        backend: Arc<dyn ShareBackend>,
        catalog: Arc<dyn MediaCatalog>,
        defaults: ShareDefaults,
        max_in_flight: usize,
    ) -> Self {
        Self {
            backend,
            catalog,
            defaults,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Shares every child of `parent_item_id` under the same resolved policy.
    ///
    /// Children are started in ascending sequence order and the report lists
    /// them in that order no matter when each call finished. A failing child is
    /// recorded and never stops the others. If `cancel` fires, no further
    /// children are started, calls already in flight are left to finish on
    /// their own and `PortError::Cancelled` is returned instead of a partial
    /// report.
    pub async fn create_batch(
        &self,
        parent_item_id: &str,
        requesting_user_id: &str,
        overrides: &PolicyOverrides,
        cancel: &CancellationToken,
    ) -> PortResult<BatchReport> {
        let mut children = self.catalog.list_children(parent_item_id).await?;
        if children.is_empty() {
            warn!(parent_item_id, "No child items to share");
            return Err(PortError::NoChildren);
        }
        sort_by_sequence(&mut children);

        info!(
            parent_item_id,
            count = children.len(),
            "Creating batch shares"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut pending = Vec::with_capacity(children.len());

        for child in children {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(parent_item_id, started = pending.len(), "Batch cancelled before all children started");
                    return Err(PortError::Cancelled);
                }
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|_| PortError::Cancelled)?
                }
            };

            let request = policy::resolve(overrides, &self.defaults)
                .to_request(&child.id, requesting_user_id);
            let backend = Arc::clone(&self.backend);
            let handle = tokio::spawn(async move {
                let outcome = backend.create_share(&request).await;
                drop(permit);
                outcome
            });
            pending.push((child, handle));
        }

        let mut results = Vec::with_capacity(pending.len());
        for (child, handle) in pending {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(parent_item_id, "Batch cancelled while awaiting results");
                    return Err(PortError::Cancelled);
                }
                joined = handle => joined,
            };

            let result = match joined {
                Ok(Ok(share)) => BatchItemResult::succeeded(&child, share),
                Ok(Err(e)) => {
                    warn!(item_id = %child.id, item_name = %child.name, error = %e, "Failed to create share");
                    BatchItemResult::failed(&child, e.to_string())
                }
                Err(e) => {
                    error!(item_id = %child.id, item_name = %child.name, error = %e, "Share task aborted");
                    BatchItemResult::failed(&child, format!("Share creation aborted: {}", e))
                }
            };
            results.push(result);
        }

        let report = BatchReport::from_results(results);
        info!(
            parent_item_id,
            succeeded = report.success_count,
            failed = report.fail_count,
            "Batch share creation complete"
        );
        Ok(report)
    }
}

/// Orders children by their natural index; a missing index counts as 0.
/// The sort is stable so equal indices keep the catalog's order.
pub fn sort_by_sequence(children: &mut [CatalogItem]) {
    children.sort_by_key(|child| child.index_number.unwrap_or(0));
}
