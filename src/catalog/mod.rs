//! Metric catalog
//!
//! Per-application, insertion-ordered lists of metric names the scheduler
//! polls. Populated by [`discovery::CatalogDiscovery`] after registration and
//! editable through the storage endpoints. Duplicate names are kept as given.

pub mod discovery;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::storage::{CatalogStore, StorageResult};
use crate::{ApplicationId, MetricName};

pub use discovery::{CatalogDiscovery, REFERENCE_METRICS};

#[derive(Clone)]
pub struct MetricCatalog {
    store: Arc<dyn CatalogStore>,
}

impl MetricCatalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Append `name` to the application's list, creating it if absent
    #[instrument(skip(self), fields(app = %app, metric = %name))]
    pub async fn add(&self, app: &ApplicationId, name: &MetricName) -> StorageResult<()> {
        self.store.append(app, name).await?;
        debug!("metric added to catalog");
        Ok(())
    }

    /// Append a batch in order; an empty batch creates no entry
    #[instrument(skip(self, names), fields(app = %app, count = names.len()))]
    pub async fn add_batch(&self, app: &ApplicationId, names: &[MetricName]) -> StorageResult<()> {
        self.store.extend(app, names).await?;
        info!("stored {} metrics", names.len());
        Ok(())
    }

    pub async fn get(&self, app: &ApplicationId) -> StorageResult<Option<Vec<MetricName>>> {
        self.store.get(app).await
    }

    /// Remove the first occurrence of `name`. Emptying the list removes the
    /// application's entry.
    #[instrument(skip(self), fields(app = %app, metric = %name))]
    pub async fn remove_one(&self, app: &ApplicationId, name: &MetricName) -> StorageResult<bool> {
        let removed = self.store.remove_one(app, name).await?;
        debug!(removed, "remove metric");
        Ok(removed)
    }

    #[instrument(skip(self), fields(app = %app))]
    pub async fn remove_application(
        &self,
        app: &ApplicationId,
    ) -> StorageResult<Option<Vec<MetricName>>> {
        let removed = self.store.remove_application(app).await?;
        if removed.is_some() {
            info!("removed catalog");
        }
        Ok(removed)
    }

    pub async fn exists(&self, app: &ApplicationId) -> StorageResult<bool> {
        self.store.exists(app).await
    }

    pub async fn clear(&self) -> StorageResult<()> {
        info!("clearing metric catalog");
        self.store.clear().await
    }

    pub async fn application_count(&self) -> StorageResult<usize> {
        self.store.application_count().await
    }

    pub async fn metric_count(&self) -> StorageResult<usize> {
        self.store.metric_count().await
    }

    pub async fn all(&self) -> StorageResult<BTreeMap<ApplicationId, Vec<MetricName>>> {
        self.store.snapshot().await
    }

    pub async fn application_ids(&self) -> StorageResult<Vec<ApplicationId>> {
        Ok(self.store.snapshot().await?.into_keys().collect())
    }
}
