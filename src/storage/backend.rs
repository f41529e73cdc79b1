//! Store trait definitions
//!
//! This module defines the traits every registry/catalog backing store implements.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::error::StorageResult;
use crate::{ApplicationId, MetricName};

/// Set of validated application ids
///
/// Append-only apart from explicit removal. `list` returns ids in
/// registration order.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn contains(&self, app: &ApplicationId) -> StorageResult<bool>;

    /// Insert `app`, returning `false` if it was already present
    ///
    /// Concurrent inserts of the same id see exactly one `true`.
    async fn insert(&self, app: &ApplicationId) -> StorageResult<bool>;

    async fn remove(&self, app: &ApplicationId) -> StorageResult<bool>;

    async fn list(&self) -> StorageResult<Vec<ApplicationId>>;

    /// Short backend label for stats output
    fn backend_name(&self) -> &'static str;
}

/// Per-application, insertion-ordered metric name lists
///
/// Duplicates are stored as given. An application's entry exists while its
/// list is non-empty; `remove_one` drops the entry when it empties the list.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Append one name, creating the entry if absent
    async fn append(&self, app: &ApplicationId, name: &MetricName) -> StorageResult<()>;

    /// Append a batch of names in order
    async fn extend(&self, app: &ApplicationId, names: &[MetricName]) -> StorageResult<()>;

    async fn get(&self, app: &ApplicationId) -> StorageResult<Option<Vec<MetricName>>>;

    /// Remove the first occurrence of `name`
    async fn remove_one(&self, app: &ApplicationId, name: &MetricName) -> StorageResult<bool>;

    /// Remove the whole entry, returning the names it held
    async fn remove_application(
        &self,
        app: &ApplicationId,
    ) -> StorageResult<Option<Vec<MetricName>>>;

    async fn exists(&self, app: &ApplicationId) -> StorageResult<bool>;

    async fn clear(&self) -> StorageResult<()>;

    async fn application_count(&self) -> StorageResult<usize>;

    /// Sum of the lengths of all lists
    async fn metric_count(&self) -> StorageResult<usize>;

    async fn snapshot(&self) -> StorageResult<BTreeMap<ApplicationId, Vec<MetricName>>>;
}
