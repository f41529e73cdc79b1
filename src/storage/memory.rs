//! In-memory store (no persistence)
//!
//! Registry and catalog live in dashmaps shared by request handlers and the
//! scheduler. All data is lost on restart.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::backend::{CatalogStore, RegistryStore};
use super::error::StorageResult;
use crate::{ApplicationId, MetricName};

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Registered applications with their registration sequence number
    applications: DashMap<ApplicationId, u64>,

    next_sequence: AtomicU64,

    catalogs: DashMap<ApplicationId, Vec<MetricName>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn contains(&self, app: &ApplicationId) -> StorageResult<bool> {
        Ok(self.applications.contains_key(app))
    }

    async fn insert(&self, app: &ApplicationId) -> StorageResult<bool> {
        let mut inserted = false;
        self.applications.entry(app.clone()).or_insert_with(|| {
            inserted = true;
            self.next_sequence.fetch_add(1, Ordering::Relaxed)
        });
        Ok(inserted)
    }

    async fn remove(&self, app: &ApplicationId) -> StorageResult<bool> {
        Ok(self.applications.remove(app).is_some())
    }

    async fn list(&self) -> StorageResult<Vec<ApplicationId>> {
        let mut entries: Vec<(u64, ApplicationId)> = self
            .applications
            .iter()
            .map(|entry| (*entry.value(), entry.key().clone()))
            .collect();
        entries.sort_unstable_by_key(|(sequence, _)| *sequence);
        Ok(entries.into_iter().map(|(_, app)| app).collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn append(&self, app: &ApplicationId, name: &MetricName) -> StorageResult<()> {
        self.catalogs
            .entry(app.clone())
            .or_default()
            .push(name.clone());
        Ok(())
    }

    async fn extend(&self, app: &ApplicationId, names: &[MetricName]) -> StorageResult<()> {
        if names.is_empty() {
            return Ok(());
        }
        self.catalogs
            .entry(app.clone())
            .or_default()
            .extend_from_slice(names);
        Ok(())
    }

    async fn get(&self, app: &ApplicationId) -> StorageResult<Option<Vec<MetricName>>> {
        Ok(self.catalogs.get(app).map(|metrics| metrics.clone()))
    }

    async fn remove_one(&self, app: &ApplicationId, name: &MetricName) -> StorageResult<bool> {
        let removed = {
            let Some(mut metrics) = self.catalogs.get_mut(app) else {
                return Ok(false);
            };
            match metrics.iter().position(|m| m == name) {
                Some(index) => {
                    metrics.remove(index);
                    true
                }
                None => false,
            }
        };

        // the shard guard is released above; re-check emptiness atomically
        if self
            .catalogs
            .remove_if(app, |_, metrics| metrics.is_empty())
            .is_some()
        {
            trace!("catalog for {app} is empty, entry removed");
        }

        Ok(removed)
    }

    async fn remove_application(
        &self,
        app: &ApplicationId,
    ) -> StorageResult<Option<Vec<MetricName>>> {
        Ok(self.catalogs.remove(app).map(|(_, metrics)| metrics))
    }

    async fn exists(&self, app: &ApplicationId) -> StorageResult<bool> {
        Ok(self.catalogs.contains_key(app))
    }

    async fn clear(&self) -> StorageResult<()> {
        self.catalogs.clear();
        Ok(())
    }

    async fn application_count(&self) -> StorageResult<usize> {
        Ok(self.catalogs.len())
    }

    async fn metric_count(&self) -> StorageResult<usize> {
        Ok(self.catalogs.iter().map(|entry| entry.value().len()).sum())
    }

    async fn snapshot(&self) -> StorageResult<BTreeMap<ApplicationId, Vec<MetricName>>> {
        Ok(self
            .catalogs
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }
}
