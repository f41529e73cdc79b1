//! Catalog discovery for newly registered applications
//!
//! Probes each name of a fixed reference list against the backend and stores
//! the ones that return at least one series. A failed probe counts as absent
//! and never stops the remaining probes.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, instrument, trace};

use crate::storage::StorageResult;
use crate::upstream::{ResponseParser, UpstreamClient};
use crate::{ApplicationId, MetricName};

use super::MetricCatalog;

/// Well-known container, node and Kubernetes metrics probed for every new application
pub const REFERENCE_METRICS: &[&str] = &[
    // cAdvisor
    "container_cpu_usage_seconds_total",
    "container_cpu_cfs_throttled_seconds_total",
    "container_cpu_cfs_periods_total",
    "container_cpu_cfs_throttled_periods_total",
    "container_memory_usage_bytes",
    "container_memory_working_set_bytes",
    "container_memory_rss",
    "container_memory_cache",
    "container_memory_swap",
    "container_spec_memory_limit_bytes",
    "container_spec_cpu_quota",
    "container_network_receive_bytes_total",
    "container_network_transmit_bytes_total",
    "container_network_receive_errors_total",
    "container_network_transmit_errors_total",
    "container_fs_usage_bytes",
    "container_fs_reads_bytes_total",
    "container_fs_writes_bytes_total",
    "container_last_seen",
    // node exporter
    "node_cpu_seconds_total",
    "node_memory_MemAvailable_bytes",
    "node_memory_MemTotal_bytes",
    "node_load1",
    "node_filesystem_avail_bytes",
    "node_filesystem_size_bytes",
    "node_network_receive_bytes_total",
    "node_network_transmit_bytes_total",
    // kube-state-metrics
    "kube_pod_status_phase",
    "kube_pod_container_status_restarts_total",
    "kube_pod_container_status_ready",
    "kube_pod_container_resource_requests",
    "kube_pod_container_resource_limits",
    "kube_deployment_status_replicas_available",
    "kube_deployment_spec_replicas",
    "up",
];

#[derive(Clone)]
pub struct CatalogDiscovery {
    upstream: Arc<dyn UpstreamClient>,
    catalog: MetricCatalog,
    reference: Vec<MetricName>,
    /// Probes in flight at once; 1 probes strictly one after another
    concurrency: usize,
}

impl CatalogDiscovery {
    pub fn new(upstream: Arc<dyn UpstreamClient>, catalog: MetricCatalog, concurrency: usize) -> Self {
        let reference = REFERENCE_METRICS
            .iter()
            .filter_map(|name| MetricName::parse(name).ok())
            .collect();

        Self {
            upstream,
            catalog,
            reference,
            concurrency: concurrency.max(1),
        }
    }

    /// Replace the reference list
    pub fn with_reference(mut self, reference: Vec<MetricName>) -> Self {
        self.reference = reference;
        self
    }

    pub fn reference(&self) -> &[MetricName] {
        &self.reference
    }

    /// Probe every reference metric and store the present ones in one batch
    ///
    /// Returns the stored names in reference-list order. Nothing is stored
    /// when no probe finds data.
    #[instrument(skip(self), fields(app = %app))]
    pub async fn discover(&self, app: &ApplicationId) -> StorageResult<Vec<MetricName>> {
        debug!("probing {} reference metrics", self.reference.len());

        let found: Vec<MetricName> = futures::stream::iter(self.reference.iter().cloned())
            .map(|name| {
                let upstream = Arc::clone(&self.upstream);
                let app = app.clone();
                async move {
                    let present = probe(&*upstream, &app, &name).await;
                    present.then_some(name)
                }
            })
            .buffered(self.concurrency)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        if found.is_empty() {
            info!("no reference metrics found, catalog left empty");
            return Ok(found);
        }

        self.catalog.add_batch(app, &found).await?;
        info!("discovered {} metrics", found.len());
        Ok(found)
    }

    /// Whether `name` returns at least one series for `app`
    pub async fn probe(&self, app: &ApplicationId, name: &MetricName) -> bool {
        probe(&*self.upstream, app, name).await
    }
}

async fn probe(upstream: &dyn UpstreamClient, app: &ApplicationId, name: &MetricName) -> bool {
    match upstream.fetch_named(app, std::slice::from_ref(name)).await {
        Ok(response) => {
            let rows = ResponseParser::row_count(&response);
            trace!(metric = %name, rows, "probe finished");
            rows > 0
        }
        Err(e) => {
            debug!(metric = %name, "probe failed, treating metric as absent: {e}");
            false
        }
    }
}
