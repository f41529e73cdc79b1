//! Request and response bodies of the HTTP API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::actors::SweepReport;

/// Body of `POST /metrics-storage/add`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStorageRequest {
    pub application_id: String,
    pub metric: String,
}

/// Response for `DELETE /metrics/applications/:application_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeregisterResponse {
    pub application_id: String,
    pub removed: bool,
}

/// Response for GET /api/v1/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Response for GET /api/v1/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub timestamp: String,
    pub started_at: String,
    pub storage_backend: String,
    pub registered_applications: Vec<String>,
    pub catalog: CatalogStats,
    pub destinations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sweep: Option<SweepReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    pub applications: usize,
    pub metrics: usize,
    pub per_application: BTreeMap<String, usize>,
}
