//! Relay statistics endpoint

use axum::{Json, extract::State};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{CatalogStats, StatsResponse},
};

/// GET /api/v1/stats
///
/// Registered applications, catalog sizes and the last sweep report
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<StatsResponse>> {
    let registry = state.service.registry();
    let catalogs = state.service.catalog().all().await?;

    let last_sweep = state.scheduler.as_ref().and_then(|s| s.last_report());

    Ok(Json(StatsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        started_at: state.started_at.to_rfc3339(),
        storage_backend: registry.backend_name().to_string(),
        registered_applications: registry
            .applications()
            .await?
            .into_iter()
            .map(String::from)
            .collect(),
        catalog: CatalogStats {
            applications: catalogs.len(),
            metrics: catalogs.values().map(Vec::len).sum(),
            per_application: catalogs
                .iter()
                .map(|(app, names)| (app.to_string(), names.len()))
                .collect(),
        },
        destinations: state
            .service
            .publisher()
            .destinations()
            .iter()
            .map(|d| d.to_string())
            .collect(),
        last_sweep,
    }))
}
