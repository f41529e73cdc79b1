//! Metric catalog management under `/metrics-storage`
//!
//! Lookups with an id that fails validation behave like lookups of an
//! unknown application.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::MetricStorageRequest,
};
use crate::{ApplicationId, MetricName};

/// POST /metrics-storage/add
pub async fn add_metric(
    State(state): State<ApiState>,
    Json(request): Json<MetricStorageRequest>,
) -> (StatusCode, String) {
    let parsed = ApplicationId::parse(&request.application_id)
        .and_then(|app| MetricName::parse(&request.metric).map(|metric| (app, metric)));

    let (app, metric) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("Error storing metric: {e}")),
    };

    match state.service.catalog().add(&app, &metric).await {
        Ok(()) => (
            StatusCode::OK,
            format!("Metric '{metric}' successfully stored for application '{app}'"),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error storing metric: {e}"),
        ),
    }
}

/// GET /metrics-storage/all
pub async fn all_metrics(
    State(state): State<ApiState>,
) -> ApiResult<Json<BTreeMap<ApplicationId, Vec<MetricName>>>> {
    Ok(Json(state.service.catalog().all().await?))
}

/// GET /metrics-storage/exists/:application_id
pub async fn application_exists(
    State(state): State<ApiState>,
    Path(application_id): Path<String>,
) -> ApiResult<Json<bool>> {
    let Ok(app) = ApplicationId::parse(&application_id) else {
        return Ok(Json(false));
    };
    Ok(Json(state.service.catalog().exists(&app).await?))
}

/// GET /metrics-storage/:application_id
pub async fn get_metrics(
    State(state): State<ApiState>,
    Path(application_id): Path<String>,
) -> ApiResult<Json<Vec<MetricName>>> {
    let not_found = || ApiError::NotFound(format!("no metrics stored for '{application_id}'"));

    let app = ApplicationId::parse(&application_id).map_err(|_| not_found())?;
    state
        .service
        .catalog()
        .get(&app)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// GET /metrics-storage/applications
pub async fn application_ids(State(state): State<ApiState>) -> ApiResult<Json<Vec<ApplicationId>>> {
    Ok(Json(state.service.catalog().application_ids().await?))
}

/// DELETE /metrics-storage/:application_id
pub async fn delete_application(
    State(state): State<ApiState>,
    Path(application_id): Path<String>,
) -> ApiResult<String> {
    let not_found = || ApiError::NotFound(format!("no metrics stored for '{application_id}'"));

    let app = ApplicationId::parse(&application_id).map_err(|_| not_found())?;
    let removed = state
        .service
        .catalog()
        .remove_application(&app)
        .await?
        .ok_or_else(not_found)?;

    Ok(format!(
        "Application '{app}' and its {} metrics successfully deleted",
        removed.len()
    ))
}

/// DELETE /metrics-storage/:application_id/metrics/:metric
pub async fn delete_metric(
    State(state): State<ApiState>,
    Path((application_id, metric)): Path<(String, String)>,
) -> ApiResult<String> {
    let not_found = || {
        ApiError::NotFound(format!(
            "metric '{metric}' not stored for '{application_id}'"
        ))
    };

    let app = ApplicationId::parse(&application_id).map_err(|_| not_found())?;
    let name = MetricName::parse(&metric).map_err(|_| not_found())?;

    if !state.service.catalog().remove_one(&app, &name).await? {
        return Err(not_found());
    }

    Ok(format!(
        "Metric '{name}' successfully deleted from application '{app}'"
    ))
}

/// DELETE /metrics-storage/all
pub async fn clear_all(State(state): State<ApiState>) -> ApiResult<&'static str> {
    state.service.catalog().clear().await?;
    Ok("All metrics successfully cleared")
}

/// GET /metrics-storage/count/applications
pub async fn application_count(State(state): State<ApiState>) -> ApiResult<Json<usize>> {
    Ok(Json(state.service.catalog().application_count().await?))
}

/// GET /metrics-storage/count/metrics
pub async fn metric_count(State(state): State<ApiState>) -> ApiResult<Json<usize>> {
    Ok(Json(state.service.catalog().metric_count().await?))
}
