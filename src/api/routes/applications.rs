//! Application registration and on-demand collection

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{error, instrument};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::DeregisterResponse,
};
use crate::registry::RegistrationOutcome;
use crate::{ApplicationId, PublishEnvelope};

pub const ALREADY_REGISTERED: &str = "Application ID is already registered.";
pub const VALID: &str = "Application ID is valid.";
pub const INVALID: &str = "Invalid Application ID.";
pub const VALIDATION_ERROR: &str = "Error validating Application ID.";

/// POST /metrics/add-application
///
/// Plain-text body holding the application id. Answers in plain text.
#[instrument(skip(state))]
pub async fn add_application(
    State(state): State<ApiState>,
    body: String,
) -> (StatusCode, &'static str) {
    let Ok(app) = ApplicationId::parse(&body) else {
        return (StatusCode::BAD_REQUEST, INVALID);
    };

    match state.service.register(&app).await {
        Ok(RegistrationOutcome::AlreadyRegistered) => (StatusCode::OK, ALREADY_REGISTERED),
        Ok(RegistrationOutcome::Registered) => (StatusCode::OK, VALID),
        Ok(RegistrationOutcome::Rejected) => (StatusCode::BAD_REQUEST, INVALID),
        Ok(RegistrationOutcome::UpstreamFailure(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, VALIDATION_ERROR)
        }
        Err(e) => {
            error!("registration of {app} failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, VALIDATION_ERROR)
        }
    }
}

/// GET /metrics/:application_id
///
/// Runs the pipeline for one application, publishes the envelope and returns it
pub async fn get_metrics(
    State(state): State<ApiState>,
    Path(application_id): Path<String>,
) -> ApiResult<Json<PublishEnvelope>> {
    let app = ApplicationId::parse(&application_id)?;
    let envelope = state.service.collect(&app).await?;
    Ok(Json(envelope))
}

/// DELETE /metrics/applications/:application_id
pub async fn deregister_application(
    State(state): State<ApiState>,
    Path(application_id): Path<String>,
) -> ApiResult<Json<DeregisterResponse>> {
    let app = ApplicationId::parse(&application_id)
        .map_err(|_| ApiError::NotFound(format!("application '{application_id}' is not registered")))?;

    if !state.service.registry().deregister(&app).await? {
        return Err(ApiError::NotFound(format!(
            "application '{application_id}' is not registered"
        )));
    }

    Ok(Json(DeregisterResponse {
        application_id: app.into(),
        removed: true,
    }))
}
