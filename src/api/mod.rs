//! REST API of the relay
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **MetricsService** for registration, catalog edits and on-demand collection
//! - **Scheduler handle** for the last sweep report
//!
//! ## Endpoints
//!
//! - `POST /metrics/add-application` - Register an application (plain-text body)
//! - `GET /metrics/:application_id` - Collect and publish metrics now
//! - `DELETE /metrics/applications/:application_id` - Deregister an application
//! - `/metrics-storage/...` - Metric catalog management
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/stats` - Relay statistics

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::net::{SocketAddr, SocketAddrV4};
#[cfg(feature = "api")]
use tracing::info;

use crate::config::ApiSettings;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Optional authentication token
    pub auth_token: Option<String>,

    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(
                crate::util::get_addr(),
                crate::util::get_port(),
            )),
            auth_token: crate::util::get_token(),
            enable_cors: true,
        }
    }
}

impl From<&ApiSettings> for ApiConfig {
    /// Config file values win over RELAY_ADDR/RELAY_PORT/RELAY_TOKEN
    fn from(settings: &ApiSettings) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: settings.bind_addr.unwrap_or(defaults.bind_addr),
            auth_token: settings.auth_token.clone().or(defaults.auth_token),
            enable_cors: settings.enable_cors,
        }
    }
}

/// All routes with shared state, without CORS or auth layers
#[cfg(feature = "api")]
pub fn router(state: ApiState) -> Router {
    use tower_http::trace::TraceLayer;

    let storage = Router::new()
        .route("/add", post(routes::catalog::add_metric))
        .route(
            "/all",
            get(routes::catalog::all_metrics).delete(routes::catalog::clear_all),
        )
        .route("/applications", get(routes::catalog::application_ids))
        .route(
            "/exists/:application_id",
            get(routes::catalog::application_exists),
        )
        .route(
            "/count/applications",
            get(routes::catalog::application_count),
        )
        .route("/count/metrics", get(routes::catalog::metric_count))
        .route(
            "/:application_id",
            get(routes::catalog::get_metrics).delete(routes::catalog::delete_application),
        )
        .route(
            "/:application_id/metrics/:metric",
            delete(routes::catalog::delete_metric),
        );

    Router::new()
        .route(
            "/metrics/add-application",
            post(routes::applications::add_application),
        )
        .route(
            "/metrics/:application_id",
            get(routes::applications::get_metrics),
        )
        .route(
            "/metrics/applications/:application_id",
            delete(routes::applications::deregister_application),
        )
        .nest("/metrics-storage", storage)
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};

    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    if let Some(token) = config.auth_token {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
