//! Application registry
//!
//! Tracks the application ids that have been confirmed against the backend's
//! `application_id` label values. Registration is idempotent.
//!
//! ```text
//! validate(app) ── already present? ──yes──▶ AlreadyRegistered
//!                        │ no
//!                        ▼
//!              fetch label values ──error / no list──▶ UpstreamFailure
//!                        │
//!              app in list? ──no──▶ Rejected
//!                        │ yes
//!                        ▼
//!                  insert ──▶ Registered   (caller runs discovery)
//! ```

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::storage::{RegistryStore, StorageResult};
use crate::upstream::{ResponseParser, UpstreamClient};
use crate::{ApplicationId, RelayResult};

/// Result of a registration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Newly added; discovery should run
    Registered,
    AlreadyRegistered,
    /// Not a known `application_id` label value
    Rejected,
    /// Label values could not be fetched or had an unexpected shape
    UpstreamFailure(String),
}

#[derive(Clone)]
pub struct ApplicationRegistry {
    store: Arc<dyn RegistryStore>,
    upstream: Arc<dyn UpstreamClient>,
}

impl ApplicationRegistry {
    pub fn new(store: Arc<dyn RegistryStore>, upstream: Arc<dyn UpstreamClient>) -> Self {
        Self { store, upstream }
    }

    /// Validate `app` against the backend and register it on success
    ///
    /// Concurrent calls for the same id yield at most one `Registered`; the
    /// losers report `AlreadyRegistered`.
    #[instrument(skip(self), fields(app = %app))]
    pub async fn validate(&self, app: &ApplicationId) -> RelayResult<RegistrationOutcome> {
        if self.store.contains(app).await? {
            debug!("application already registered");
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        let response = match self.upstream.fetch_label_values().await {
            Ok(response) => response,
            Err(e) => {
                warn!("failed to fetch application ids: {e}");
                return Ok(RegistrationOutcome::UpstreamFailure(e.to_string()));
            }
        };

        let Some(known) = ResponseParser::label_values(&response) else {
            warn!("label values response has no data list");
            return Ok(RegistrationOutcome::UpstreamFailure(
                "label values response has no data list".to_string(),
            ));
        };

        if !known.iter().any(|value| value == app.as_str()) {
            debug!("application id not known to the backend");
            return Ok(RegistrationOutcome::Rejected);
        }

        if self.store.insert(app).await? {
            info!("registered application");
            Ok(RegistrationOutcome::Registered)
        } else {
            Ok(RegistrationOutcome::AlreadyRegistered)
        }
    }

    pub async fn is_registered(&self, app: &ApplicationId) -> StorageResult<bool> {
        self.store.contains(app).await
    }

    /// Remove `app` from the registry; its catalog is left untouched
    #[instrument(skip(self), fields(app = %app))]
    pub async fn deregister(&self, app: &ApplicationId) -> StorageResult<bool> {
        let removed = self.store.remove(app).await?;
        if removed {
            info!("deregistered application");
        }
        Ok(removed)
    }

    /// Snapshot of registered ids in registration order
    pub async fn applications(&self) -> StorageResult<Vec<ApplicationId>> {
        self.store.list().await
    }

    pub async fn count(&self) -> StorageResult<usize> {
        Ok(self.store.list().await?.len())
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
