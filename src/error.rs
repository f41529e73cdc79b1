//! Error taxonomy of the relay
//!
//! - [`ValidationError`]: rejected before any network call
//! - [`UpstreamError`]: transport or HTTP failure talking to the backend, never retried
//! - [`RelayError::NotFound`]: backend reachable but returned no data for the application
//! - [`PublishError`]: serialization or per-destination delivery failure
//! - [`StorageError`]: registry/catalog backing store failure

use thiserror::Error;

use crate::ApplicationId;
use crate::publisher::PublishError;
use crate::storage::StorageError;
use crate::upstream::UpstreamError;

/// Result alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Invalid application id or metric name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("application id cannot be blank")]
    BlankApplicationId,

    #[error("application id '{0}' is too long or contains characters outside [A-Za-z0-9_.:-]")]
    IllegalApplicationId(String),

    #[error("metric name cannot be blank")]
    BlankMetricName,

    #[error("'{0}' is not a valid metric name")]
    IllegalMetricName(String),
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("upstream unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("no metrics found for application ID: {0}")]
    NotFound(ApplicationId),

    #[error("no metrics configured for application ID: {0}")]
    NoMetricsConfigured(ApplicationId),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
