//! API shared state

use chrono::{DateTime, Utc};

use crate::actors::SchedulerHandle;
use crate::service::MetricsService;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Registration, catalog and fetch pipeline
    pub service: MetricsService,

    /// Handle to the scheduler actor, absent when sweeping is disabled
    pub scheduler: Option<SchedulerHandle>,

    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(service: MetricsService, scheduler: Option<SchedulerHandle>) -> Self {
        Self {
            service,
            scheduler,
            started_at: Utc::now(),
        }
    }
}
