//! Message types for the scheduler actor
//!
//! Commands travel over an mpsc channel; request/response commands carry a
//! oneshot sender for the reply.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::ApplicationId;

/// Commands that can be sent to the SchedulerActor
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run a sweep immediately, outside the timer
    SweepNow {
        respond_to: oneshot::Sender<anyhow::Result<SweepReport>>,
    },

    /// Stop the loop; an in-flight sweep finishes first
    Shutdown,
}

/// Pipeline failure of one application during a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub application_id: ApplicationId,
    pub error: String,
}

/// Outcome of one pass over the registered applications
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Published successfully
    pub processed: Vec<ApplicationId>,

    pub failed: Vec<SweepFailure>,

    /// Not attempted because the sweep was aborted
    pub skipped: Vec<ApplicationId>,

    pub aborted: bool,
}

impl SweepReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            processed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            aborted: false,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
