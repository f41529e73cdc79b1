//! SchedulerActor - Periodically sweeps every registered application
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick (after initial delay) → MetricsService::sweep → watch::Sender<Option<SweepReport>>
//!     ↑                                                              │
//!     └─── Commands (SweepNow, Shutdown)          SchedulerHandle::last_report ◀┘
//! ```
//!
//! The last report is read from the watch channel, never through the command
//! channel, so readers do not wait for an in-flight sweep.
//!
//! A failed sweep is logged and the loop carries on with the next tick. A
//! panic inside a sweep is caught so the timer keeps running.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{SchedulerConfig, SweepPolicy};
use crate::service::MetricsService;

use super::messages::{SchedulerCommand, SweepReport};

/// Timing and failure policy of the scheduler
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub interval: Duration,
    pub initial_delay: Duration,
    pub policy: SweepPolicy,
}

impl From<&SchedulerConfig> for SchedulerSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs.max(1)),
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            policy: config.on_error,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

pub struct SchedulerActor {
    service: MetricsService,

    settings: SchedulerSettings,

    command_rx: mpsc::Receiver<SchedulerCommand>,

    report_tx: watch::Sender<Option<SweepReport>>,
}

impl SchedulerActor {
    pub fn new(
        service: MetricsService,
        settings: SchedulerSettings,
        command_rx: mpsc::Receiver<SchedulerCommand>,
        report_tx: watch::Sender<Option<SweepReport>>,
    ) -> Self {
        Self {
            service,
            settings,
            command_rx,
            report_tx,
        }
    }

    /// Run the actor's main loop until Shutdown or until every handle is dropped
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!(
            "scheduler starting: first sweep in {:?}, then every {:?}",
            self.settings.initial_delay, self.settings.interval
        );

        let mut ticker = interval_at(
            Instant::now() + self.settings.initial_delay,
            self.settings.interval,
        );
        // a slow sweep delays the next tick instead of bunching ticks up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!("scheduled sweep failed: {:#}", e);
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SchedulerCommand::SweepNow { respond_to } => {
                            debug!("received SweepNow command");
                            let result = self.sweep().await;
                            let _ = respond_to.send(result);
                        }

                        SchedulerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        info!("scheduler stopped");
    }

    async fn sweep(&mut self) -> Result<SweepReport> {
        let policy = self.settings.policy;
        let outcome = AssertUnwindSafe(self.service.sweep(policy))
            .catch_unwind()
            .await;

        let report = match outcome {
            Ok(result) => result.context("sweep could not start")?,
            Err(_) => anyhow::bail!("sweep panicked"),
        };

        if report.aborted {
            warn!(
                "sweep aborted after {} failure(s), {} application(s) skipped",
                report.failed.len(),
                report.skipped.len()
            );
        }

        self.report_tx.send_replace(Some(report.clone()));
        Ok(report)
    }
}

/// Handle for controlling a SchedulerActor
///
/// Cloneable; the actor stops once every handle is dropped.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
    report_rx: watch::Receiver<Option<SweepReport>>,
}

impl SchedulerHandle {
    /// Spawn the actor as a tokio task
    pub fn spawn(service: MetricsService, settings: SchedulerSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (report_tx, report_rx) = watch::channel(None);

        let actor = SchedulerActor::new(service, settings, cmd_rx, report_tx);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            report_rx,
        }
    }

    /// Sweep immediately and wait for the report
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::SweepNow { respond_to: tx })
            .await
            .context("failed to send SweepNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Report of the most recently finished sweep, if any
    pub fn last_report(&self) -> Option<SweepReport> {
        self.report_rx.borrow().clone()
    }

    /// Gracefully shut down the scheduler
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
