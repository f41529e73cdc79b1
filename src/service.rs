//! Registration and the fetch → parse → publish pipeline
//!
//! ```text
//! register(app) ──▶ ApplicationRegistry::validate ──Registered──▶ CatalogDiscovery::discover
//!
//! collect(app)  ──▶ catalog lookup ──▶ fetch_named ──▶ parse ──▶ cap ──▶ FanoutPublisher
//!                        │ empty
//!                        └──▶ fetch_all (liveness) ──▶ NoMetricsConfigured
//!
//! sweep(policy) ──▶ collect(app) for each registered app, in registration order
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::actors::messages::{SweepFailure, SweepReport};
use crate::catalog::{CatalogDiscovery, MetricCatalog};
use crate::config::SweepPolicy;
use crate::publisher::FanoutPublisher;
use crate::registry::{ApplicationRegistry, RegistrationOutcome};
use crate::upstream::{ResponseParser, UpstreamClient};
use crate::{ApplicationId, MetricsSummary, PublishEnvelope, RelayError, RelayResult, SAMPLE_CAP};

/// Everything one relay instance needs, cheap to clone
#[derive(Clone)]
pub struct MetricsService {
    upstream: Arc<dyn UpstreamClient>,
    registry: ApplicationRegistry,
    catalog: MetricCatalog,
    discovery: CatalogDiscovery,
    publisher: FanoutPublisher,
}

impl MetricsService {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        registry: ApplicationRegistry,
        catalog: MetricCatalog,
        discovery: CatalogDiscovery,
        publisher: FanoutPublisher,
    ) -> Self {
        Self {
            upstream,
            registry,
            catalog,
            discovery,
            publisher,
        }
    }

    pub fn registry(&self) -> &ApplicationRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn publisher(&self) -> &FanoutPublisher {
        &self.publisher
    }

    /// Validate `app` and, when it is newly registered, discover its catalog
    ///
    /// If storing the discovered catalog fails the registration is rolled
    /// back, so a later call validates and discovers again.
    #[instrument(skip(self), fields(app = %app))]
    pub async fn register(&self, app: &ApplicationId) -> RelayResult<RegistrationOutcome> {
        let outcome = self.registry.validate(app).await?;

        if outcome == RegistrationOutcome::Registered {
            match self.discovery.discover(app).await {
                Ok(found) if found.is_empty() => {
                    warn!("registered without metrics; add them through the storage endpoints");
                }
                Ok(_) => {}
                Err(e) => {
                    error!("storing discovered metrics failed, rolling back registration: {e}");
                    if let Err(rollback) = self.registry.deregister(app).await {
                        error!("rollback of registration failed: {rollback}");
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(outcome)
    }

    /// Fetch the catalog metrics of `app`, publish the capped envelope and return it
    #[instrument(skip(self), fields(app = %app))]
    pub async fn collect(&self, app: &ApplicationId) -> RelayResult<PublishEnvelope> {
        let names = self.catalog.get(app).await?.unwrap_or_default();

        if names.is_empty() {
            // liveness only; there is nothing narrow to ask for
            let response = self.upstream.fetch_all(app).await?;
            if ResponseParser::row_count(&response) == 0 {
                return Err(RelayError::NotFound(app.clone()));
            }
            return Err(RelayError::NoMetricsConfigured(app.clone()));
        }

        let response = self.upstream.fetch_named(app, &names).await?;
        let samples = ResponseParser::parse(&response);
        if samples.is_empty() {
            return Err(RelayError::NotFound(app.clone()));
        }

        let envelope = PublishEnvelope::new(app.clone(), MetricsSummary::capped(samples, SAMPLE_CAP));
        debug!(
            total = envelope.summary.total_count,
            returned = envelope.summary.returned_count,
            "publishing envelope"
        );

        let report = self.publisher.publish(&envelope).await?;
        info!("published to {report}");
        report.into_result()?;

        Ok(envelope)
    }

    /// Run `collect` for every registered application
    ///
    /// With [`SweepPolicy::Abort`] the first failure ends the sweep and the
    /// remaining applications are counted as skipped.
    #[instrument(skip(self))]
    pub async fn sweep(&self, policy: SweepPolicy) -> RelayResult<SweepReport> {
        let started_at = Utc::now();
        let applications = self.registry.applications().await?;
        let mut report = SweepReport::new(started_at);

        for (index, app) in applications.iter().enumerate() {
            match self.collect(app).await {
                Ok(_) => report.processed.push(app.clone()),
                Err(e) => {
                    error!("pipeline failed for {app}: {e}");
                    report.failed.push(SweepFailure {
                        application_id: app.clone(),
                        error: e.to_string(),
                    });

                    if policy == SweepPolicy::Abort {
                        report.skipped = applications[index + 1..].to_vec();
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "sweep finished"
        );
        Ok(report)
    }
}
