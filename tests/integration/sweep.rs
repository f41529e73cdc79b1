//! Scheduled sweeps across registered applications
//!
//! Under the default abort policy the first failing application ends the
//! tick; applications after it wait for the next one.

use std::time::Duration;

use metrics_relay::{
    actors::{SchedulerHandle, SchedulerSettings},
    config::SweepPolicy,
};
use pretty_assertions::assert_eq;

use crate::helpers::{StubUpstream, app, relay_with};

async fn two_apps(upstream: std::sync::Arc<StubUpstream>) -> crate::helpers::TestRelay {
    let relay = relay_with(upstream, &["up"]);
    relay.service.register(&app("alpha")).await.unwrap();
    relay.service.register(&app("beta")).await.unwrap();
    relay
}

#[tokio::test]
async fn test_failure_aborts_rest_of_tick_then_recovers() {
    let upstream = StubUpstream::new(&["alpha", "beta"], &["up"], 1);
    let relay = two_apps(upstream.clone()).await;

    upstream.fail_next("alpha", 1);

    let first = relay.service.sweep(SweepPolicy::Abort).await.unwrap();
    assert!(first.aborted);
    assert!(first.processed.is_empty());
    assert_eq!(first.failed.len(), 1);
    assert_eq!(first.failed[0].application_id, app("alpha"));
    assert_eq!(first.skipped, vec![app("beta")]);

    let second = relay.service.sweep(SweepPolicy::Abort).await.unwrap();
    assert!(!second.aborted);
    assert_eq!(second.processed, vec![app("alpha"), app("beta")]);
    assert!(second.skipped.is_empty());
}

#[tokio::test]
async fn test_continue_policy_processes_remaining_apps() {
    let upstream = StubUpstream::new(&["alpha", "beta"], &["up"], 1);
    let relay = two_apps(upstream.clone()).await;

    upstream.fail_next("alpha", 1);

    let report = relay.service.sweep(SweepPolicy::Continue).await.unwrap();
    assert!(!report.aborted);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.processed, vec![app("beta")]);
}

#[tokio::test]
async fn test_sweep_publishes_one_envelope_per_app() {
    let upstream = StubUpstream::new(&["alpha", "beta"], &["up"], 2);
    let mut relay = two_apps(upstream).await;

    relay.service.sweep(SweepPolicy::Abort).await.unwrap();

    let mut keys = vec![];
    while let Ok(message) = relay.topic_rx.try_recv() {
        keys.push(message.routing_key);
    }
    assert_eq!(keys, vec!["metrics.alpha", "metrics.beta"]);
    assert_eq!(relay.queue_rx.len(), 2);
}

#[tokio::test]
async fn test_empty_registry_sweep_is_clean() {
    let relay = relay_with(StubUpstream::new(&[], &[], 0), &["up"]);

    let report = relay.service.sweep(SweepPolicy::Abort).await.unwrap();
    assert!(report.is_clean());
    assert!(report.processed.is_empty());
}

#[tokio::test]
async fn test_scheduler_keeps_running_after_failed_tick() {
    let upstream = StubUpstream::new(&["alpha", "beta"], &["up"], 1);
    let relay = two_apps(upstream.clone()).await;
    upstream.fail_next("alpha", 1);

    let handle = SchedulerHandle::spawn(
        relay.service.clone(),
        SchedulerSettings {
            interval: Duration::from_secs(3600),
            initial_delay: Duration::from_secs(3600),
            policy: SweepPolicy::Abort,
        },
    );

    let first = handle.sweep_now().await.unwrap();
    assert_eq!(first.skipped, vec![app("beta")]);

    let second = handle.sweep_now().await.unwrap();
    assert_eq!(second.processed, vec![app("alpha"), app("beta")]);
    assert_eq!(handle.last_report(), Some(second));

    handle.shutdown().await.unwrap();
}
