//! Registration and catalog edits racing the scheduler

use std::sync::atomic::Ordering;

use metrics_relay::{config::SweepPolicy, registry::RegistrationOutcome};

use crate::helpers::{StubUpstream, app, metric, relay_with};

#[tokio::test]
async fn test_concurrent_registration_runs_discovery_once() {
    let upstream = StubUpstream::new(&["checkout"], &["up"], 1);
    let relay = relay_with(upstream.clone(), &["up", "node_load1"]);

    let mut tasks = vec![];
    for _ in 0..8 {
        let service = relay.service.clone();
        tasks.push(tokio::spawn(async move { service.register(&app("checkout")).await.unwrap() }));
    }

    let mut registered = 0;
    for task in tasks {
        if task.await.unwrap() == RegistrationOutcome::Registered {
            registered += 1;
        }
    }

    assert_eq!(registered, 1);
    // one discovery pass over two reference metrics
    assert_eq!(upstream.named_calls.load(Ordering::SeqCst), 2);
    assert_eq!(relay.service.catalog().metric_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_catalog_edits_during_sweeps_keep_counts_consistent() {
    let upstream = StubUpstream::new(&["checkout"], &["up"], 1);
    let relay = relay_with(upstream, &["up"]);
    relay.service.register(&app("checkout")).await.unwrap();

    let sweeper = {
        let service = relay.service.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                service.sweep(SweepPolicy::Continue).await.unwrap();
            }
        })
    };

    let editors: Vec<_> = (0..4)
        .map(|i| {
            let catalog = relay.service.catalog().clone();
            tokio::spawn(async move {
                let app = app(&format!("app-{i}"));
                for _ in 0..25 {
                    catalog.add(&app, &metric("up")).await.unwrap();
                }
                for _ in 0..10 {
                    catalog.remove_one(&app, &metric("up")).await.unwrap();
                }
            })
        })
        .collect();

    for editor in editors {
        editor.await.unwrap();
    }
    sweeper.await.unwrap();

    let catalog = relay.service.catalog();
    let all = catalog.all().await.unwrap();
    let total: usize = all.values().map(Vec::len).sum();

    assert_eq!(catalog.metric_count().await.unwrap(), total);
    assert_eq!(total, 1 + 4 * 15);
    assert_eq!(catalog.application_count().await.unwrap(), 5);
}
