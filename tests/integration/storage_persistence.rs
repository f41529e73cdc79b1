//! Integration tests for storage persistence
//!
//! These tests verify that:
//! - Registrations and catalogs survive reopening the SQLite database
//! - Registration order is preserved across restarts
//! - A restarted relay keeps polling previously registered applications

use std::sync::Arc;

use metrics_relay::{
    catalog::{CatalogDiscovery, MetricCatalog},
    config::SweepPolicy,
    publisher::{ChannelBus, FanoutPublisher},
    registry::{ApplicationRegistry, RegistrationOutcome},
    service::MetricsService,
    storage::{CatalogStore, RegistryStore, sqlite::SqliteStore},
    upstream::UpstreamClient,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::helpers::{StubUpstream, app, metrics};

fn sqlite_service(store: Arc<SqliteStore>, upstream: Arc<StubUpstream>) -> MetricsService {
    let upstream: Arc<dyn UpstreamClient> = upstream;
    let catalog = MetricCatalog::new(store.clone());
    let discovery = CatalogDiscovery::new(upstream.clone(), catalog.clone(), 2)
        .with_reference(metrics(&["up", "node_load1", "kube_pod_status_phase"]));

    MetricsService::new(
        upstream.clone(),
        ApplicationRegistry::new(store, upstream),
        catalog,
        discovery,
        FanoutPublisher::new(
            Arc::new(ChannelBus::new("metrics-topic", 8)),
            Arc::new(ChannelBus::new("metrics.exchange", 8)),
        ),
    )
}

#[tokio::test]
async fn test_registry_and_catalog_survive_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("relay.db");
    let upstream = StubUpstream::new(&["zeta", "alpha"], &["up", "node_load1"], 1);

    {
        let store = Arc::new(SqliteStore::new(&db_path).await.unwrap());
        let service = sqlite_service(store, upstream.clone());

        for id in ["zeta", "alpha"] {
            assert_eq!(
                service.register(&app(id)).await.unwrap(),
                RegistrationOutcome::Registered
            );
        }
    }

    let store = Arc::new(SqliteStore::new(&db_path).await.unwrap());

    assert_eq!(store.list().await.unwrap(), vec![app("zeta"), app("alpha")]);
    assert_eq!(
        CatalogStore::get(&*store, &app("alpha")).await.unwrap(),
        Some(metrics(&["up", "node_load1"]))
    );
    assert_eq!(store.metric_count().await.unwrap(), 4);

    let service = sqlite_service(store, upstream);
    assert_eq!(
        service.register(&app("zeta")).await.unwrap(),
        RegistrationOutcome::AlreadyRegistered
    );

    let report = service.sweep(SweepPolicy::Abort).await.unwrap();
    assert_eq!(report.processed, vec![app("zeta"), app("alpha")]);
}

#[tokio::test]
async fn test_catalog_edits_persist() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("relay.db");

    {
        let store = SqliteStore::new(&db_path).await.unwrap();
        store
            .extend(&app("checkout"), &metrics(&["up", "up", "node_load1"]))
            .await
            .unwrap();
        assert!(store.remove_one(&app("checkout"), &metrics(&["up"])[0]).await.unwrap());
        store.append(&app("billing"), &metrics(&["up"])[0]).await.unwrap();
        assert!(store.remove_application(&app("billing")).await.unwrap().is_some());
    }

    let store = SqliteStore::new(&db_path).await.unwrap();
    assert_eq!(
        CatalogStore::get(&store, &app("checkout")).await.unwrap(),
        Some(metrics(&["up", "node_load1"]))
    );
    assert!(!store.exists(&app("billing")).await.unwrap());
    assert_eq!(store.application_count().await.unwrap(), 1);
}
