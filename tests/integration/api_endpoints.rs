//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Registration answers with the expected messages and status codes
//! - Catalog management endpoints return correct responses
//! - On-demand collection returns the published envelope
//! - Authentication middleware functions properly

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use metrics_relay::{
    actors::{SchedulerHandle, SchedulerSettings},
    api::{
        ApiConfig, ApiState,
        routes::applications::{ALREADY_REGISTERED, INVALID, VALID},
        spawn_api_server,
    },
    config::SweepPolicy,
    service::MetricsService,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::helpers::{StubUpstream, app, relay_with};

const TOKEN: &str = "test-token";

// Helper to create test API server
async fn spawn_test_api(
    service: MetricsService,
    scheduler: Option<SchedulerHandle>,
    auth_token: Option<&str>,
) -> SocketAddr {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        auth_token: auth_token.map(str::to_string),
        enable_cors: true,
    };

    spawn_api_server(config, ApiState::new(service, scheduler))
        .await
        .unwrap()
}

async fn open_api(upstream: Arc<StubUpstream>) -> (SocketAddr, reqwest::Client) {
    let relay = relay_with(upstream, &["up", "node_load1"]);
    (spawn_test_api(relay.service, None, None).await, reqwest::Client::new())
}

async fn register(client: &reqwest::Client, addr: SocketAddr, id: &str) -> (StatusCode, String) {
    let response = client
        .post(format!("http://{addr}/metrics/add-application"))
        .body(id.to_string())
        .send()
        .await
        .unwrap();
    (response.status(), response.text().await.unwrap())
}

#[tokio::test]
async fn test_add_application_messages() {
    let (addr, client) = open_api(StubUpstream::new(&["checkout"], &["up"], 1)).await;

    assert_eq!(
        register(&client, addr, "checkout").await,
        (StatusCode::OK, VALID.to_string())
    );
    assert_eq!(
        register(&client, addr, "checkout").await,
        (StatusCode::OK, ALREADY_REGISTERED.to_string())
    );
    assert_eq!(
        register(&client, addr, "billing").await,
        (StatusCode::BAD_REQUEST, INVALID.to_string())
    );
    assert_eq!(
        register(&client, addr, "bad id\"}").await,
        (StatusCode::BAD_REQUEST, INVALID.to_string())
    );
}

#[tokio::test]
async fn test_get_metrics_returns_envelope() {
    let (addr, client) = open_api(StubUpstream::new(&["checkout"], &["up"], 12)).await;
    register(&client, addr, "checkout").await;

    let response = client
        .get(format!("http://{addr}/metrics/checkout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["application_id"], "checkout");
    assert_eq!(body["metrics"]["total_count"], 12);
    assert_eq!(body["metrics"]["returned_count"], 10);
    assert_eq!(body["metrics"]["metrics"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_get_metrics_without_data_is_not_found() {
    let upstream = StubUpstream::new(&["checkout"], &["up"], 1);
    let (addr, client) = open_api(upstream.clone()).await;
    register(&client, addr, "checkout").await;
    upstream.set_rows(0);

    let response = client
        .get(format!("http://{addr}/metrics/checkout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_deregister_application() {
    let (addr, client) = open_api(StubUpstream::new(&["checkout"], &["up"], 1)).await;
    register(&client, addr, "checkout").await;

    let url = format!("http://{addr}/metrics/applications/checkout");
    let response = client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"application_id": "checkout", "removed": true}));

    let response = client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // catalog survives deregistration, registering again goes through validation
    assert_eq!(
        register(&client, addr, "checkout").await,
        (StatusCode::OK, VALID.to_string())
    );
}

#[tokio::test]
async fn test_metric_storage_crud() {
    let (addr, client) = open_api(StubUpstream::new(&[], &[], 0)).await;
    let base = format!("http://{addr}/metrics-storage");

    for metric in ["up", "up", "node_load1"] {
        let response = client
            .post(format!("{base}/add"))
            .json(&json!({"applicationId": "checkout", "metric": metric}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.text().await.unwrap(),
            format!("Metric '{metric}' successfully stored for application 'checkout'")
        );
    }

    let listed: Vec<String> = client
        .get(format!("{base}/checkout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed, vec!["up", "up", "node_load1"]);

    let exists: bool = client
        .get(format!("{base}/exists/checkout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(exists);

    let count: usize = client
        .get(format!("{base}/count/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, 3);

    let response = client
        .delete(format!("{base}/checkout/metrics/up"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text().await.unwrap(),
        "Metric 'up' successfully deleted from application 'checkout'"
    );

    let response = client
        .delete(format!("{base}/checkout/metrics/kube_pod_status_phase"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let all: Value = client
        .get(format!("{base}/all"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all, json!({"checkout": ["up", "node_load1"]}));

    let response = client.delete(format!("{base}/checkout")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text().await.unwrap(),
        "Application 'checkout' and its 2 metrics successfully deleted"
    );

    let response = client.get(format!("{base}/checkout")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metric_storage_rejects_invalid_input() {
    let (addr, client) = open_api(StubUpstream::new(&[], &[], 0)).await;

    let response = client
        .post(format!("http://{addr}/metrics-storage/add"))
        .json(&json!({"applicationId": "checkout", "metric": "up{job=\"x\"}"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().starts_with("Error storing metric"));

    let exists: bool = client
        .get(format!("http://{addr}/metrics-storage/exists/unknown"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!exists);
}

#[tokio::test]
async fn test_clear_all_and_counts() {
    let (addr, client) = open_api(StubUpstream::new(&[], &[], 0)).await;
    let base = format!("http://{addr}/metrics-storage");

    for app in ["checkout", "billing"] {
        client
            .post(format!("{base}/add"))
            .json(&json!({"applicationId": app, "metric": "up"}))
            .send()
            .await
            .unwrap();
    }

    let apps: usize = client
        .get(format!("{base}/count/applications"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(apps, 2);

    let ids: Vec<String> = client
        .get(format!("{base}/applications"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids, vec!["billing", "checkout"]);

    let response = client.delete(format!("{base}/all")).send().await.unwrap();
    assert_eq!(response.text().await.unwrap(), "All metrics successfully cleared");

    let apps: usize = client
        .get(format!("{base}/count/applications"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(apps, 0);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let (addr, client) = open_api(StubUpstream::new(&["checkout"], &["up"], 1)).await;
    register(&client, addr, "checkout").await;

    let body: Value = client
        .get(format!("http://{addr}/api/v1/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["storage_backend"], "memory");
    assert_eq!(body["registered_applications"], json!(["checkout"]));
    assert_eq!(body["catalog"]["metrics"], 1);
    assert_eq!(body["destinations"], json!(["metrics-topic", "metrics.exchange"]));
    assert!(body.get("last_sweep").is_none());
}

#[tokio::test]
async fn test_authentication() {
    let relay = relay_with(StubUpstream::new(&[], &[], 0), &["up"]);
    let addr = spawn_test_api(relay.service, None, Some(TOKEN)).await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/metrics-storage/count/metrics");

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.get(&url).bearer_auth("wrong").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid token");

    let response = client.get(&url).bearer_auth(TOKEN).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // health stays public
    let response = client
        .get(format!("http://{addr}/api/v1/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_stats_answers_during_running_sweep() {
    let upstream = StubUpstream::new(&["checkout"], &["up"], 1);
    let relay = relay_with(upstream.clone(), &["up"]);
    relay.service.register(&app("checkout")).await.unwrap();

    upstream.set_delay(Duration::from_secs(3));
    let scheduler = SchedulerHandle::spawn(
        relay.service.clone(),
        SchedulerSettings {
            interval: Duration::from_secs(3600),
            initial_delay: Duration::from_millis(10),
            policy: SweepPolicy::Abort,
        },
    );
    let addr = spawn_test_api(relay.service, Some(scheduler.clone()), None).await;

    // first sweep is now waiting on the upstream
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let response = client
        .get(format!("http://{addr}/api/v1/stats"))
        .send()
        .await
        .expect("stats blocked behind the running sweep");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["registered_applications"], json!(["checkout"]));
    assert!(body.get("last_sweep").is_none());

    scheduler.shutdown().await.unwrap();
}
