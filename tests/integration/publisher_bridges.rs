//! Broker bridges against mock REST endpoints

use std::sync::Arc;

use assert_matches::assert_matches;
use metrics_relay::{
    MetricsSummary, PublishEnvelope,
    publisher::{KafkaRestBus, MessageBus, OutboundMessage, PublishError, RabbitHttpBus, routing_key},
};
use reqwest::{Client, StatusCode};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{basic_auth, body_partial_json, header, method, path},
};

use crate::helpers::app;

fn message() -> OutboundMessage {
    let app = app("checkout");
    let envelope = PublishEnvelope::new(app.clone(), MetricsSummary::capped(vec![], 10));
    OutboundMessage {
        routing_key: routing_key(&app),
        payload: Arc::from(serde_json::to_string(&envelope).unwrap()),
        application_id: app,
    }
}

#[tokio::test]
async fn test_kafka_bridge_posts_keyed_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics/metrics-topic"))
        .and(header("content-type", "application/vnd.kafka.json.v2+json"))
        .and(body_partial_json(json!({
            "records": [{ "key": "checkout", "value": { "application_id": "checkout" } }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"offsets": [{"partition": 0, "offset": 7}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let bus = KafkaRestBus::new(Client::new(), server.uri(), "metrics-topic").unwrap();
    assert_eq!(bus.name(), "metrics-topic");
    bus.publish(&message()).await.unwrap();
}

#[tokio::test]
async fn test_kafka_bridge_http_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics/metrics-topic"))
        .respond_with(ResponseTemplate::new(500).set_body_string("broker down"))
        .mount(&server)
        .await;

    let bus = KafkaRestBus::new(Client::new(), server.uri(), "metrics-topic").unwrap();

    assert_matches!(
        bus.publish(&message()).await,
        Err(PublishError::Rejected { status, body, .. })
            if status == StatusCode::INTERNAL_SERVER_ERROR && body == "broker down"
    );
}

#[tokio::test]
async fn test_kafka_bridge_record_error_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics/metrics-topic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "offsets": [{"partition": null, "offset": null, "error_code": 40403, "error": "topic not found"}]
        })))
        .mount(&server)
        .await;

    let bus = KafkaRestBus::new(Client::new(), server.uri(), "metrics-topic").unwrap();

    assert_matches!(
        bus.publish(&message()).await,
        Err(PublishError::Refused { reason, .. }) if reason == "topic not found"
    );
}

#[tokio::test]
async fn test_rabbit_bridge_publishes_with_routing_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/exchanges/%2F/metrics.exchange/publish"))
        .and(basic_auth("relay", "secret"))
        .and(body_partial_json(json!({
            "routing_key": "metrics.checkout",
            "payload_encoding": "string"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"routed": true})))
        .expect(1)
        .mount(&server)
        .await;

    let bus = RabbitHttpBus::new(
        Client::new(),
        server.uri(),
        "/",
        "metrics.exchange",
        "relay",
        "secret",
    )
    .unwrap();
    bus.publish(&message()).await.unwrap();
}

#[tokio::test]
async fn test_rabbit_bridge_unrouted_message_is_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"routed": false})))
        .mount(&server)
        .await;

    let bus = RabbitHttpBus::new(
        Client::new(),
        server.uri(),
        "/",
        "metrics.exchange",
        "guest",
        "guest",
    )
    .unwrap();

    assert!(bus.publish(&message()).await.is_ok());
}

#[tokio::test]
async fn test_rabbit_bridge_unauthorized_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let bus = RabbitHttpBus::new(
        Client::new(),
        server.uri(),
        "/",
        "metrics.exchange",
        "guest",
        "wrong",
    )
    .unwrap();

    assert_matches!(
        bus.publish(&message()).await,
        Err(PublishError::Rejected { status, .. }) if status == StatusCode::UNAUTHORIZED
    );
}
