//! Integration tests for the HTTP transport.
//!
//! These tests run the transport against a local mock endpoint and verify the
//! request it produces and how each kind of response is classified.

use std::net::TcpListener;
use std::time::Duration;

use serde_json::json;
use simpleanalytics::sender::{HttpTransport, Transport, TransportConfig, TransportError};
use simpleanalytics::types::{Event, EventBuilder, EventKind};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

fn create_transport(server: &MockServer) -> HttpTransport {
    let config = TransportConfig {
        endpoint: format!("{}/events", server.uri()),
        timeout: Duration::from_secs(5),
    };
    HttpTransport::new(config).expect("mock endpoint should be valid")
}

fn create_pageview() -> Event {
    EventBuilder::new(EventKind::Pageview, "example.com")
        .user_agent("Mozilla/5.0 (Test)")
        .path("/home")
        .unique(true)
        .build()
}

/// Returns a local address with nothing listening on it.
fn unused_local_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/events")
}

// =============================================================================
// Request Shape
// =============================================================================

#[tokio::test]
async fn test_posts_json_body_with_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "type": "pageview",
            "hostname": "example.com",
            "event": "pageview",
            "ua": "Mozilla/5.0 (Test)",
            "path": "/home",
            "unique": true,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = create_transport(&mock_server);
    let result = transport.send(&create_pageview()).await;

    assert!(result.is_ok(), "Send should succeed: {:?}", result);
}

#[tokio::test]
async fn test_metadata_is_sent_as_string_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .and(body_json(json!({
            "type": "event",
            "hostname": "example.com",
            "event": "signup",
            "path": "/",
            "metadata": "{\"source\":\"ad\"}",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let event = EventBuilder::new(EventKind::Event, "example.com")
        .name("signup")
        .path("/")
        .metadata(Some(r#"{"source":"ad"}"#.to_string()))
        .build();

    let transport = create_transport(&mock_server);
    assert!(transport.send(&event).await.is_ok());
}

// =============================================================================
// Outcome Classification
// =============================================================================

#[tokio::test]
async fn test_any_2xx_is_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let transport = create_transport(&mock_server);
    assert!(transport.send(&create_pageview()).await.is_ok());
}

#[tokio::test]
async fn test_client_error_maps_to_http_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad hostname"))
        .mount(&mock_server)
        .await;

    let transport = create_transport(&mock_server);
    let err = transport.send(&create_pageview()).await.unwrap_err();

    assert!(matches!(err, TransportError::HttpStatus(400)), "got {err:?}");
}

/// Server errors are not retried: exactly one request is made.
#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal server error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = create_transport(&mock_server);
    let err = transport.send(&create_pageview()).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_redirect_is_not_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&mock_server)
        .await;

    let transport = create_transport(&mock_server);
    let err = transport.send(&create_pageview()).await.unwrap_err();

    assert!(matches!(err, TransportError::HttpStatus(304)));
}

#[tokio::test]
async fn test_connection_refused_maps_to_network_error() {
    let transport =
        HttpTransport::new(TransportConfig::with_endpoint(unused_local_endpoint())).unwrap();

    let err = transport.send(&create_pageview()).await.unwrap_err();

    assert!(matches!(err, TransportError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_timeout_maps_to_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let config = TransportConfig {
        endpoint: format!("{}/events", mock_server.uri()),
        timeout: Duration::from_millis(200),
    };
    let transport = HttpTransport::new(config).unwrap();

    let err = transport.send(&create_pageview()).await.unwrap_err();
    assert!(matches!(err, TransportError::Network(_)), "got {err:?}");
}
