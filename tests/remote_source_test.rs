//! Integration tests for RemoteSource using wiremock
//!
//! These tests validate the HTTP source's status mapping, retry policy and
//! the caching decorator's offline fallback against mock servers.

mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tercume::error::Error;
use tercume::messages::Messages;
use tercume::runtime::I18n;
use tercume::source::{
    CachingSource, CachingSourceConfig, MemoryStorage, MessageSource, NamespaceSource,
    RemoteConfig, RemoteSource,
};
use tercume::utils::retry::RetryConfig;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote(server: &MockServer) -> RemoteSource {
    RemoteSource::new(
        RemoteConfig::new(server.uri()).with_retry(RetryConfig::with_delays(2, 1, 10)),
    )
    .unwrap()
}

/// Test successful load from mock server
#[tokio::test]
async fn test_load_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tr.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::turkish()))
        .mount(&mock_server)
        .await;

    let source = remote(&mock_server);
    let messages = source.load("tr").await.unwrap();

    assert_eq!(messages.find("greeting"), Some("Merhaba {name}!"));
    assert_eq!(messages.find("nav.home"), Some("Ana sayfa"));
}

/// Test 404 maps to LocaleUnavailable and does not retry
#[tokio::test]
async fn test_404_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/de.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = remote(&mock_server);
    let err = source.load("de").await.unwrap_err();

    assert_eq!(err, Error::unavailable("de"));
}

/// Test client errors are not retried
#[tokio::test]
async fn test_client_error_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/en.json"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = remote(&mock_server).load("en").await.unwrap_err();
    assert!(matches!(err, Error::Source { status: Some(403), .. }));
    assert!(!err.is_recoverable());
}

/// Test that server errors trigger retries
#[tokio::test]
async fn test_server_error_retry() {
    let mock_server = MockServer::start().await;

    // Return 500 twice, then succeed
    Mock::given(method("GET"))
        .and(path("/en.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/en.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::english()))
        .mount(&mock_server)
        .await;

    let result = remote(&mock_server).load("en").await;
    assert!(result.is_ok(), "Should succeed after retries: {:?}", result.err());
}

/// Test max retries exceeded
#[tokio::test]
async fn test_max_retries_exceeded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/en.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let err = remote(&mock_server).load("en").await.unwrap_err();
    assert!(matches!(err, Error::Source { status: Some(503), .. }));
}

/// Test invalid JSON is a source error
#[tokio::test]
async fn test_invalid_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/en.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let source = RemoteSource::new(
        RemoteConfig::new(mock_server.uri()).with_retry(RetryConfig::new(0)),
    )
    .unwrap();

    let err = source.load("en").await.unwrap_err();
    assert!(matches!(err, Error::Source { status: None, .. }));
}

/// Test a JSON body that is not an object is a source error
#[tokio::test]
async fn test_non_object_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/en.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "an", "object"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = RemoteSource::new(
        RemoteConfig::new(mock_server.uri()).with_retry(RetryConfig::new(0)),
    )
    .unwrap();

    let err = source.load("en").await.unwrap_err();
    match err {
        Error::Source { locale, status, reason } => {
            assert_eq!(locale, "en");
            assert_eq!(status, None);
            assert!(reason.contains("array"), "reason: {reason}");
        }
        other => panic!("expected source error, got {other:?}"),
    }
}

/// Test configured headers and extension are sent
#[tokio::test]
async fn test_headers_and_extension() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/en.i18n.json"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::english()))
        .mount(&mock_server)
        .await;

    let source = RemoteSource::new(
        RemoteConfig::new(mock_server.uri())
            .with_extension(".i18n.json")
            .with_header("x-api-key", "secret"),
    )
    .unwrap();

    assert!(source.load("en").await.is_ok());
}

/// Test the transform reshapes the payload
#[tokio::test]
async fn test_transform() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/en.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"locale": "en", "messages": common::english()}})),
        )
        .mount(&mock_server)
        .await;

    let source = remote(&mock_server).with_transform(|payload, _locale| {
        Messages::from_value(payload["data"]["messages"].clone())
    });

    let messages = source.load("en").await.unwrap();
    assert_eq!(messages.find("greeting"), Some("Hello {name}!"));
}

/// Test namespace URL layout
#[tokio::test]
async fn test_namespace_load() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tr/checkout.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "Ödeme"})))
        .mount(&mock_server)
        .await;

    let fragment = remote(&mock_server)
        .load_namespace("tr", "checkout")
        .await
        .unwrap();
    assert_eq!(fragment.find("title"), Some("Ödeme"));
}

/// Test stale cache is served once the endpoint goes away
#[tokio::test]
async fn test_caching_serves_stale_when_offline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tr.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::turkish()))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tr.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let source = CachingSource::with_config(
        RemoteSource::new(RemoteConfig::new(mock_server.uri()).with_retry(RetryConfig::new(0)))
            .unwrap(),
        Arc::new(MemoryStorage::new()),
        CachingSourceConfig::with_ttl(Duration::ZERO),
    );

    let first = source.load("tr").await.unwrap();
    let second = source.load("tr").await.unwrap();
    assert_eq!(first, second);
    assert!(source.has_locale("tr"));
}

/// Test the runtime end to end over HTTP
#[tokio::test]
async fn test_runtime_over_remote() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tr.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::turkish()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/en.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::english()))
        .mount(&mock_server)
        .await;

    let i18n = I18n::builder("tr-TR", "en")
        .source(remote(&mock_server))
        .build();

    i18n.load_locale("tr").await.unwrap();
    i18n.load_locale("en").await.unwrap();

    assert_eq!(i18n.translate("nav.home"), "Ana sayfa");
    assert_eq!(i18n.translate("nav.about"), "About");
    assert_eq!(
        i18n.translate_with("greeting", &tercume::Params::new().with("name", "Ayşe")),
        "Merhaba Ayşe!"
    );
}
