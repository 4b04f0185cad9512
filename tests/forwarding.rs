//! Forwarding pipeline tests against a recording mock upstream.

use std::fs;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Method, StatusCode};

use ajax_gateway::forward::ForwardError;

mod common;

const NO_DELAY: Duration = Duration::ZERO;

#[tokio::test]
async fn test_accept_injected_when_not_configured() {
    let backend = common::start_mock_backend("200 OK", "{}", NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(dir.path(), "");

    let outcome = forwarder
        .forward(Method::GET, &backend.url("/_cat/indices"), None)
        .await
        .unwrap();
    assert_eq!(outcome.endpoint, "default");

    let request = backend.last_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.header("accept"), vec!["application/json"]);
}

#[tokio::test]
async fn test_configured_accept_not_duplicated() {
    let backend = common::start_mock_backend("200 OK", "{}", NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(
        dir.path(),
        r#"
        [[header_collections]]
        name = "json"
        headers = [
            { key = "Accept", value = "application/json" },
            { key = "X-Tenant", value = "blue" },
        ]

        [[endpoints]]
        name = "api"
        headers = "json"
        "#,
    );

    forwarder
        .forward(Method::GET, &backend.url("/"), None)
        .await
        .unwrap();

    let request = backend.last_request();
    assert_eq!(request.header("accept"), vec!["application/json"]);
    assert_eq!(request.header("x-tenant"), vec!["blue"]);
}

#[tokio::test]
async fn test_timeout_parameter_never_reaches_upstream() {
    let backend = common::start_mock_backend("200 OK", "{}", NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(dir.path(), "");

    forwarder
        .forward(Method::GET, &backend.url("/api?a=1&c_timeout=3000&b=2"), None)
        .await
        .unwrap();
    assert_eq!(backend.last_request().target, "/api?a=1&b=2");
}

#[tokio::test]
async fn test_timeout_override_applies_to_call() {
    let backend = common::start_mock_backend("200 OK", "{}", Duration::from_millis(800)).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(dir.path(), "");

    let err = forwarder
        .forward(Method::GET, &backend.url("/slow?c_timeout=100"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::Timeout { .. }), "got {:?}", err);
    assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);

    // without the override the endpoint's own timeout applies
    let outcome = forwarder
        .forward(Method::GET, &backend.url("/slow"), None)
        .await
        .unwrap();
    assert_eq!(outcome.status, StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_status_message_kept() {
    let backend = common::start_mock_backend("404 Index Missing", r#"{"error":"no index"}"#, NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(dir.path(), "");

    let outcome = forwarder
        .forward(Method::GET, &backend.url("/idx/_search"), None)
        .await
        .unwrap();
    assert_eq!(outcome.status, StatusCode::NOT_FOUND);
    assert_eq!(outcome.message, "Index Missing");
    assert_eq!(&outcome.body[..], br#"{"error":"no index"}"#);
}

#[tokio::test]
async fn test_canonical_status_message() {
    let backend = common::start_mock_backend("503 Service Unavailable", "{}", NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(dir.path(), "");

    let outcome = forwarder
        .forward(Method::GET, &backend.url("/"), None)
        .await
        .unwrap();
    assert_eq!(outcome.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(outcome.message, "Service Unavailable");
}

#[tokio::test]
async fn test_post_body_sent_as_json() {
    let backend = common::start_mock_backend("200 OK", "{}", NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(dir.path(), "");

    let body = Bytes::from_static(br#"{"query":{"match_all":{}}}"#);
    forwarder
        .forward(Method::POST, &backend.url("/idx/_search"), Some(body.clone()))
        .await
        .unwrap();

    let request = backend.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.body, body.to_vec());
    assert_eq!(request.header("content-type"), vec!["application/json"]);
    assert_eq!(request.header("content-length"), vec![body.len().to_string().as_str()]);
}

#[tokio::test]
async fn test_file_body_directive() {
    let backend = common::start_mock_backend("200 OK", "{}", NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let bulk = dir.path().join("bulk.ndjson");
    fs::write(&bulk, "{\"index\":{}}\n{\"a\":1}\n").unwrap();
    let (forwarder, _) = common::forwarder(dir.path(), "");

    let directive = serde_json::json!({ "_file_body": { "file": bulk.to_string_lossy() } });
    forwarder
        .forward(
            Method::POST,
            &backend.url("/_bulk"),
            Some(Bytes::from(directive.to_string())),
        )
        .await
        .unwrap();

    let request = backend.last_request();
    assert_eq!(request.body, b"{\"index\":{}}\n{\"a\":1}\n".to_vec());
    assert_eq!(request.header("content-type"), vec!["application/x-ndjson"]);
}

#[tokio::test]
async fn test_selector_routing() {
    let backend = common::start_mock_backend("200 OK", "{}", NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(
        dir.path(),
        r#"
        [[endpoints]]
        name = "search"
        selectors = ["/_SEARCH"]

        [[endpoints]]
        name = "rest"
        "#,
    );

    let search = forwarder
        .forward(Method::GET, &backend.url("/idx/_search"), None)
        .await
        .unwrap();
    assert_eq!(search.endpoint, "search");

    let rest = forwarder
        .forward(Method::GET, &backend.url("/idx/_mapping"), None)
        .await
        .unwrap();
    assert_eq!(rest.endpoint, "rest");
}

#[tokio::test]
async fn test_host_rewritten_by_resolver() {
    let backend = common::start_mock_backend("200 OK", "{}", NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(
        dir.path(),
        r#"
        [[resolvers]]
        expr = "^upstream$"
        value = "127.0.0.1"
        "#,
    );

    let url = format!("http://UPSTREAM:{}/ping", backend.addr.port());
    let route = forwarder.route(url.clone()).await.unwrap();
    assert_eq!(route.url, format!("http://127.0.0.1:{}/ping", backend.addr.port()));

    let outcome = forwarder.forward(Method::GET, &url, None).await.unwrap();
    assert_eq!(outcome.status, StatusCode::OK);
    assert_eq!(backend.last_request().target, "/ping");
}

#[tokio::test]
async fn test_transport_error() {
    let addr = common::closed_addr().await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(dir.path(), "");

    let err = forwarder
        .forward(Method::GET, &format!("http://{}/", addr), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::Transport { .. }), "got {:?}", err);
    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_certificate_errors_ignored_only_when_configured() {
    let addr = common::start_tls_backend(r#"{"tls":true}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(
        dir.path(),
        r#"
        [[endpoints]]
        name = "lab"
        selectors = ["/lab/"]
        ignore_certificate_errors = true
        "#,
    );

    let outcome = forwarder
        .forward(Method::GET, &format!("https://127.0.0.1:{}/lab/health", addr.port()), None)
        .await
        .unwrap();
    assert_eq!(outcome.endpoint, "lab");
    assert_eq!(outcome.status, StatusCode::OK);
    assert_eq!(&outcome.body[..], br#"{"tls":true}"#);

    // the default endpoint verifies certificates
    let err = forwarder
        .forward(Method::GET, &format!("https://127.0.0.1:{}/prod/health", addr.port()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::Transport { ref endpoint, .. } if endpoint == "default"), "got {:?}", err);
}

#[tokio::test]
async fn test_caller_errors() {
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, _) = common::forwarder(dir.path(), "");

    let err = forwarder.forward(Method::GET, "  ", None).await.unwrap_err();
    assert!(matches!(err, ForwardError::MissingParameter("url")));

    let err = forwarder
        .forward(Method::GET, "not a url at all", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::InvalidParameter { .. }));

    let err = forwarder
        .forward(Method::OPTIONS, "http://127.0.0.1:1/", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::UnsupportedMethod(_)));
}

#[tokio::test]
async fn test_reload_picks_up_new_endpoint() {
    let backend = common::start_mock_backend("200 OK", "{}", NO_DELAY).await;
    let dir = tempfile::tempdir().unwrap();
    let (forwarder, changes) = common::forwarder(dir.path(), "");

    let before = forwarder.forward(Method::GET, &backend.url("/"), None).await.unwrap();
    assert_eq!(before.endpoint, "default");

    common::write_settings(
        dir.path(),
        r#"
        [[endpoints]]
        name = "local"
        selectors = ["127\\.0\\.0\\.1"]
        "#,
    );
    changes.bump();
    let after = forwarder.forward(Method::GET, &backend.url("/"), None).await.unwrap();
    assert_eq!(after.endpoint, "local");

    // a broken edit keeps the last good configuration
    common::write_settings(dir.path(), "[[endpoints]]\nname = \"\"\n");
    changes.bump();
    let kept = forwarder.forward(Method::GET, &backend.url("/"), None).await.unwrap();
    assert_eq!(kept.endpoint, "local");
}
