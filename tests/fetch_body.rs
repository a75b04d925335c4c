use std::sync::Arc;

use meteor_fetch::config::{ProxyEnv, RequestOptions, WrapperConfig};
use meteor_fetch::error::FetchError;
use meteor_fetch::http::RequestWrapper;
use meteor_fetch::session::MemoryCredentialStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn wrapper() -> RequestWrapper {
    meteor_fetch::logging::init();
    let config = WrapperConfig {
        accounts_domain: "accounts.example.com".to_string(),
        tools_version: Some("2.14".to_string()),
    };
    RequestWrapper::new(config, Arc::new(MemoryCredentialStore::new()))
        .with_proxy_env(ProxyEnv::default())
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_fetch_body_returns_body_on_success() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"releases\": []}"))
        .mount(&server)
        .await;

    let body = wrapper()
        .fetch_body(RequestOptions::url(format!("{}/manifest", server.uri())))
        .await
        .expect("request should succeed");
    assert_eq!(body, "{\"releases\": []}");
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_fetch_body_raises_envelope_on_client_error() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Reason", "gone")
                .set_body_string("not found"),
        )
        .mount(&server)
        .await;

    let err = wrapper()
        .fetch_body(RequestOptions::url(format!("{}/missing", server.uri())))
        .await
        .expect_err("status 404 should fail");
    match err {
        FetchError::Server(envelope) => {
            assert_eq!(envelope.status, 404);
            assert_eq!(envelope.body, "not found");
            assert_eq!(
                envelope.headers.get("X-Reason").map(|v| v.to_str().unwrap()),
                Some("gone")
            );
        }
        other => panic!("expected server error, got {:?}", other),
    }
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_perform_request_itself_returns_error_statuses() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    // Status inspection is the caller's job on the lower-level path.
    let envelope = wrapper()
        .perform_request(RequestOptions::url(format!("{}/missing", server.uri())))
        .await
        .expect("a 404 response is still a completed request");
    assert_eq!(envelope.status, 404);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_fetch_body_wraps_connectivity_failure_as_offline() {
    if !can_bind_localhost() {
        return;
    }

    // Grab a port that nothing is listening on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };

    let err = wrapper()
        .fetch_body(RequestOptions::url(format!("http://127.0.0.1:{}/", port)))
        .await
        .expect_err("connection should be refused");
    assert!(matches!(err, FetchError::Offline(_)));
}
