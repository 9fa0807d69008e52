//! Tests d'intégration du client HTTP authentifié (wiremock).


use std::collections::HashMap;
use std::time::Duration;

use fixtures::*;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use trader::{ApiClient, ApiError, ClientConfig};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(config_for(server)).unwrap()
}

#[tokio::test]
async fn test_fetch_token_posts_all_scope_without_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "token": "all" })))
        .respond_with(ok_json(json!({ "access_token": "abc" })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client_for(&server).fetch_token().await.unwrap();
    assert_eq!(token.as_str(), "abc");

    let requests = received(&server).await;
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_fetch_token_http_error() {
    let server = MockServer::start().await;
    mount_endpoint(&server, "POST", "/token", ResponseTemplate::new(401), 1).await;

    let err = client_for(&server).fetch_token().await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 401 }));
}

#[tokio::test]
async fn test_fetch_token_malformed_body() {
    let server = MockServer::start().await;
    mount_endpoint(&server, "POST", "/token", ok_json(json!({ "token": "abc" })), 1).await;

    let err = client_for(&server).fetch_token().await.unwrap_err();
    assert!(err.is_decoding());
}

#[tokio::test]
async fn test_request_attaches_fresh_bearer_and_body() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/accounts/ibkr/sso/create"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "credential": "alice", "ip": "1.2.3.4" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let body = json!({ "credential": "alice", "ip": "1.2.3.4" });
    let bytes = client_for(&server)
        .request("/accounts/ibkr/sso/create", Method::POST, Some(&body))
        .await
        .unwrap();
    assert_eq!(bytes, b"created");
}

#[tokio::test]
async fn test_token_fetched_once_per_authorized_request() {
    let server = MockServer::start().await;
    mount_token(&server, 3).await;
    mount_endpoint(&server, "POST", "/accounts/ibkr/sso/initialize", ResponseTemplate::new(204), 3).await;

    let client = client_for(&server);
    for _ in 0..3 {
        client
            .send("/accounts/ibkr/sso/initialize", Method::POST)
            .await
            .unwrap();
    }

    let requests = received(&server).await;
    assert_eq!(requests_to(&requests, "/token").len(), 3);
}

#[tokio::test]
async fn test_parallel_requests_each_fetch_a_token() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;
    mount_endpoint(&server, "POST", "/accounts/ibkr/sso/initialize", ResponseTemplate::new(200), 2).await;

    let client = client_for(&server);
    let other = client.clone();
    let (a, b) = tokio::join!(
        client.send("/accounts/ibkr/sso/initialize", Method::POST),
        other.send("/accounts/ibkr/sso/initialize", Method::POST),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
}

#[tokio::test]
async fn test_request_http_error_status() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;
    mount_endpoint(&server, "POST", "/accounts/ibkr/sso/logout", ResponseTemplate::new(500), 1).await;
    mount_endpoint(&server, "GET", "/accounts/ibkr/sso/accounts", ResponseTemplate::new(404), 1).await;

    let client = client_for(&server);
    let err = client
        .send("/accounts/ibkr/sso/logout", Method::POST)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));

    let err = client
        .send("/accounts/ibkr/sso/accounts", Method::GET)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_token_failure_aborts_request() {
    let server = MockServer::start().await;
    mount_endpoint(&server, "POST", "/token", ResponseTemplate::new(503), 1).await;
    mount_endpoint(&server, "POST", "/accounts/ibkr/sso/initialize", ResponseTemplate::new(200), 0).await;

    let err = client_for(&server)
        .send("/accounts/ibkr/sso/initialize", Method::POST)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 503 }));
}

#[derive(Debug, Deserialize)]
struct Ack {
    ok: bool,
}

#[tokio::test]
async fn test_request_json_decodes_response() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_endpoint(&server, "GET", "/status", ok_json(json!({ "ok": true })), 1).await;

    let ack: Ack = client_for(&server)
        .request_json::<_, ()>("/status", Method::GET, None)
        .await
        .unwrap();
    assert!(ack.ok);
}

#[tokio::test]
async fn test_request_json_decoding_error() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_endpoint(
        &server,
        "GET",
        "/status",
        ResponseTemplate::new(200).set_body_string("<html>nope</html>"),
        1,
    )
    .await;

    let err = client_for(&server)
        .request_json::<Ack, ()>("/status", Method::GET, None)
        .await
        .unwrap_err();
    assert!(err.is_decoding());
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Port 1 : rien n'écoute, la connexion échoue immédiatement
    let client = ApiClient::new(ClientConfig::new("http://127.0.0.1:1")).unwrap();
    let err = client.fetch_token().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn test_resource_timeout_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ok_json(json!({ "access_token": "late" })).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = config_for(&server)
        .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));
    let err = ApiClient::new(config).unwrap().fetch_token().await.unwrap_err();
    match err {
        ApiError::Network(e) => assert!(e.is_timeout()),
        other => panic!("expected network timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_public_ip_is_unauthenticated() {
    let server = MockServer::start().await;
    mount_token(&server, 0).await;
    mount_ip(&server, 1).await;

    let ip = client_for(&server).fetch_public_ip().await.unwrap();
    assert_eq!(ip, DEVICE_IP);

    let requests = received(&server).await;
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_fetch_public_ip_malformed_body() {
    let server = MockServer::start().await;
    mount_endpoint(
        &server,
        "GET",
        "/ip",
        ResponseTemplate::new(200).set_body_string("1.2.3.4"),
        1,
    )
    .await;

    let err = client_for(&server).fetch_public_ip().await.unwrap_err();
    assert!(err.is_decoding());
}

/// Serveur TCP brut : annonce 100 octets de corps, en envoie un, puis ferme
async fn truncated_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{")
                .await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_truncated_token_body_is_network_error() {
    let base = truncated_body_server().await;
    let client = ApiClient::new(ClientConfig::new(base)).unwrap();

    let err = client.fetch_token().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_truncated_ip_body_is_network_error() {
    let base = truncated_body_server().await;
    let config = ClientConfig::new("http://127.0.0.1:1")
        .with_ip_lookup_url(format!("{base}/ip?format=json"));
    let client = ApiClient::new(config).unwrap();

    let err = client.fetch_public_ip().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unserializable_body_fails_before_token_fetch() {
    let server = MockServer::start().await;
    mount_token(&server, 0).await;
    mount_endpoint(&server, "POST", "/accounts/ibkr/sso/create", ResponseTemplate::new(200), 0).await;

    // serde_json refuse les clés de map qui ne sont pas des chaînes
    let mut body: HashMap<Vec<u8>, u8> = HashMap::new();
    body.insert(vec![1, 2], 3);

    let err = client_for(&server)
        .request("/accounts/ibkr/sso/create", Method::POST, Some(&body))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Encoding(_)));
}
