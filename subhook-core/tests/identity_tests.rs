// tests/identity_tests.rs

use reqwest::Client as ReqwestClient;
use serde_json::json;
use subhook_core::auth::{IdentityApi, TwitchIdentityClient};
use subhook_core::{Error, ErrorKind};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn identity(server: &MockServer) -> TwitchIdentityClient {
    TwitchIdentityClient::new(ReqwestClient::new(), format!("{}/oauth2", server.uri()))
}

#[tokio::test]
async fn client_credentials_exchange_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=cid"))
        .and(body_string_contains("client_secret=csecret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jostpf5q0uzmxmkba9iyug38kjtgh",
            "expires_in": 5011271,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = identity(&server).app_access_token("cid", "csecret").await.unwrap();
    assert_eq!(token.access_token.secret(), "jostpf5q0uzmxmkba9iyug38kjtgh");
    assert_eq!(token.expires_in, 5011271);
    assert_eq!(token.token_type, "bearer");
}

#[tokio::test]
async fn bad_client_credentials_are_an_authorization_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"status":401,"message":"invalid client"}"#))
        .mount(&server)
        .await;

    let err = identity(&server).app_access_token("cid", "wrong").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationFailure);
}

#[tokio::test]
async fn other_token_errors_are_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = identity(&server).app_access_token("cid", "csecret").await.unwrap_err();
    assert!(matches!(err, Error::TokenExchange { status: 503, .. }));
    assert_eq!(err.kind(), ErrorKind::TransientTransportFailure);
}

#[tokio::test]
async fn validate_sends_bearer_and_maps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth2/validate"))
        .and(header("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth2/validate"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = identity(&server);
    assert!(client.validate_token("good").await.unwrap());
    assert!(!client.validate_token("expired").await.unwrap());
}

#[tokio::test]
async fn unreachable_identity_endpoint_is_a_transport_error() {
    let client = TwitchIdentityClient::new(ReqwestClient::new(), "http://127.0.0.1:1/oauth2");
    let err = client.validate_token("any").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientTransportFailure);
}
