// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use reqwest::Client as ReqwestClient;
use serde_json::{json, Value};
use subhook_core::auth::TwitchIdentityClient;
use subhook_core::models::headers;
use subhook_core::signature;
use subhook_core::{ClientConfig, EventSubClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WEBHOOK_SECRET: &str = "s3cr3t-webhook-key";
pub const CALLBACK_PATH: &str = "/eventsub";

pub fn subscription_json(id: &str, sub_type: &str, broadcaster: &str) -> Value {
    json!({
        "id": id,
        "status": "webhook_callback_verification_pending",
        "type": sub_type,
        "version": "1",
        "cost": 1,
        "condition": { "broadcaster_user_id": broadcaster },
        "transport": { "method": "webhook", "callback": "https://example.com/eventsub" },
        "created_at": "2024-01-01T00:00:00Z"
    })
}

/// Builds a delivery signed with `secret`.
pub fn signed_request(secret: &str, message_type: &str, message_id: &str, body: &Value) -> Request<Body> {
    let raw = serde_json::to_vec(body).unwrap();
    let timestamp = chrono::Utc::now().to_rfc3339();
    let sig = signature::sign(secret, message_id, &timestamp, &raw);

    Request::builder()
        .method("POST")
        .uri(CALLBACK_PATH)
        .header(headers::MESSAGE_ID, message_id)
        .header(headers::MESSAGE_TIMESTAMP, timestamp)
        .header(headers::MESSAGE_SIGNATURE, sig)
        .header(headers::MESSAGE_TYPE, message_type)
        .header("content-type", "application/json")
        .body(Body::from(raw))
        .unwrap()
}

/// Mounts a token endpoint that always issues `token`, and a validate endpoint that accepts it.
pub async fn mount_identity(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": 5011271,
            "token_type": "bearer"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oauth2/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "client_id": "cid",
            "expires_in": 5011271
        })))
        .mount(server)
        .await;
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(
        "cid",
        "csecret",
        "https://example.com/eventsub",
        WEBHOOK_SECRET,
    );
    config.helix_url = format!("{}/helix", server.uri());
    config.oauth_url = format!("{}/oauth2", server.uri());
    config
}

/// Managed-mode client talking to `server` for both identity and Helix.
pub async fn client_for(server: &MockServer) -> Arc<EventSubClient> {
    mount_identity(server, "app-token").await;
    let config = config_for(server);
    let http = ReqwestClient::new();
    let identity = Arc::new(TwitchIdentityClient::new(http.clone(), config.oauth_url.clone()));
    Arc::new(
        EventSubClient::with_identity(config, http, identity)
            .await
            .unwrap(),
    )
}
