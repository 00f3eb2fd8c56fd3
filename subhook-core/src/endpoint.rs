// File: subhook-core/src/endpoint.rs
//
// The single inbound webhook route. The HTTP status depends only on
// authentication and parsing; user callbacks run on their own tasks and
// never change the acknowledgement.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, trace, warn};

use crate::dispatcher::EventDispatcher;
use crate::handshake::VerificationHandshake;
use crate::ledger::NotificationLedger;
use crate::models::{headers, InboundMessage, MessageKind, WebhookPayload};
use crate::signature;

/// Shared state for the webhook route.
#[derive(Clone)]
pub struct WebhookState {
    secret: Arc<str>,
    ledger: Arc<NotificationLedger>,
    handshake: Arc<VerificationHandshake>,
    dispatcher: Arc<EventDispatcher>,
    max_message_age: Option<Duration>,
}

impl WebhookState {
    pub fn new(
        secret: impl Into<String>,
        ledger: Arc<NotificationLedger>,
        handshake: Arc<VerificationHandshake>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            secret: Arc::from(secret.into()),
            ledger,
            handshake,
            dispatcher,
            max_message_age: None,
        }
    }

    /// Rejects deliveries whose timestamp is older than `max_age`.
    pub fn with_max_message_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_message_age = max_age;
        self
    }
}

/// Router serving the webhook at `path` (POST only).
pub fn router(state: WebhookState, path: &str) -> Router {
    Router::new()
        .route(path, post(handle_webhook))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

fn header_str<'a>(map: &'a HeaderMap, name: &str) -> &'a str {
    map.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

fn is_fresh(timestamp: &str, max_age: Duration) -> bool {
    let Ok(sent) = DateTime::parse_from_rfc3339(timestamp) else {
        return false;
    };
    let age = Utc::now().signed_duration_since(sent.with_timezone(&Utc));
    age.to_std().map_or(true, |age| age <= max_age)
}

async fn handle_webhook(
    State(state): State<WebhookState>,
    request_headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(b) => b,
        Err(e) => {
            error!("[EventSub] failed to read request body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let message_id = header_str(&request_headers, headers::MESSAGE_ID);
    let timestamp = header_str(&request_headers, headers::MESSAGE_TIMESTAMP);
    let provided = header_str(&request_headers, headers::MESSAGE_SIGNATURE);

    if let Err(e) = signature::authenticate(&state.secret, message_id, timestamp, &body, provided) {
        warn!("[EventSub] delivery '{}' rejected: {}", message_id, e);
        return StatusCode::FORBIDDEN.into_response();
    }

    if let Some(max_age) = state.max_message_age {
        if !is_fresh(timestamp, max_age) {
            warn!(
                "[EventSub] delivery '{}' is stale or has a bad timestamp '{}'",
                message_id, timestamp
            );
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            error!("[EventSub] could not parse delivery '{}': {}", message_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let message = InboundMessage {
        kind: MessageKind::from_header(header_str(&request_headers, headers::MESSAGE_TYPE)),
        message_id: message_id.to_string(),
        timestamp: timestamp.to_string(),
        payload,
    };

    trace!(
        "[EventSub] {} '{}' for subscription {}",
        message.kind.as_str(),
        message.message_id,
        message.subscription().id
    );

    match message.kind.clone() {
        MessageKind::Notification => on_notification(&state, message),
        MessageKind::Verification => on_verification(&state, message),
        MessageKind::Revocation => on_revocation(&state, message),
        MessageKind::Unknown(kind) => {
            warn!("[EventSub] ignoring unknown message type '{}'", kind);
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

fn on_notification(state: &WebhookState, message: InboundMessage) -> Response {
    if state.ledger.seen(&message.message_id) {
        debug!("[EventSub] duplicate delivery '{}', skipping", message.message_id);
        return StatusCode::NO_CONTENT.into_response();
    }

    let WebhookPayload {
        subscription, event, ..
    } = message.payload;
    state
        .dispatcher
        .dispatch(subscription, event.unwrap_or(Value::Null));
    StatusCode::NO_CONTENT.into_response()
}

fn on_verification(state: &WebhookState, message: InboundMessage) -> Response {
    let subscription_id = &message.payload.subscription.id;
    let Some(challenge) = message.payload.challenge.as_deref() else {
        error!("[EventSub] verification for {} carried no challenge", subscription_id);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    if !state.handshake.confirm(subscription_id) {
        debug!("[EventSub] no subscribe call is waiting on {} yet", subscription_id);
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        challenge.to_string(),
    )
        .into_response()
}

fn on_revocation(state: &WebhookState, message: InboundMessage) -> Response {
    let subscription = message.payload.subscription;
    warn!(
        "[EventSub] subscription {} ({}) revoked: {}",
        subscription.id, subscription.sub_type, subscription.status
    );
    state.dispatcher.revoke(subscription);
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_window() {
        let now = Utc::now();
        let recent = (now - chrono::Duration::seconds(30)).to_rfc3339();
        let old = (now - chrono::Duration::minutes(11)).to_rfc3339();
        let window = Duration::from_secs(600);

        assert!(is_fresh(&recent, window));
        assert!(!is_fresh(&old, window));
        assert!(!is_fresh("yesterday", window));
        assert!(is_fresh(&(now + chrono::Duration::seconds(5)).to_rfc3339(), window));
    }

    #[test]
    fn missing_headers_read_as_empty() {
        let map = HeaderMap::new();
        assert_eq!(header_str(&map, headers::MESSAGE_ID), "");
    }
}
