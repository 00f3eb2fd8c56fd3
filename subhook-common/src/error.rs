// ================================================================
// File: subhook-common/src/error.rs
// ================================================================

use thiserror::Error;

use crate::models::subscription::{Condition, Subscription};

/// Coarse failure classes. Callers branch on these instead of matching
/// every variant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad client id/secret or a rejected token. Fatal at startup, never retried.
    AuthorizationFailure,
    /// Network trouble or a transient non-success from the remote service.
    TransientTransportFailure,
    /// The remote service answered with something we did not expect.
    ProtocolViolation,
    /// No verification callback arrived before the deadline.
    HandshakeTimeout,
    /// An inbound request failed HMAC authentication.
    SignatureRejected,
    /// Invalid local configuration.
    Configuration,
    /// Local I/O failures.
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Helix returned 401 Unauthorized")]
    Unauthorized { body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint returned HTTP {status}")]
    TokenExchange { status: u16, body: String },

    #[error("Helix returned unhandled status code {status}")]
    UnhandledStatus { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing data in response: {0}")]
    MissingData(String),

    #[error("Duplicate subscription for type {sub_type}")]
    DuplicateSubscription { sub_type: String, condition: Condition },

    #[error("Could not find subscription {0}")]
    SubscriptionNotFound(String),

    #[error("Subscription {} was not verified within timeout duration", .subscription.id)]
    VerificationTimeout { subscription: Box<Subscription> },

    #[error("Webhook signature rejected")]
    SignatureRejected,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthorized { .. } => ErrorKind::AuthorizationFailure,
            Error::Http(_) | Error::TokenExchange { .. } => ErrorKind::TransientTransportFailure,
            Error::UnhandledStatus { .. }
            | Error::Json(_)
            | Error::MissingData(_)
            | Error::DuplicateSubscription { .. }
            | Error::SubscriptionNotFound(_) => ErrorKind::ProtocolViolation,
            Error::VerificationTimeout { .. } => ErrorKind::HandshakeTimeout,
            Error::SignatureRejected => ErrorKind::SignatureRejected,
            Error::Config(_) => ErrorKind::Configuration,
            Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status reported by the remote service, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthorized { .. } => Some(401),
            Error::TokenExchange { status, .. } | Error::UnhandledStatus { status, .. } => {
                Some(*status)
            }
            Error::DuplicateSubscription { .. } => Some(409),
            Error::SubscriptionNotFound(_) => Some(404),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
