// File: subhook-core/src/auth/identity.rs

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::Error;

/// Default identity endpoint base.
pub const DEFAULT_OAUTH_URL: &str = "https://id.twitch.tv/oauth2";

/// Opaque bearer credential. Cloning shares the same allocation, so a reader
/// holding one never observes a partially replaced value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Arc<str>);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

/// Matches the JSON from the token endpoint for a client-credentials grant.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    token_type: String,
}

/// An app access token as returned by the identity endpoint.
#[derive(Debug, Clone)]
pub struct AppToken {
    pub access_token: AccessToken,
    pub expires_in: u64,
    pub token_type: String,
}

impl AppToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            access_token: AccessToken::new(token),
            expires_in: 0,
            token_type: "bearer".to_string(),
        }
    }
}

/// Calls against the identity endpoint. The credential manager talks to the
/// remote service only through this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Client-credentials token exchange.
    ///
    /// HTTP 401 yields [`Error::Unauthorized`]; any other non-200 yields
    /// [`Error::TokenExchange`].
    async fn app_access_token(&self, client_id: &str, client_secret: &str)
        -> Result<AppToken, Error>;

    /// Introspects a token. `Ok(false)` means invalid; `Err` only on transport failure.
    async fn validate_token(&self, token: &str) -> Result<bool, Error>;
}

pub struct TwitchIdentityClient {
    http: ReqwestClient,
    base_url: String,
}

impl TwitchIdentityClient {
    pub fn new(http: ReqwestClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn token_url(&self) -> String {
        format!("{}/token", self.base_url)
    }

    fn validate_url(&self) -> String {
        format!("{}/validate", self.base_url)
    }
}

impl Default for TwitchIdentityClient {
    fn default() -> Self {
        Self::new(ReqwestClient::new(), DEFAULT_OAUTH_URL)
    }
}

#[async_trait]
impl IdentityApi for TwitchIdentityClient {
    async fn app_access_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<AppToken, Error> {
        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "client_credentials"),
        ];

        debug!("[Credentials] requesting app access token for client_id={}", client_id);

        let resp = self.http.post(self.token_url()).form(&params).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            warn!("[Credentials] token endpoint rejected client credentials");
            return Err(Error::Unauthorized { body });
        }
        if status != StatusCode::OK {
            warn!("[Credentials] token endpoint => HTTP {}", status);
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        trace!(
            "[Credentials] token issued => type={} expires_in={}s",
            parsed.token_type,
            parsed.expires_in
        );

        Ok(AppToken {
            access_token: AccessToken::new(parsed.access_token),
            expires_in: parsed.expires_in,
            token_type: parsed.token_type,
        })
    }

    async fn validate_token(&self, token: &str) -> Result<bool, Error> {
        let resp = self
            .http
            .get(self.validate_url())
            .bearer_auth(token)
            .send()
            .await?;

        let valid = resp.status() == StatusCode::OK;
        debug!("[Credentials] validate => HTTP {} (valid={})", resp.status(), valid);
        Ok(valid)
    }
}
