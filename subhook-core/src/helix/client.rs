// File: subhook-core/src/helix/client.rs

use std::sync::Arc;

use reqwest::{Client as ReqwestClient, RequestBuilder};

use crate::auth::CredentialManager;
use crate::Error;

/// Default Helix API base.
pub const DEFAULT_HELIX_URL: &str = "https://api.twitch.tv/helix";

/// Entry point for Helix calls. Request methods live under `requests/`, one
/// `impl HelixClient` block per resource.
///
/// Every request reads the current token from the [`CredentialManager`] at
/// send time, so a refresh in the background is picked up by the next call.
pub struct HelixClient {
    http: Arc<ReqwestClient>,
    base_url: String,
    credentials: Arc<CredentialManager>,
}

impl HelixClient {
    pub fn new(
        http: ReqwestClient,
        base_url: impl Into<String>,
        credentials: Arc<CredentialManager>,
    ) -> Self {
        Self {
            http: Arc::new(http),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn client_id(&self) -> &str {
        self.credentials.client_id()
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    pub fn http_client(&self) -> Arc<ReqwestClient> {
        self.http.clone()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Adds `Client-Id` and the bearer token.
    pub(crate) fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, Error> {
        let token = self.credentials.token()?;
        Ok(request
            .header("Client-Id", self.client_id())
            .bearer_auth(token.secret()))
    }
}
