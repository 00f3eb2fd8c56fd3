// File: subhook-core/src/config.rs

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::auth::{DEFAULT_OAUTH_URL, DEFAULT_REFRESH_INTERVAL};
use crate::handshake::DEFAULT_VERIFICATION_TIMEOUT;
use crate::helix::DEFAULT_HELIX_URL;
use crate::Error;

/// Bounds the remote service puts on a webhook secret.
pub const WEBHOOK_SECRET_MIN_LEN: usize = 10;
pub const WEBHOOK_SECRET_MAX_LEN: usize = 100;

#[derive(Clone)]
pub struct ClientConfig {
    pub client_id: String,
    /// Required unless `external_token` is set.
    pub client_secret: Option<String>,
    pub token: Option<String>,
    /// Use `token` as supplied: validate it once and never refresh it.
    pub external_token: bool,

    /// Shared HMAC secret registered with every subscription.
    pub webhook_secret: String,
    /// Public URL the remote service delivers to.
    pub webhook_url: String,

    pub helix_url: String,
    pub oauth_url: String,

    pub verification_timeout: Duration,
    pub refresh_interval: Duration,
    /// How long delivery ids are remembered. `None` keeps them for the life of the process.
    pub dedup_retention: Option<Duration>,
    /// Reject deliveries whose timestamp is older than this.
    pub max_message_age: Option<Duration>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "****"))
            .field("token", &self.token.as_ref().map(|_| "****"))
            .field("external_token", &self.external_token)
            .field("webhook_secret", &"****")
            .field("webhook_url", &self.webhook_url)
            .field("helix_url", &self.helix_url)
            .field("oauth_url", &self.oauth_url)
            .field("verification_timeout", &self.verification_timeout)
            .field("refresh_interval", &self.refresh_interval)
            .field("dedup_retention", &self.dedup_retention)
            .field("max_message_age", &self.max_message_age)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            token: None,
            external_token: false,
            webhook_secret: String::new(),
            webhook_url: String::new(),
            helix_url: DEFAULT_HELIX_URL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            verification_timeout: DEFAULT_VERIFICATION_TIMEOUT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            dedup_retention: None,
            max_message_age: None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl ClientConfig {
    /// Managed-token configuration.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        webhook_url: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
            webhook_url: webhook_url.into(),
            webhook_secret: webhook_secret.into(),
            ..Self::default()
        }
    }

    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, Error> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));
        let require = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        let mut config = Self {
            client_id: require("TWITCH_CLIENT_ID")?,
            client_secret: get("TWITCH_CLIENT_SECRET"),
            token: get("TWITCH_TOKEN"),
            external_token: get("TWITCH_EXTERNAL_TOKEN").is_some_and(|v| truthy(&v)),
            webhook_secret: require("EVENTSUB_WEBHOOK_SECRET")?,
            webhook_url: require("EVENTSUB_WEBHOOK_URL")?,
            ..Self::default()
        };
        if let Some(url) = get("TWITCH_HELIX_URL") {
            config.helix_url = url;
        }
        if let Some(url) = get("TWITCH_OAUTH_URL") {
            config.oauth_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.client_id.is_empty() {
            return Err(Error::Config("client id is required".into()));
        }
        if self.external_token {
            if self.token.as_deref().is_none_or(str::is_empty) {
                return Err(Error::Config("external token mode requires a token".into()));
            }
        } else if self.client_secret.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Config(
                "client secret is required unless an external token is used".into(),
            ));
        }

        let secret_len = self.webhook_secret.chars().count();
        if !(WEBHOOK_SECRET_MIN_LEN..=WEBHOOK_SECRET_MAX_LEN).contains(&secret_len) {
            return Err(Error::Config(format!(
                "webhook secret must be {WEBHOOK_SECRET_MIN_LEN} to {WEBHOOK_SECRET_MAX_LEN} characters, got {secret_len}"
            )));
        }

        for (name, value) in [
            ("webhook url", &self.webhook_url),
            ("helix url", &self.helix_url),
            ("oauth url", &self.oauth_url),
        ] {
            Url::parse(value).map_err(|e| Error::Config(format!("invalid {name} '{value}': {e}")))?;
        }

        if self.verification_timeout.is_zero() {
            return Err(Error::Config("verification timeout must be non-zero".into()));
        }
        if self.refresh_interval.is_zero() {
            return Err(Error::Config("refresh interval must be non-zero".into()));
        }
        Ok(())
    }
}
