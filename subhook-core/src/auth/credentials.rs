// File: subhook-core/src/auth/credentials.rs

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::identity::{AccessToken, IdentityApi};
use crate::Error;

/// Reference refresh cadence.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Uninitialized,
    Active,
    Regenerating,
}

/// What one pass of the refresh routine did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    StillValid,
    Regenerated,
    /// Validation could not reach the identity endpoint; token left as is.
    ValidationFailed,
    /// The token was invalid but a replacement could not be obtained.
    RegenerationFailed,
}

enum TokenSource {
    Managed { client_secret: String },
    External,
}

/// Owns the bearer credential. In managed mode it acquires the token with the
/// client-credentials grant and keeps it fresh; in external mode the caller
/// supplies the token and replaces it through [`CredentialManager::set_token`].
pub struct CredentialManager {
    identity: Arc<dyn IdentityApi>,
    client_id: String,
    source: TokenSource,
    current: RwLock<Option<AccessToken>>,
    state: RwLock<CredentialState>,
}

impl CredentialManager {
    /// Managed manager with no token yet. Call [`acquire`](Self::acquire) before use.
    pub fn new(
        identity: Arc<dyn IdentityApi>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            client_id: client_id.into(),
            source: TokenSource::Managed {
                client_secret: client_secret.into(),
            },
            current: RwLock::new(None),
            state: RwLock::new(CredentialState::Uninitialized),
        }
    }

    /// Builds a managed manager and performs the initial token exchange.
    /// A 401 from the identity endpoint is fatal here.
    pub async fn managed(
        identity: Arc<dyn IdentityApi>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Arc<Self>, Error> {
        let manager = Arc::new(Self::new(identity, client_id, client_secret));
        info!("[Credentials] using internal token store");
        manager.acquire().await?;
        info!("[Credentials] generated app access token");
        Ok(manager)
    }

    /// Wraps a caller-managed token. It is validated once; an invalid token is fatal.
    pub async fn external(
        identity: Arc<dyn IdentityApi>,
        client_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Arc<Self>, Error> {
        let token = AccessToken::new(token);
        let manager = Self {
            identity,
            client_id: client_id.into(),
            source: TokenSource::External,
            current: RwLock::new(None),
            state: RwLock::new(CredentialState::Uninitialized),
        };

        info!("[Credentials] using external token store");
        if !manager.validate(&token).await? {
            return Err(Error::Unauthorized {
                body: "supplied token failed validation".to_string(),
            });
        }
        manager.store(token);
        Ok(Arc::new(manager))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn is_managed(&self) -> bool {
        matches!(self.source, TokenSource::Managed { .. })
    }

    pub fn state(&self) -> CredentialState {
        *self.state.read()
    }

    pub fn current(&self) -> Option<AccessToken> {
        self.current.read().clone()
    }

    /// The token outbound requests should carry.
    pub fn token(&self) -> Result<AccessToken, Error> {
        self.current().ok_or_else(|| Error::Unauthorized {
            body: "no access token has been acquired".to_string(),
        })
    }

    /// Replaces the stored token. Meant for external mode, where the caller
    /// owns token refresh.
    pub fn set_token(&self, token: impl Into<String>) {
        if self.is_managed() {
            warn!("[Credentials] set_token called on a managed store; next refresh may replace it");
        }
        self.store(AccessToken::new(token));
    }

    fn store(&self, token: AccessToken) {
        *self.current.write() = Some(token);
        *self.state.write() = CredentialState::Active;
    }

    /// Client-credentials exchange; the returned token becomes current.
    pub async fn acquire(&self) -> Result<AccessToken, Error> {
        let TokenSource::Managed { client_secret } = &self.source else {
            return Err(Error::Config(
                "external token mode cannot acquire tokens".to_string(),
            ));
        };

        let app = self
            .identity
            .app_access_token(&self.client_id, client_secret)
            .await?;
        self.store(app.access_token.clone());
        Ok(app.access_token)
    }

    pub async fn validate(&self, token: &AccessToken) -> Result<bool, Error> {
        self.identity.validate_token(token.secret()).await
    }

    /// One pass of the refresh routine: validate, and regenerate if invalid.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let Some(token) = self.current() else {
            return self.regenerate().await;
        };

        match self.validate(&token).await {
            Ok(true) => {
                debug!("[Credentials] token still valid");
                RefreshOutcome::StillValid
            }
            Ok(false) => {
                info!("[Credentials] token invalid, generating a new one");
                self.regenerate().await
            }
            Err(e) => {
                error!("[Credentials] could not validate token: {}", e);
                RefreshOutcome::ValidationFailed
            }
        }
    }

    async fn regenerate(&self) -> RefreshOutcome {
        let previous = {
            let mut state = self.state.write();
            std::mem::replace(&mut *state, CredentialState::Regenerating)
        };

        match self.acquire().await {
            Ok(_) => RefreshOutcome::Regenerated,
            Err(e) => {
                error!("[Credentials] could not regenerate token: {}", e);
                *self.state.write() = previous;
                RefreshOutcome::RegenerationFailed
            }
        }
    }

    /// Starts the background refresh loop. The loop stops when the returned
    /// handle is shut down or dropped.
    pub fn spawn_refresh_task(self: &Arc<Self>, every: Duration) -> RefreshHandle {
        let cancel = CancellationToken::new();
        let manager = Arc::clone(self);
        let stop = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        let outcome = manager.refresh_once().await;
                        debug!("[Credentials] refresh pass => {:?}", outcome);
                    }
                }
            }
            debug!("[Credentials] refresh task stopped");
        });

        RefreshHandle {
            cancel,
            handle: Some(handle),
        }
    }
}

/// Keeps the refresh loop alive; cancelling or dropping it stops the loop.
pub struct RefreshHandle {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("[Credentials] refresh task ended abnormally: {:?}", e);
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
