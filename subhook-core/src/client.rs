// File: subhook-core/src/client.rs

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use parking_lot::Mutex;
use reqwest::Client as ReqwestClient;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::{CredentialManager, IdentityApi, RefreshHandle, TwitchIdentityClient};
use crate::config::ClientConfig;
use crate::dispatcher::{DecodeFailure, EventDispatcher};
use crate::endpoint::{self, WebhookState};
use crate::events::EventSubEvent;
use crate::handshake::VerificationHandshake;
use crate::helix::{HelixClient, SubscriptionFilter};
use crate::ledger::NotificationLedger;
use crate::models::{Condition, Subscription};
use crate::Error;

/// Webhook EventSub client: manages subscriptions over Helix and serves the
/// callback route that receives their deliveries.
///
/// `subscribe` blocks until the remote service verifies the callback, which
/// arrives as a separate request on [`router`](Self::router). The router must
/// therefore be served by another task before anything subscribes.
pub struct EventSubClient {
    config: ClientConfig,
    credentials: Arc<CredentialManager>,
    helix: HelixClient,
    ledger: Arc<NotificationLedger>,
    handshake: Arc<VerificationHandshake>,
    dispatcher: Arc<EventDispatcher>,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl EventSubClient {
    /// Validates `config`, obtains or validates the token, and starts the
    /// refresh loop in managed mode. Authorization failures are fatal here.
    pub async fn new(config: ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let http = ReqwestClient::new();
        let identity = Arc::new(TwitchIdentityClient::new(http.clone(), config.oauth_url.clone()));
        Self::with_identity(config, http, identity).await
    }

    /// Same as [`new`](Self::new) with a caller-supplied identity API.
    pub async fn with_identity(
        config: ClientConfig,
        http: ReqwestClient,
        identity: Arc<dyn IdentityApi>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let credentials = if config.external_token {
            let token = config.token.clone().unwrap_or_default();
            CredentialManager::external(identity, config.client_id.clone(), token).await?
        } else {
            let secret = config.client_secret.clone().unwrap_or_default();
            CredentialManager::managed(identity, config.client_id.clone(), secret).await?
        };

        let refresh = credentials
            .is_managed()
            .then(|| credentials.spawn_refresh_task(config.refresh_interval));

        let ledger = match config.dedup_retention {
            Some(keep) => NotificationLedger::with_retention(keep),
            None => NotificationLedger::new(),
        };

        info!(
            "[EventSub] client ready; callback={} managed_token={}",
            config.webhook_url,
            credentials.is_managed()
        );

        Ok(Self {
            helix: HelixClient::new(http, config.helix_url.clone(), Arc::clone(&credentials)),
            handshake: Arc::new(VerificationHandshake::new(config.verification_timeout)),
            ledger: Arc::new(ledger),
            dispatcher: Arc::new(EventDispatcher::new()),
            refresh: Mutex::new(refresh),
            credentials,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    pub fn helix(&self) -> &HelixClient {
        &self.helix
    }

    pub fn ledger(&self) -> &Arc<NotificationLedger> {
        &self.ledger
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn webhook_state(&self) -> WebhookState {
        WebhookState::new(
            self.config.webhook_secret.clone(),
            Arc::clone(&self.ledger),
            Arc::clone(&self.handshake),
            Arc::clone(&self.dispatcher),
        )
        .with_max_message_age(self.config.max_message_age)
    }

    /// Router for the webhook route at `path`; mount it wherever the public
    /// callback URL points.
    pub fn router(&self, path: &str) -> Router {
        endpoint::router(self.webhook_state(), path)
    }

    pub fn on<E, F, Fut>(&self, callback: F)
    where
        E: EventSubEvent,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.dispatcher.on::<E, F, Fut>(callback);
    }

    pub fn on_raw<F, Fut>(&self, sub_type: impl Into<String>, callback: F)
    where
        F: Fn(Subscription, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.dispatcher.on_raw(sub_type, callback);
    }

    pub fn on_revocation<F, Fut>(&self, callback: F)
    where
        F: Fn(Subscription) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.dispatcher.on_revocation(callback);
    }

    pub fn on_decode_error<F>(&self, callback: F)
    where
        F: Fn(DecodeFailure) + Send + Sync + 'static,
    {
        self.dispatcher.on_decode_error(callback);
    }

    /// Creates a subscription and waits for its verification callback.
    /// Returns the subscription as created; its status is the one reported at
    /// creation time.
    pub async fn subscribe(
        &self,
        sub_type: &str,
        version: &str,
        condition: &Condition,
    ) -> Result<Subscription, Error> {
        let created = self
            .helix
            .create_subscription(
                sub_type,
                version,
                condition,
                &self.config.webhook_url,
                &self.config.webhook_secret,
            )
            .await?;

        debug!("[EventSub] waiting for verification of {}", created.id);
        let pending = self.handshake.register(created);
        let verified = self.handshake.wait(pending).await?;
        info!("[EventSub] subscribed to '{}' ({})", verified.sub_type, verified.id);
        Ok(verified)
    }

    /// [`subscribe`](Self::subscribe) with the type and version taken from `E`.
    pub async fn subscribe_to<E: EventSubEvent>(
        &self,
        condition: &Condition,
    ) -> Result<Subscription, Error> {
        self.subscribe(E::TYPE, E::VERSION, condition).await
    }

    pub async fn unsubscribe(&self, id: &str) -> Result<(), Error> {
        self.helix.delete_subscription(id).await?;
        info!("[EventSub] removed subscription {}", id);
        Ok(())
    }

    /// Removes every subscription of `sub_type` whose condition equals
    /// `condition`, comparing populated fields only. Returns how many were removed.
    pub async fn unsubscribe_by_type(
        &self,
        sub_type: &str,
        condition: &Condition,
    ) -> Result<usize, Error> {
        let mut removed = 0;
        for sub in self.subscriptions_by_type(sub_type).await? {
            if sub.condition == *condition {
                self.unsubscribe(&sub.id).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn subscriptions(&self) -> Result<Vec<Subscription>, Error> {
        self.helix.list_subscriptions(&SubscriptionFilter::All).await
    }

    pub async fn subscriptions_by_type(&self, sub_type: &str) -> Result<Vec<Subscription>, Error> {
        self.helix
            .list_subscriptions(&SubscriptionFilter::Type(sub_type.to_string()))
            .await
    }

    pub async fn subscriptions_by_status(&self, status: &str) -> Result<Vec<Subscription>, Error> {
        self.helix
            .list_subscriptions(&SubscriptionFilter::Status(status.to_string()))
            .await
    }

    /// Replaces the bearer token used for outbound calls. Meant for external token mode.
    pub fn set_token(&self, token: impl Into<String>) {
        self.credentials.set_token(token);
    }

    /// Stops the credential refresh loop. The webhook router keeps working.
    pub async fn shutdown(&self) {
        let handle = self.refresh.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
            info!("[EventSub] credential refresh stopped");
        }
    }
}
