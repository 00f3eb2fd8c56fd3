// File: subhook-core/src/dispatcher.rs

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::events::EventSubEvent;
use crate::models::Subscription;

/// Handles the event bodies of one subscription type.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Decodes `event` and runs the callback. A decode failure is returned
    /// and the callback is not run.
    async fn handle(&self, subscription: &Subscription, event: Value) -> Result<(), serde_json::Error>;
}

/// Reported when an event body does not match the shape its handler expects.
#[derive(Debug)]
pub struct DecodeFailure {
    pub subscription_type: String,
    pub subscription_id: String,
    pub error: serde_json::Error,
}

type RevocationCallback = Arc<dyn Fn(Subscription) -> BoxFuture<'static, ()> + Send + Sync>;
type DecodeErrorCallback = Arc<dyn Fn(DecodeFailure) + Send + Sync>;

struct TypedHandler<E, F> {
    callback: F,
    _shape: PhantomData<fn() -> E>,
}

#[async_trait]
impl<E, F, Fut> EventHandler for TypedHandler<E, F>
where
    E: EventSubEvent,
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, _subscription: &Subscription, event: Value) -> Result<(), serde_json::Error> {
        let decoded: E = serde_json::from_value(event)?;
        (self.callback)(decoded).await;
        Ok(())
    }
}

struct RawHandler<F> {
    callback: F,
}

#[async_trait]
impl<F, Fut> EventHandler for RawHandler<F>
where
    F: Fn(Subscription, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, subscription: &Subscription, event: Value) -> Result<(), serde_json::Error> {
        (self.callback)(subscription.clone(), event).await;
        Ok(())
    }
}

/// Routes notification bodies to the handler registered for their
/// subscription type. At most one handler per type; registering again
/// replaces the previous one.
pub struct EventDispatcher {
    handlers: DashMap<String, Arc<dyn EventHandler>>,
    revocation: RwLock<Option<RevocationCallback>>,
    decode_error: RwLock<Option<DecodeErrorCallback>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            revocation: RwLock::new(None),
            decode_error: RwLock::new(None),
        }
    }

    /// Registers a handler for `sub_type`. Returns true if one was replaced.
    pub fn register(&self, sub_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> bool {
        let sub_type = sub_type.into();
        debug!("[EventSub] registering handler for '{}'", sub_type);
        self.handlers.insert(sub_type, handler).is_some()
    }

    /// Typed handler; the subscription type comes from `E`.
    pub fn on<E, F, Fut>(&self, callback: F) -> bool
    where
        E: EventSubEvent,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = TypedHandler::<E, F> {
            callback,
            _shape: PhantomData,
        };
        self.register(E::TYPE, Arc::new(handler))
    }

    /// Undecoded handler for any type, including ones without a shape in [`crate::events`].
    pub fn on_raw<F, Fut>(&self, sub_type: impl Into<String>, callback: F) -> bool
    where
        F: Fn(Subscription, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(sub_type, Arc::new(RawHandler { callback }))
    }

    /// Called with the revoked subscription; its `status` carries the reason.
    pub fn on_revocation<F, Fut>(&self, callback: F)
    where
        F: Fn(Subscription) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: RevocationCallback =
            Arc::new(move |sub: Subscription| -> BoxFuture<'static, ()> { Box::pin(callback(sub)) });
        *self.revocation.write() = Some(callback);
    }

    pub fn on_decode_error<F>(&self, callback: F)
    where
        F: Fn(DecodeFailure) + Send + Sync + 'static,
    {
        *self.decode_error.write() = Some(Arc::new(callback));
    }

    pub fn has_handler(&self, sub_type: &str) -> bool {
        self.handlers.contains_key(sub_type)
    }

    pub fn remove(&self, sub_type: &str) -> bool {
        self.handlers.remove(sub_type).is_some()
    }

    /// Runs the handler for the subscription's type on its own task. Returns
    /// `None` when nothing is registered; the event is dropped.
    pub fn dispatch(&self, subscription: Subscription, event: Value) -> Option<JoinHandle<()>> {
        let Some(handler) = self
            .handlers
            .get(&subscription.sub_type)
            .map(|h| Arc::clone(h.value()))
        else {
            trace!("[EventSub] no handler for '{}', dropping event", subscription.sub_type);
            return None;
        };
        let on_decode_error = self.decode_error.read().clone();

        Some(tokio::spawn(async move {
            if let Err(error) = handler.handle(&subscription, event).await {
                warn!(
                    "[EventSub] could not decode '{}' event for subscription {}: {}",
                    subscription.sub_type, subscription.id, error
                );
                if let Some(hook) = on_decode_error {
                    hook(DecodeFailure {
                        subscription_type: subscription.sub_type,
                        subscription_id: subscription.id,
                        error,
                    });
                }
            }
        }))
    }

    /// Runs the revocation callback, if any, on its own task.
    pub fn revoke(&self, subscription: Subscription) -> Option<JoinHandle<()>> {
        let callback = self.revocation.read().clone()?;
        Some(tokio::spawn(callback(subscription)))
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
