use std::sync::Arc;

use axum_server::{Handle, Server};
use tracing::{error, info, warn};

use subhook_common::ErrorKind;
use subhook_core::events::{self, ChannelFollow, ChannelRaid, StreamOffline, StreamOnline};
use subhook_core::{ClientConfig, EventSubClient};

use crate::{Args, SubscribeTarget};

pub async fn run_server(args: Args) -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let client = Arc::new(EventSubClient::new(config).await?);
    register_logging_handlers(&client);
    for target in &args.subscribe {
        if !client.dispatcher().has_handler(&target.sub_type) {
            if events::known_version(&target.sub_type).is_none() {
                warn!("'{}' has no typed shape; logging raw events", target.sub_type);
            }
            client.on_raw(target.sub_type.clone(), |sub, event| async move {
                info!("{} event: {}", sub.sub_type, event);
            });
        }
    }

    let app = client.router(&args.path);
    let handle = Handle::new();

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for ctrl-c: {}", e);
            return;
        }
        info!("Ctrl-C received; shutting down.");
        shutdown.graceful_shutdown(None);
    });

    // Subscribing blocks on a verification request that this server must answer,
    // so it runs beside the server rather than before it.
    if !args.subscribe.is_empty() {
        let subscriber = Arc::clone(&client);
        let targets = args.subscribe.clone();
        tokio::spawn(async move { create_subscriptions(subscriber, targets).await });
    }

    info!("Webhook listening on http://{}{}", args.bind, args.path);
    Server::bind(args.bind)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    client.shutdown().await;
    info!("Server shut down.");
    Ok(())
}

fn register_logging_handlers(client: &EventSubClient) {
    client.on::<StreamOnline, _, _>(|ev| async move {
        info!("{} went live ({})", ev.broadcaster_user_name, ev.stream_type);
    });
    client.on::<StreamOffline, _, _>(|ev| async move {
        info!("{} went offline", ev.broadcaster_user_name);
    });
    client.on::<ChannelFollow, _, _>(|ev| async move {
        info!("{} followed {}", ev.user_name, ev.broadcaster_user_name);
    });
    client.on::<ChannelRaid, _, _>(|ev| async move {
        info!(
            "{} raided {} with {} viewers",
            ev.from_broadcaster_user_name, ev.to_broadcaster_user_name, ev.viewers
        );
    });
    client.on_revocation(|sub| async move {
        warn!("Subscription {} ({}) revoked: {}", sub.id, sub.sub_type, sub.status);
    });
    client.on_decode_error(|failure| {
        warn!(
            "Undecodable '{}' event on {}: {}",
            failure.subscription_type, failure.subscription_id, failure.error
        );
    });
}

async fn create_subscriptions(client: Arc<EventSubClient>, targets: Vec<SubscribeTarget>) {
    for target in targets {
        match client
            .subscribe(&target.sub_type, &target.version, &target.condition())
            .await
        {
            Ok(sub) => info!("Subscribed to {} as {}", target.sub_type, sub.id),
            Err(e) if e.kind() == ErrorKind::AuthorizationFailure => {
                error!("Token rejected while subscribing; giving up: {}", e);
                return;
            }
            Err(e) => error!("Could not subscribe to {}: {}", target.sub_type, e),
        }
    }
}
