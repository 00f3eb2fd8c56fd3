use std::net::SocketAddr;
use std::str::FromStr;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use subhook_core::models::Condition;

mod server;

/// One `--subscribe` argument: `type:version:broadcaster_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeTarget {
    pub sub_type: String,
    pub version: String,
    pub broadcaster_id: String,
}

impl SubscribeTarget {
    pub fn condition(&self) -> Condition {
        Condition::broadcaster(self.broadcaster_id.clone())
    }
}

impl FromStr for SubscribeTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(v), Some(b)) if !t.is_empty() && !v.is_empty() && !b.is_empty() => {
                Ok(Self {
                    sub_type: t.to_string(),
                    version: v.to_string(),
                    broadcaster_id: b.to_string(),
                })
            }
            _ => Err(format!("expected type:version:broadcaster_id, got '{s}'")),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "subhook")]
#[command(author, version, about = "Webhook EventSub receiver")]
pub struct Args {
    /// Address the webhook server binds to
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Route the webhook is served on
    #[arg(long, default_value = "/eventsub")]
    pub path: String,

    /// Subscription to create once the server is up, as type:version:broadcaster_id.
    /// May be repeated.
    #[arg(long = "subscribe")]
    pub subscribe: Vec<SubscribeTarget>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    info!(
        "subhook starting. bind={}, path={}, subscriptions={}",
        args.bind,
        args.path,
        args.subscribe.len()
    );

    if let Err(e) = server::run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    Ok(())
}
