use serde::Deserialize;
use socialgram_common::{
    snowflake::{ProcessId, SnowflakePartOutOfRangeError, WorkerId},
    util::{NonPositiveDurationError, PositiveDuration},
};
use socialgram_db::{SocialgramClient, StoreError, gateway::FileGateway};
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;
use time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid poll interval: {0}")]
    PollInterval(#[from] NonPositiveDurationError),
    #[error("Snowflake part out of range: {0}")]
    SnowflakePart(#[from] SnowflakePartOutOfRangeError<u8>),
    #[error("Error opening data directory: {0}")]
    DataDir(std::io::Error),
    #[error("Error opening stores: {0}")]
    Store(#[from] StoreError),
    #[error("Error waiting for shutdown signal: {0}")]
    Signal(std::io::Error),
}

fn default_poll_interval_ms() -> i64 {
    1000
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    data_dir: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: i64,
    #[serde(default)]
    worker_id: u8,
    #[serde(default)]
    process_id: u8,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "socialgram_app=debug,socialgram_db=debug,socialgram_common=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let poll_interval = PositiveDuration::try_from(Duration::milliseconds(env.poll_interval_ms))?;
    let worker_id = WorkerId::try_from(env.worker_id)?;
    let process_id = ProcessId::try_from(env.process_id)?;

    let gateway = FileGateway::open(env.data_dir).map_err(InitError::DataDir)?;
    let data_dir = gateway.root().display().to_string();
    let client = SocialgramClient::open(Arc::new(gateway), worker_id, process_id)?;

    let users = client.users().users().await.len();
    let posts = client.content().posts().await.len();
    let messages = client.messages().messages().await.len();
    let signed_in = client.users().current_user().await.map(|user| user.username);
    info!(%data_dir, users, posts, messages, ?signed_in, "Store ready");

    let cancellation = CancellationToken::new();
    let poller = client.start_message_sync(poll_interval, cancellation.child_token());

    tokio::signal::ctrl_c().await.map_err(InitError::Signal)?;
    info!("Shutting down");

    cancellation.cancel();
    poller.stop().await;

    Ok(())
}
