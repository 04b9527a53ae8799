//! Local companion process: bridges the browser collaborator to
//! Discord Rich Presence and hosts the song monitor.

mod artwork;
mod config;
mod error;
mod server;
mod ws;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wavecord_detect::{driver, ChannelSink, PageSnapshot, SongMonitor};
use wavecord_presence::PresenceHandle;

use crate::config::CompanionConfig;
use crate::error::CompanionError;
use crate::server::AppState;

#[derive(Parser, Debug)]
#[command(name = "wavecord-companion", about = "Discord presence companion for SoundCloud")]
struct Args {
    /// Listen port, overriding the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Path to a config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CompanionError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "wavecord_companion=info,wavecord_detect=info,wavecord_presence=info".into()
                }),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => CompanionConfig::load_from(path)?,
        None => CompanionConfig::load()?,
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let presence = PresenceHandle::start(&config.discord.app_id);

    // The monitor reads whatever page the collaborator last shipped.
    let latest_page: Arc<Mutex<Option<PageSnapshot>>> = Arc::default();
    let page_source = {
        let latest_page = Arc::clone(&latest_page);
        move || latest_page.lock().ok().and_then(|page| (*page).clone())
    };
    let (sink, mut updates) = ChannelSink::new();
    let (monitor, _monitor_task) = driver::spawn(SongMonitor::default(), page_source, sink);

    let state = AppState {
        presence: presence.clone(),
        monitor,
        http: config.artwork.enabled.then(artwork::artwork_client).flatten(),
        artwork_enabled: config.artwork.enabled,
        latest_page,
    };

    // Every monitor transition becomes a presence change.
    let forward_state = state.clone();
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            server::apply_update(&forward_state, update).await;
        }
    });

    let app = server::router(state);
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Companion listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    presence.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down");
}
