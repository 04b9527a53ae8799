//! Discord Rich Presence integration.
//!
//! Runs a `DiscordIpcClient` on a dedicated OS thread (IPC is
//! blocking) and exposes a cheap cloneable `PresenceHandle` via MPSC
//! channels. Connects lazily on the first update and reconnects after
//! a failed send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{SystemTime, UNIX_EPOCH};

use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};

use wavecord_detect::SongSnapshot;

/// Default Discord Application ID for Wavecord.
///
/// Not a secret — it controls the activity name Discord shows.
pub const APP_ID: &str = "1400634915942301806";

/// Fallback asset key when no artwork URL is known.
const DEFAULT_LARGE_IMAGE: &str = "soundcloud";

/// Commands sent to the presence actor thread.
enum PresenceCommand {
    Update {
        song: SongSnapshot,
        artwork_url: Option<String>,
    },
    Clear,
    Shutdown,
}

/// Text and assets of one activity, separated from the IPC types so
/// it can be built and inspected without a Discord connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceFields {
    /// First line: the track title.
    pub details: String,
    /// Second line: the artist.
    pub state: String,
    pub large_image: String,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
    pub button_label: String,
    pub button_url: String,
}

impl PresenceFields {
    /// Build the presence shown for a song.
    pub fn for_song(song: &SongSnapshot, artwork_url: Option<&str>) -> Self {
        Self {
            details: song.title.clone(),
            state: song.artist.clone(),
            large_image: artwork_url.unwrap_or(DEFAULT_LARGE_IMAGE).to_string(),
            large_text: song.title.clone(),
            small_image: "play".to_string(),
            small_text: "Listening".to_string(),
            button_label: "View on SoundCloud".to_string(),
            button_url: song.url.clone(),
        }
    }
}

/// Cloneable handle to the presence actor thread.
#[derive(Clone)]
pub struct PresenceHandle {
    tx: mpsc::Sender<PresenceCommand>,
    connected: Arc<AtomicBool>,
}

impl PresenceHandle {
    /// Spawn the presence actor thread for the given application ID.
    pub fn start(app_id: &str) -> Self {
        let (tx, rx) = mpsc::channel();
        let app_id = app_id.to_string();
        let connected = Arc::new(AtomicBool::new(false));
        let connected_actor = Arc::clone(&connected);

        std::thread::Builder::new()
            .name("discord-rpc".into())
            .spawn(move || actor_loop(&app_id, rx, &connected_actor))
            .expect("failed to spawn discord-rpc thread");

        Self { tx, connected }
    }

    /// Whether the actor currently holds a live Discord connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Set the presence to the given song. Fire-and-forget.
    pub fn update(&self, song: SongSnapshot, artwork_url: Option<String>) {
        let _ = self.tx.send(PresenceCommand::Update { song, artwork_url });
    }

    /// Clear the presence (nothing playing). Fire-and-forget.
    pub fn clear(&self) {
        let _ = self.tx.send(PresenceCommand::Clear);
    }

    /// Clear the presence and stop the actor thread.
    pub fn shutdown(&self) {
        let _ = self.tx.send(PresenceCommand::Shutdown);
    }
}

/// The actor loop: owns the IPC client and processes commands.
fn actor_loop(app_id: &str, rx: mpsc::Receiver<PresenceCommand>, connected_flag: &AtomicBool) {
    let mut client: Option<DiscordIpcClient> = None;
    let mut connected = false;

    for cmd in rx {
        match cmd {
            PresenceCommand::Update { song, artwork_url } => {
                // Lazy-connect on first update.
                if client.is_none() {
                    client = Some(DiscordIpcClient::new(app_id));
                }
                let Some(ipc) = client.as_mut() else {
                    continue;
                };

                if !connected {
                    match ipc.connect() {
                        Ok(()) => {
                            connected = true;
                            connected_flag.store(true, Ordering::Relaxed);
                            tracing::info!("Connected to Discord IPC");
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "Discord not available");
                            continue;
                        }
                    }
                }

                let fields = PresenceFields::for_song(&song, artwork_url.as_deref());

                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs() as i64;

                let payload = activity::Activity::new()
                    .details(&fields.details)
                    .state(&fields.state)
                    .timestamps(activity::Timestamps::new().start(now))
                    .assets(
                        activity::Assets::new()
                            .large_image(&fields.large_image)
                            .large_text(&fields.large_text)
                            .small_image(&fields.small_image)
                            .small_text(&fields.small_text),
                    )
                    .buttons(vec![activity::Button::new(
                        &fields.button_label,
                        &fields.button_url,
                    )]);

                if let Err(e) = ipc.set_activity(payload) {
                    tracing::debug!(error = %e, "Failed to set Discord activity");
                    // Connection probably died — reset for reconnect.
                    connected = false;
                    connected_flag.store(false, Ordering::Relaxed);
                    client = None;
                } else {
                    tracing::info!(title = %song.title, artist = %song.artist, "Presence updated");
                }
            }
            PresenceCommand::Clear => {
                if let Some(ipc) = client.as_mut() {
                    if connected {
                        if let Err(e) = ipc.clear_activity() {
                            tracing::debug!(error = %e, "Failed to clear Discord activity");
                            connected = false;
                            connected_flag.store(false, Ordering::Relaxed);
                            client = None;
                        } else {
                            tracing::info!("Presence cleared");
                        }
                    }
                }
            }
            PresenceCommand::Shutdown => {
                if let Some(ref mut ipc) = client {
                    if connected {
                        let _ = ipc.clear_activity();
                        let _ = ipc.close();
                    }
                }
                connected_flag.store(false, Ordering::Relaxed);
                break;
            }
        }
    }
}
