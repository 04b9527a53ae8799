//! HTTP surface of the companion.
//!
//! Thin handlers over the presence actor: the browser-side
//! collaborator POSTs song updates here when it prefers REST over the
//! WebSocket channel.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use wavecord_detect::{MonitorHandle, PageSnapshot, SongUpdate};
use wavecord_presence::PresenceHandle;

use crate::artwork;
use crate::ws;

/// Shared handles for all routes and sessions.
#[derive(Clone)]
pub struct AppState {
    pub presence: PresenceHandle,
    pub monitor: MonitorHandle,
    /// HTTP client for artwork lookups; `None` disables them.
    pub http: Option<reqwest::Client>,
    pub artwork_enabled: bool,
    /// Most recent page snapshot shipped by a WebSocket client.
    pub latest_page: Arc<Mutex<Option<PageSnapshot>>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(rename = "discordConnected")]
    pub discord_connected: bool,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/presence", post(set_presence))
        .route("/clear", post(clear_presence))
        .route("/ws", any(ws::ws_handler))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        discord_connected: state.presence.is_connected(),
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}

async fn set_presence(
    State(state): State<AppState>,
    Json(update): Json<SongUpdate>,
) -> Json<StatusResponse> {
    let cleared = update.song.is_none() || !update.is_active;
    apply_update(&state, update).await;
    Json(StatusResponse {
        success: true,
        message: if cleared {
            "Presence cleared"
        } else {
            "Presence updated"
        },
    })
}

async fn clear_presence(State(state): State<AppState>) -> Json<StatusResponse> {
    state.presence.clear();
    Json(StatusResponse {
        success: true,
        message: "Presence cleared",
    })
}

/// Apply one song-state transition to the Discord presence.
///
/// Also drives the transitions produced by the built-in monitor; the
/// artwork lookup happens here so neither the detection loop nor the
/// HTTP handler ever waits on it implicitly.
pub async fn apply_update(state: &AppState, update: SongUpdate) {
    match update.song {
        Some(song) if update.is_active => {
            let artwork_url = match (&state.http, state.artwork_enabled) {
                (Some(client), true) => artwork::fetch_artwork_url(client, &song.url).await,
                _ => None,
            };
            state.presence.update(song, artwork_url);
        }
        _ => state.presence.clear(),
    }
}
