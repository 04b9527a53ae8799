//! WebSocket channel for the browser collaborator.
//!
//! One session per client. Inbound messages are a tagged JSON enum;
//! unparseable frames are logged and skipped so a misbehaving client
//! cannot kill the session. Page snapshots feed the shared monitor,
//! everything else maps onto presence or monitor control calls.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use wavecord_detect::{PageSnapshot, SongSnapshot, SongUpdate};

use crate::server::{apply_update, AppState};

/// Messages a client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Push a song state straight to Discord.
    UpdatePresence {
        #[serde(rename = "songInfo")]
        song_info: Option<SongSnapshot>,
        #[serde(rename = "isActive", default)]
        is_active: bool,
    },
    /// Drop the Discord presence.
    ClearPresence,
    /// Ship a fresh view of the player page. Feeds the monitor and
    /// schedules a debounced detection pass.
    #[serde(rename = "PAGE_SNAPSHOT")]
    Page { page: PageSnapshot },
    /// Ask for the monitor's last-known state.
    GetCurrentSong,
    /// Ask for an immediate detection pass and its result.
    ForceCheckSong,
    /// Liveness probe.
    Ping,
}

/// Messages the companion sends back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    PresenceUpdated {
        success: bool,
    },
    PresenceCleared {
        success: bool,
    },
    /// Reply to both `GetCurrentSong` and `ForceCheckSong`.
    CurrentSong {
        #[serde(rename = "songInfo")]
        song_info: Option<SongSnapshot>,
        #[serde(rename = "isActive")]
        is_active: bool,
    },
    Pong {
        timestamp: i64,
    },
}

impl From<SongUpdate> for ServerMessage {
    fn from(update: SongUpdate) -> Self {
        ServerMessage::CurrentSong {
            song_info: update.song,
            is_active: update.is_active,
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

async fn client_session(mut socket: WebSocket, state: AppState) {
    tracing::debug!("Collaborator connected");

    while let Some(Ok(message)) = socket.recv().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let parsed: ClientMessage = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unparseable frame");
                continue;
            }
        };

        if let Some(reply) = handle_message(parsed, &state).await {
            let Ok(body) = serde_json::to_string(&reply) else {
                continue;
            };
            if socket.send(Message::Text(body.into())).await.is_err() {
                break;
            }
        }
    }

    tracing::debug!("Collaborator disconnected");
}

/// Dispatch one inbound message, returning the reply frame if any.
async fn handle_message(message: ClientMessage, state: &AppState) -> Option<ServerMessage> {
    match message {
        ClientMessage::UpdatePresence { song_info, is_active } => {
            apply_update(
                state,
                SongUpdate {
                    song: song_info,
                    is_active,
                },
            )
            .await;
            Some(ServerMessage::PresenceUpdated { success: true })
        }
        ClientMessage::ClearPresence => {
            state.presence.clear();
            Some(ServerMessage::PresenceCleared { success: true })
        }
        ClientMessage::Page { page } => {
            if let Ok(mut latest) = state.latest_page.lock() {
                *latest = Some(page);
            }
            state.monitor.notify_mutation();
            None
        }
        ClientMessage::GetCurrentSong => {
            let update = state
                .monitor
                .current()
                .await
                .unwrap_or_else(|_| SongUpdate::idle());
            Some(update.into())
        }
        ClientMessage::ForceCheckSong => {
            let update = state
                .monitor
                .force_check()
                .await
                .unwrap_or_else(|_| SongUpdate::idle());
            Some(update.into())
        }
        ClientMessage::Ping => Some(ServerMessage::Pong {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"PING"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"GET_CURRENT_SONG"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GetCurrentSong));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"FORCE_CHECK_SONG"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::ForceCheckSong));
    }

    #[test]
    fn test_update_presence_parses() {
        let body = r#"{
            "type": "UPDATE_PRESENCE",
            "songInfo": {
                "title": "Night Drive",
                "artist": "Neon Artist",
                "url": "https://soundcloud.com/neon/night-drive"
            },
            "isActive": true
        }"#;
        let msg: ClientMessage = serde_json::from_str(body).unwrap();
        match msg {
            ClientMessage::UpdatePresence {
                song_info: Some(song),
                is_active,
            } => {
                assert_eq!(song.artist, "Neon Artist");
                assert!(is_active);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_page_snapshot_parses() {
        let body = r#"{
            "type": "PAGE_SNAPSHOT",
            "page": {
                "url": "https://soundcloud.com/neon/night-drive",
                "title": "Night Drive by Neon Artist | Listen",
                "html": "<html></html>"
            }
        }"#;
        let msg: ClientMessage = serde_json::from_str(body).unwrap();
        match msg {
            ClientMessage::Page { page } => {
                assert!(page.media.is_empty());
                assert_eq!(page.title, "Night Drive by Neon Artist | Listen");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_current_song_reply_wire_format() {
        let reply = ServerMessage::CurrentSong {
            song_info: None,
            is_active: false,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "CURRENT_SONG");
        assert_eq!(json["songInfo"], serde_json::Value::Null);
        assert_eq!(json["isActive"], false);
    }

    #[test]
    fn test_pong_wire_format() {
        let json = serde_json::to_value(ServerMessage::Pong {
            timestamp: 1_700_000_000_000,
        })
        .unwrap();
        assert_eq!(json["type"], "PONG");
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
    }
}
