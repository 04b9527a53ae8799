//! Change notification to the background collaborator.
//!
//! Delivery is fire-and-forget: a failed send is reported to the
//! caller as a typed error, logged there, and never retried. Nothing
//! in this module blocks a detection pass.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::SongSnapshot;

/// One song-state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongUpdate {
    /// The new snapshot, or `None` when playback stopped.
    #[serde(rename = "songInfo")]
    pub song: Option<SongSnapshot>,
    /// Whether a song is currently active.
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

impl SongUpdate {
    pub fn active(song: SongSnapshot) -> Self {
        Self {
            song: Some(song),
            is_active: true,
        }
    }

    pub fn idle() -> Self {
        Self {
            song: None,
            is_active: false,
        }
    }
}

/// Wire envelope for collaborator-bound messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    SongDetected {
        #[serde(rename = "songInfo")]
        song_info: Option<SongSnapshot>,
        #[serde(rename = "isActive")]
        is_active: bool,
    },
}

impl From<SongUpdate> for Notification {
    fn from(update: SongUpdate) -> Self {
        Notification::SongDetected {
            song_info: update.song,
            is_active: update.is_active,
        }
    }
}

/// The collaborator was unreachable; the update was dropped.
#[derive(Debug, thiserror::Error)]
#[error("no listener attached to the song channel")]
pub struct DeliveryError;

/// Outbound channel the monitor depends on abstractly.
pub trait SongSink: Send + 'static {
    /// Deliver one update. Must not block.
    fn deliver(&self, update: SongUpdate) -> Result<(), DeliveryError>;
}

/// Channel-backed sink; the receiving half belongs to the collaborator.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SongUpdate>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SongUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SongSink for ChannelSink {
    fn deliver(&self, update: SongUpdate) -> Result<(), DeliveryError> {
        self.tx.send(update).map_err(|_| DeliveryError)
    }
}
