pub mod driver;
pub mod error;
pub mod extract;
pub mod monitor;
pub mod notify;
pub mod playback;
pub mod resolve;
pub mod selectors;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use driver::{MonitorCommand, MonitorHandle};
pub use monitor::{DetectionState, SongMonitor};
pub use notify::{ChannelSink, Notification, SongSink, SongUpdate};
pub use selectors::SelectorDb;

/// Point-in-time belief about the currently playing track.
///
/// Immutable once constructed. Snapshots are compared by value on
/// (title, artist, url); `observed_at` never participates in change
/// detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongSnapshot {
    /// Track title as shown in the player.
    pub title: String,
    /// Artist name, or "Unknown Artist" when no candidate matched.
    pub artist: String,
    /// Permalink of the track (player link, page metadata, or page URL).
    pub url: String,
    /// Track length in seconds, when the page exposes one.
    #[serde(rename = "duration")]
    pub duration_secs: Option<u32>,
    /// When this snapshot was taken. Collaborator payloads may omit
    /// it; it defaults to the time of deserialization.
    #[serde(
        rename = "timestamp",
        default = "Utc::now",
        with = "chrono::serde::ts_milliseconds"
    )]
    pub observed_at: DateTime<Utc>,
}

impl SongSnapshot {
    /// Whether two snapshots describe the same track.
    pub fn same_song(&self, other: &SongSnapshot) -> bool {
        self.title == other.title && self.artist == other.artist && self.url == other.url
    }
}

impl PartialEq for SongSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.same_song(other)
    }
}

/// A host-supplied view of the player page at one instant.
///
/// The page is a third-party site, so this carries everything the
/// detector may need: the raw markup, the document title and URL, and
/// the native state of any `<audio>`/`<video>` elements (which static
/// HTML cannot express).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Current page URL.
    pub url: String,
    /// Document title.
    pub title: String,
    /// Serialized document markup.
    pub html: String,
    /// Native playback state of media elements on the page.
    #[serde(default)]
    pub media: Vec<MediaElementState>,
}

/// Native state of one `<audio>` or `<video>` element.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MediaElementState {
    pub paused: bool,
    pub ended: bool,
    /// Playback position in seconds.
    pub current_time: f64,
    /// Media length in seconds, when known.
    pub duration: Option<f64>,
}

impl MediaElementState {
    /// Whether this element is actively producing audio.
    pub fn is_playing(&self) -> bool {
        !self.paused && !self.ended && self.current_time > 0.0
    }
}
