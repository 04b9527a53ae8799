//! The song monitor: a two-state machine over detection passes.
//!
//! Idle means no song; Active means a snapshot is held. A pass either
//! confirms the held snapshot (no notification), replaces it (notify
//! with the new snapshot), or clears it (notify with an empty
//! payload). A stopped song is the *absence* of a snapshot, never a
//! snapshot with a paused flag.

use crate::notify::SongUpdate;
use crate::selectors::SelectorDb;
use crate::{extract, PageSnapshot, SongSnapshot};

/// Last-known detection result, owned exclusively by the monitor.
#[derive(Debug, Default)]
pub struct DetectionState {
    current: Option<SongSnapshot>,
}

impl DetectionState {
    pub fn current(&self) -> Option<&SongSnapshot> {
        self.current.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

/// Combines selector resolution and playback detection into detection
/// passes, deduplicating repeated detections of the same track.
pub struct SongMonitor {
    db: SelectorDb,
    state: DetectionState,
}

impl Default for SongMonitor {
    fn default() -> Self {
        Self::new(SelectorDb::embedded())
    }
}

impl SongMonitor {
    pub fn new(db: SelectorDb) -> Self {
        Self {
            db,
            state: DetectionState::default(),
        }
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    /// Current state as an update payload (for control-message replies).
    pub fn status(&self) -> SongUpdate {
        SongUpdate {
            song: self.state.current.clone(),
            is_active: self.state.is_active(),
        }
    }

    /// Run one detection pass against a page snapshot.
    ///
    /// Returns `Some` only on a state transition; repeated passes over
    /// an unchanged page return `None` after the first.
    pub fn check(&mut self, page: &PageSnapshot) -> Option<SongUpdate> {
        self.apply(extract::extract_song(&self.db, page))
    }

    /// Run a pass with no page available (navigation, teardown).
    ///
    /// Equivalent to a pass that resolved nothing: transitions
    /// Active -> Idle if a song was held.
    pub fn reset(&mut self) -> Option<SongUpdate> {
        self.apply(None)
    }

    fn apply(&mut self, found: Option<SongSnapshot>) -> Option<SongUpdate> {
        match (found, self.state.current.as_ref()) {
            (Some(new), Some(cur)) if new.same_song(cur) => {
                tracing::trace!(title = %cur.title, "Same song still playing");
                None
            }
            (Some(new), _) => {
                tracing::info!(title = %new.title, artist = %new.artist, "New song detected");
                self.state.current = Some(new.clone());
                Some(SongUpdate::active(new))
            }
            (None, Some(cur)) => {
                tracing::info!(title = %cur.title, "Song stopped");
                self.state.current = None;
                Some(SongUpdate::idle())
            }
            (None, None) => None,
        }
    }
}
