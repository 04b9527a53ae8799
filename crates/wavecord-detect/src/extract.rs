//! Song extraction: one full detection pass over a page snapshot.

use chrono::Utc;
use scraper::Html;

use crate::selectors::SelectorDb;
use crate::{playback, resolve, PageSnapshot, SongSnapshot};

/// Artist reported when no candidate matched.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Extract the currently playing song, if any.
///
/// Resolution cascade for the title: CSS chain, then page-title
/// patterns (which also yield the artist), then the bounded sweep.
/// Returns `None` when no title resolves or audio is not playing;
/// there is no error path by design, every miss degrades to "no song".
pub fn extract_song(db: &SelectorDb, page: &PageSnapshot) -> Option<SongSnapshot> {
    let doc = Html::parse_document(&page.html);

    let (title, artist_from_title) = match db.title.first_text(&doc) {
        Some(title) => (title, None),
        None => match resolve::title_from_page_title(db, &page.title) {
            Some((title, artist)) => (title, Some(artist)),
            None => (resolve::sweep_title(&db.sweep, &doc)?, None),
        },
    };

    if !playback::is_playing(db, &doc, &page.media) {
        tracing::debug!(%title, "Title resolved but audio is not playing");
        return None;
    }

    let artist = db
        .artist
        .first_text(&doc)
        .or(artist_from_title)
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    let url = resolve::resolve_song_url(db, &doc, &page.url);
    let duration_secs = resolve_duration(db, &doc, page);

    Some(SongSnapshot {
        title,
        artist,
        url,
        duration_secs,
        observed_at: Utc::now(),
    })
}

/// Track length: native media element duration first, then the
/// player's time display.
fn resolve_duration(db: &SelectorDb, doc: &Html, page: &PageSnapshot) -> Option<u32> {
    for media in &page.media {
        if let Some(d) = media.duration {
            if d.is_finite() && d > 0.0 {
                return Some(d as u32);
            }
        }
    }

    db.duration
        .first_text(doc)
        .and_then(|text| resolve::parse_time_display(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaElementState;

    fn playing_page(html: &str) -> PageSnapshot {
        PageSnapshot {
            url: "https://soundcloud.com/discover".into(),
            title: "Discover | Listen online".into(),
            html: format!(r#"<html><body><button class="playControl playing"></button>{html}</body></html>"#),
            media: vec![],
        }
    }

    #[test]
    fn test_full_extraction() {
        let db = SelectorDb::embedded();
        let page = playing_page(
            r#"<a class="playbackSoundBadge__titleLink" href="/neon/night-drive">Night Drive</a>
               <a class="playbackSoundBadge__usernameLink" href="/neon">Neon Artist</a>
               <span class="playbackTimeline__duration">3:41</span>"#,
        );
        let song = extract_song(&db, &page).unwrap();
        assert_eq!(song.title, "Night Drive");
        assert_eq!(song.artist, "Neon Artist");
        assert_eq!(song.url, "https://soundcloud.com/neon/night-drive");
        assert_eq!(song.duration_secs, Some(221));
    }

    #[test]
    fn test_not_playing_yields_none() {
        let db = SelectorDb::embedded();
        let page = PageSnapshot {
            url: "https://soundcloud.com/neon/night-drive".into(),
            title: "Night Drive by Neon Artist | Listen".into(),
            html: r#"<html><body>
                <button class="playControl"></button>
                <span class="soundTitle__title">Night Drive</span>
            </body></html>"#
                .into(),
            media: vec![],
        };
        assert!(extract_song(&db, &page).is_none());
    }

    #[test]
    fn test_page_title_fallback_provides_artist() {
        let db = SelectorDb::embedded();
        let page = PageSnapshot {
            url: "https://soundcloud.com/artist-b/song-b".into(),
            title: "Song B by Artist B | Listen online".into(),
            html: r#"<html><body><button class="playControl playing"></button></body></html>"#
                .into(),
            media: vec![],
        };
        let song = extract_song(&db, &page).unwrap();
        assert_eq!(song.title, "Song B");
        assert_eq!(song.artist, "Artist B");
    }

    #[test]
    fn test_missing_artist_defaults() {
        let db = SelectorDb::embedded();
        let page = playing_page(r#"<span class="soundTitle__title">Lonely Track</span>"#);
        let song = extract_song(&db, &page).unwrap();
        assert_eq!(song.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_no_title_yields_none() {
        let db = SelectorDb::embedded();
        let page = PageSnapshot {
            url: "https://soundcloud.com/discover".into(),
            title: "xy".into(),
            html: r#"<html><body><button class="playControl playing"></button></body></html>"#
                .into(),
            media: vec![],
        };
        assert!(extract_song(&db, &page).is_none());
    }

    #[test]
    fn test_duration_from_media_element() {
        let db = SelectorDb::embedded();
        let mut page = playing_page(r#"<span class="soundTitle__title">Night Drive</span>"#);
        page.media = vec![MediaElementState {
            paused: false,
            ended: false,
            current_time: 4.0,
            duration: Some(199.7),
        }];
        let song = extract_song(&db, &page).unwrap();
        assert_eq!(song.duration_secs, Some(199));
    }
}
