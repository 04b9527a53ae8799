//! Selector resolution against a parsed page.
//!
//! Every function here is a best-effort lookup: a miss is `None`,
//! never an error. The host page's markup is not a stable contract,
//! so callers treat "not found" as "no song" and move on.

use scraper::{ElementRef, Html, Selector};

use crate::selectors::{Chain, SelectorDb, Sweep};

/// Element text, whitespace-collapsed and trimmed.
fn element_text(el: ElementRef<'_>) -> String {
    let text: String = el.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Chain {
    /// First candidate whose match has non-empty text.
    ///
    /// An element that matches but holds only whitespace counts as a
    /// miss and the walk continues with the next candidate.
    pub fn first_text(&self, doc: &Html) -> Option<String> {
        for sel in self.selectors() {
            if let Some(el) = doc.select(sel).next() {
                let text = element_text(el);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }

    /// First candidate whose match carries a non-empty `href`.
    pub fn first_href(&self, doc: &Html) -> Option<String> {
        for sel in self.selectors() {
            if let Some(href) = doc
                .select(sel)
                .next()
                .and_then(|el| el.value().attr("href"))
            {
                if !href.trim().is_empty() {
                    return Some(href.trim().to_string());
                }
            }
        }
        None
    }

    /// Whether any candidate matches at all.
    pub fn matches(&self, doc: &Html) -> bool {
        self.selectors().iter().any(|sel| doc.select(sel).next().is_some())
    }
}

/// Extract (title, artist) from the document title.
///
/// Patterns are tried in order; each must expose two capture groups.
/// The stricter `"X by Y | Site"` form runs before the bare
/// `"X by Y"` form so suffixed titles don't leak the site name into
/// the artist.
pub fn title_from_page_title(db: &SelectorDb, page_title: &str) -> Option<(String, String)> {
    for re in &db.title_patterns {
        if let Some(caps) = re.captures(page_title) {
            let title = caps.get(1)?.as_str().trim();
            let artist = caps.get(2)?.as_str().trim();
            if !title.is_empty() && !artist.is_empty() {
                return Some((title.to_string(), artist.to_string()));
            }
        }
    }
    None
}

/// Last-resort sweep over heading-ish elements for anything that
/// looks like a track title.
pub fn sweep_title(sweep: &Sweep, doc: &Html) -> Option<String> {
    for sel in sweep.chain.selectors() {
        for el in doc.select(sel) {
            let text = element_text(el);
            if text.len() >= sweep.min_len && text.len() <= sweep.max_len {
                return Some(text);
            }
        }
    }
    None
}

/// Resolve the track permalink.
///
/// Preference order: player link element, then (when the page itself
/// is not a track page) `og:url` / canonical / JSON-LD metadata, then
/// the page URL as-is.
pub fn resolve_song_url(db: &SelectorDb, doc: &Html, page_url: &str) -> String {
    if let Some(href) = db.link.first_href(doc) {
        return absolutize(page_url, &href);
    }

    if !is_track_page(page_url) {
        if let Some(meta) = metadata_url(doc) {
            if meta != page_url {
                return meta;
            }
        }
    }

    page_url.to_string()
}

/// A track page path looks like `/<artist>/<permalink>`.
fn is_track_page(page_url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(page_url) else {
        return false;
    };
    let segments: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    segments.len() == 2
}

/// Track URL from page metadata: `og:url`, canonical link, or the
/// `url` field of a JSON-LD block.
fn metadata_url(doc: &Html) -> Option<String> {
    let og = Selector::parse(r#"meta[property="og:url"]"#).ok()?;
    if let Some(content) = doc.select(&og).next().and_then(|el| el.value().attr("content")) {
        if !content.is_empty() {
            return Some(content.to_string());
        }
    }

    let canonical = Selector::parse(r#"link[rel="canonical"]"#).ok()?;
    if let Some(href) = doc
        .select(&canonical)
        .next()
        .and_then(|el| el.value().attr("href"))
    {
        if !href.is_empty() {
            return Some(href.to_string());
        }
    }

    let ld = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    for el in doc.select(&ld) {
        let raw: String = el.text().collect();
        if let Ok(data) = serde_json::from_str::<serde_json::Value>(&raw) {
            if let Some(u) = data.get("url").and_then(|v| v.as_str()) {
                if !u.is_empty() {
                    return Some(u.to_string());
                }
            }
        }
    }

    None
}

/// Resolve a possibly relative href against the page URL.
fn absolutize(page_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match url::Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Parse a `m:ss` / `mm:ss` time display into seconds.
pub fn parse_time_display(text: &str) -> Option<u32> {
    let re = regex::Regex::new(r"(\d{1,2}):(\d{2})").ok()?;
    let caps = re.captures(text)?;
    let minutes: u32 = caps.get(1)?.as_str().parse().ok()?;
    let seconds: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some(minutes * 60 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_first_text_priority_order() {
        let db = SelectorDb::embedded();
        let d = doc(
            r#"<html><body>
                <a class="playbackSoundBadge__titleLink" href="/artist/track">Night Drive</a>
                <span class="soundTitle__title">Wrong Title</span>
            </body></html>"#,
        );
        assert_eq!(db.title.first_text(&d).as_deref(), Some("Night Drive"));
    }

    #[test]
    fn test_first_text_skips_empty_match() {
        // A matching element with only whitespace is a miss, not a hit.
        let db = SelectorDb::embedded();
        let d = doc(
            r#"<html><body>
                <a class="playbackSoundBadge__titleLink" href="/a/t">   </a>
                <span class="soundTitle__title">Fallback Title</span>
            </body></html>"#,
        );
        assert_eq!(db.title.first_text(&d).as_deref(), Some("Fallback Title"));
    }

    #[test]
    fn test_first_text_collapses_whitespace() {
        let db = SelectorDb::embedded();
        let d = doc(r#"<div class="soundTitle__title">  Night
            Drive  </div>"#);
        assert_eq!(db.title.first_text(&d).as_deref(), Some("Night Drive"));
    }

    #[test]
    fn test_no_match_is_none() {
        let db = SelectorDb::embedded();
        let d = doc("<html><body><p>nothing here</p></body></html>");
        assert_eq!(db.link.first_href(&d), None);
    }

    #[test]
    fn test_page_title_with_site_suffix() {
        let db = SelectorDb::embedded();
        let got = title_from_page_title(&db, "Song B by Artist B | Listen online");
        assert_eq!(got, Some(("Song B".into(), "Artist B".into())));
    }

    #[test]
    fn test_page_title_simple_form() {
        let db = SelectorDb::embedded();
        let got = title_from_page_title(&db, "Song C by Artist C");
        assert_eq!(got, Some(("Song C".into(), "Artist C".into())));
    }

    #[test]
    fn test_page_title_no_match() {
        let db = SelectorDb::embedded();
        assert_eq!(title_from_page_title(&db, "Discover | Music"), None);
    }

    #[test]
    fn test_sweep_respects_length_bounds() {
        let db = SelectorDb::embedded();
        let d = doc(
            r#"<html><body>
                <h1>ok</h1>
                <h2>A Plausible Track Title</h2>
            </body></html>"#,
        );
        assert_eq!(
            sweep_title(&db.sweep, &d).as_deref(),
            Some("A Plausible Track Title")
        );
    }

    #[test]
    fn test_song_url_from_player_link() {
        let db = SelectorDb::embedded();
        let d = doc(r#"<a class="playbackSoundBadge__titleLink" href="/artist/night-drive">x</a>"#);
        assert_eq!(
            resolve_song_url(&db, &d, "https://soundcloud.com/discover"),
            "https://soundcloud.com/artist/night-drive"
        );
    }

    #[test]
    fn test_song_url_og_meta_on_playlist_page() {
        let db = SelectorDb::embedded();
        let d = doc(
            r#"<html><head>
                <meta property="og:url" content="https://soundcloud.com/artist/track">
            </head><body></body></html>"#,
        );
        assert_eq!(
            resolve_song_url(&db, &d, "https://soundcloud.com/artist/sets/mix"),
            "https://soundcloud.com/artist/track"
        );
    }

    #[test]
    fn test_song_url_json_ld_fallback() {
        let db = SelectorDb::embedded();
        let d = doc(
            r#"<html><head>
                <script type="application/ld+json">{"url":"https://soundcloud.com/a/t"}</script>
            </head><body></body></html>"#,
        );
        assert_eq!(
            resolve_song_url(&db, &d, "https://soundcloud.com/discover"),
            "https://soundcloud.com/a/t"
        );
    }

    #[test]
    fn test_song_url_track_page_keeps_page_url() {
        // On a track page the page URL already is the permalink; the
        // metadata fallbacks are not consulted.
        let db = SelectorDb::embedded();
        let d = doc(
            r#"<head><meta property="og:url" content="https://elsewhere.example/x"></head>"#,
        );
        assert_eq!(
            resolve_song_url(&db, &d, "https://soundcloud.com/artist/track"),
            "https://soundcloud.com/artist/track"
        );
    }

    #[test]
    fn test_parse_time_display() {
        assert_eq!(parse_time_display("3:45"), Some(225));
        assert_eq!(parse_time_display("12:03"), Some(723));
        assert_eq!(parse_time_display("-- / --"), None);
    }
}
