//! Best-effort artwork lookup.
//!
//! The track's public page embeds its artwork URL in a JSON blob;
//! this scrapes it out with a regex rather than a full API client.
//! Every failure path yields `None` — artwork is decoration, never a
//! reason to skip a presence update.

use std::time::Duration;

use regex::Regex;

/// Fetch timeout for the track page.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the HTTP client used for artwork lookups.
pub fn artwork_client() -> Option<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .ok()
}

/// Fetch the track page and extract its artwork URL.
pub async fn fetch_artwork_url(client: &reqwest::Client, song_url: &str) -> Option<String> {
    let response = client.get(song_url).send().await.ok()?;
    if !response.status().is_success() {
        tracing::debug!(status = %response.status(), "Artwork page fetch failed");
        return None;
    }
    let html = response.text().await.ok()?;
    parse_artwork_url(&html)
}

/// Extract `"artwork_url": "…"` from page markup, rewritten to the
/// 300x300 variant Discord renders well.
pub fn parse_artwork_url(html: &str) -> Option<String> {
    let re = Regex::new(r#""artwork_url":"([^"]+)""#).ok()?;
    let caps = re.captures(html)?;
    let raw = caps.get(1)?.as_str();
    if raw.is_empty() {
        return None;
    }
    Some(raw.replace("t500x500", "t300x300"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_artwork_url() {
        let html = r#"<script>window.__sc_hydration = [{"artwork_url":"https://i1.sndcdn.com/artworks-abc-t500x500.jpg","title":"x"}]</script>"#;
        assert_eq!(
            parse_artwork_url(html).as_deref(),
            Some("https://i1.sndcdn.com/artworks-abc-t300x300.jpg")
        );
    }

    #[test]
    fn test_parse_artwork_url_keeps_other_sizes() {
        let html = r#"{"artwork_url":"https://i1.sndcdn.com/artworks-abc-large.jpg"}"#;
        assert_eq!(
            parse_artwork_url(html).as_deref(),
            Some("https://i1.sndcdn.com/artworks-abc-large.jpg")
        );
    }

    #[test]
    fn test_parse_artwork_url_missing() {
        assert_eq!(parse_artwork_url("<html><body>no art</body></html>"), None);
    }
}
