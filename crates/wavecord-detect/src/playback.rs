//! Playback state detection.
//!
//! The page exposes no single reliable "playing" flag, so this is a
//! union of heuristic signals checked in a fixed order with the first
//! positive one winning. The order is load-bearing only in that it
//! mirrors how the page has historically behaved; it is a best-effort
//! approximation, not a contract.

use scraper::Html;

use crate::selectors::SelectorDb;
use crate::MediaElementState;

/// Whether audio is currently playing.
///
/// Signals, in order:
/// 1. the primary play/pause toggle's active class (authoritative
///    when the toggle exists),
/// 2. alternate play-state selectors,
/// 3. native media element state,
/// 4. a progress bar with non-zero width,
/// 5. any element whose `aria-label` mentions "pause".
pub fn is_playing(db: &SelectorDb, doc: &Html, media: &[MediaElementState]) -> bool {
    let rules = &db.playing;

    // 1. Primary toggle. When present, its class list decides.
    if let Some(toggle) = &rules.toggle {
        if let Some(el) = doc.select(toggle).next() {
            let playing = el
                .value()
                .classes()
                .any(|c| c == rules.toggle_class.as_str());
            tracing::trace!(playing, "Primary toggle found");
            return playing;
        }
    }

    // 2. Alternate play-state indicators.
    if rules.indicators.matches(doc) {
        tracing::trace!("Play indicator matched");
        return true;
    }

    // 3. Native media element state.
    if media.iter().any(MediaElementState::is_playing) {
        tracing::trace!("Media element is playing");
        return true;
    }

    // 4. Progress bar width. A static snapshot has no computed style,
    //    so this reads the inline width and treats 0px/0% as stopped.
    for sel in rules.progress.selectors() {
        for el in doc.select(sel) {
            if let Some(style) = el.value().attr("style") {
                if let Some(width) = inline_width(style) {
                    if width != "0px" && width != "0%" && !width.is_empty() {
                        tracing::trace!(width, "Progress bar has width");
                        return true;
                    }
                }
            }
        }
    }

    // 5. A pause control in the accessibility tree implies playback.
    for sel in rules.pause_labels.selectors() {
        for el in doc.select(sel) {
            if let Some(label) = el.value().attr("aria-label") {
                if label.to_lowercase().contains("pause") {
                    tracing::trace!(label, "Pause control present");
                    return true;
                }
            }
        }
    }

    false
}

/// Extract the `width` value from an inline style string.
fn inline_width(style: &str) -> Option<&str> {
    for decl in style.split(';') {
        let mut parts = decl.splitn(2, ':');
        let prop = parts.next()?.trim();
        if prop.eq_ignore_ascii_case("width") {
            return Some(parts.next()?.trim());
        }
    }
    None
}
