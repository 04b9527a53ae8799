use regex::Regex;
use scraper::Selector;
use serde::Deserialize;

/// Embedded selector database.
const EMBEDDED_DB: &str = include_str!("../data/selectors.toml");

/// On-disk shape of the selector database.
#[derive(Debug, Clone, Deserialize)]
struct DbFile {
    title: ChainDef,
    artist: ChainDef,
    link: ChainDef,
    playing: PlayingDef,
    duration: ChainDef,
    page_title: PageTitleDef,
    sweep: SweepDef,
}

#[derive(Debug, Clone, Deserialize)]
struct ChainDef {
    #[serde(default)]
    css: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlayingDef {
    toggle: String,
    toggle_class: String,
    #[serde(default)]
    indicators: Vec<String>,
    #[serde(default)]
    progress: Vec<String>,
    #[serde(default)]
    pause_labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PageTitleDef {
    #[serde(default)]
    patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SweepDef {
    #[serde(default)]
    css: Vec<String>,
    min_len: usize,
    max_len: usize,
}

/// An ordered chain of compiled CSS selector candidates.
///
/// Chains are evaluated strictly in order; later candidates exist
/// purely as degraded fallbacks for other page layouts.
#[derive(Debug, Clone)]
pub struct Chain {
    selectors: Vec<Selector>,
}

impl Chain {
    fn compile(defs: &[String]) -> Self {
        let selectors = defs
            .iter()
            .filter_map(|css| match Selector::parse(css) {
                Ok(sel) => Some(sel),
                Err(e) => {
                    tracing::warn!(selector = %css, error = %e, "Skipping invalid selector");
                    None
                }
            })
            .collect();
        Self { selectors }
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

/// Play-state detection rules.
#[derive(Debug, Clone)]
pub struct PlayingRules {
    /// Primary play/pause toggle. When present its class is authoritative.
    pub toggle: Option<Selector>,
    /// Class carried by the toggle while audio plays.
    pub toggle_class: String,
    pub indicators: Chain,
    pub progress: Chain,
    pub pause_labels: Chain,
}

/// Bounded last-resort title sweep.
#[derive(Debug, Clone)]
pub struct Sweep {
    pub chain: Chain,
    pub min_len: usize,
    pub max_len: usize,
}

/// Compiled database of selector chains and page-title patterns.
#[derive(Debug, Clone)]
pub struct SelectorDb {
    pub title: Chain,
    pub artist: Chain,
    pub link: Chain,
    pub playing: PlayingRules,
    pub duration: Chain,
    pub title_patterns: Vec<Regex>,
    pub sweep: Sweep,
}

impl SelectorDb {
    /// Load the embedded selector database.
    pub fn embedded() -> Self {
        Self::from_toml(EMBEDDED_DB).expect("embedded selectors.toml should be valid")
    }

    /// Load a selector database from a TOML string.
    ///
    /// Invalid CSS selectors and regexes are skipped with a warning;
    /// only malformed TOML is an error.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let db: DbFile = toml::from_str(toml_str)?;

        let toggle = match Selector::parse(&db.playing.toggle) {
            Ok(sel) => Some(sel),
            Err(e) => {
                tracing::warn!(selector = %db.playing.toggle, error = %e, "Skipping invalid toggle selector");
                None
            }
        };

        let title_patterns = db
            .page_title
            .patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Skipping invalid title pattern");
                    None
                }
            })
            .collect();

        Ok(Self {
            title: Chain::compile(&db.title.css),
            artist: Chain::compile(&db.artist.css),
            link: Chain::compile(&db.link.css),
            playing: PlayingRules {
                toggle,
                toggle_class: db.playing.toggle_class,
                indicators: Chain::compile(&db.playing.indicators),
                progress: Chain::compile(&db.playing.progress),
                pause_labels: Chain::compile(&db.playing.pause_labels),
            },
            duration: Chain::compile(&db.duration.css),
            title_patterns,
            sweep: Sweep {
                chain: Chain::compile(&db.sweep.css),
                min_len: db.sweep.min_len,
                max_len: db.sweep.max_len,
            },
        })
    }
}

impl Default for SelectorDb {
    fn default() -> Self {
        Self::embedded()
    }
}
