use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("selector database: {0}")]
    SelectorDb(#[from] toml::de::Error),

    #[error("monitor is no longer running")]
    MonitorGone,
}
