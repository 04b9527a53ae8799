use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("token exchange failed with status {status}: {details}")]
    Exchange { status: u16, details: String },

    #[error("user info request failed with status {status}")]
    UserInfo { status: u16 },

    #[error("failed to parse Discord response: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
