//! Discord OAuth2 code exchange.
//!
//! The relay exists so the client secret never ships inside the
//! browser extension: the extension sends its authorization code
//! here, and this module swaps it for tokens and the user profile.

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

const TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
const USER_URL: &str = "https://discord.com/api/users/@me";

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    #[allow(dead_code)]
    pub token_type: Option<String>,
}

/// The Discord user profile, forwarded to the extension verbatim
/// apart from the fields the relay itself logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse, RelayError> {
    let resp = http
        .post(TOKEN_URL)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let details = resp.text().await.unwrap_or_default();
        return Err(RelayError::Exchange { status, details });
    }

    resp.json::<TokenResponse>()
        .await
        .map_err(|e| RelayError::Parse(e.to_string()))
}

/// Fetch the profile of the user the token belongs to.
pub async fn fetch_user(
    http: &reqwest::Client,
    access_token: &str,
) -> Result<DiscordUser, RelayError> {
    let resp = http
        .get(USER_URL)
        .bearer_auth(access_token)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(RelayError::UserInfo {
            status: resp.status().as_u16(),
        });
    }

    resp.json::<DiscordUser>()
        .await
        .map_err(|e| RelayError::Parse(e.to_string()))
}
