//! Token-exchange relay.
//!
//! A tiny public endpoint that holds the Discord client secret so the
//! browser extension never has to. One route: POST an authorization
//! code, get back tokens plus the user profile.

mod error;
mod exchange;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::RelayError;
use crate::exchange::DiscordUser;

/// Application id of the extension's Discord app. Public by design;
/// only the secret stays server-side.
const CLIENT_ID: &str = "1400634915942301806";

#[derive(Parser, Debug)]
#[command(name = "wavecord-relay", about = "Discord OAuth token-exchange relay")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Listen port.
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[derive(Clone)]
struct RelayState {
    http: reqwest::Client,
    client_id: String,
    /// From `DISCORD_CLIENT_SECRET`; requests fail with 500 until set.
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExchangeRequest {
    code: Option<String>,
    #[serde(rename = "redirectUri")]
    redirect_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExchangeResponse {
    success: bool,
    #[serde(rename = "userInfo")]
    user_info: DiscordUser,
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
    #[serde(rename = "expiresIn")]
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    message: &'static str,
    status: &'static str,
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "wavecord_relay=info".into()),
        )
        .init();

    let args = Args::parse();
    let client_secret = std::env::var("DISCORD_CLIENT_SECRET").ok();
    if client_secret.is_none() {
        tracing::warn!("DISCORD_CLIENT_SECRET not set; exchanges will be rejected");
    }

    let state = RelayState {
        http: reqwest::Client::new(),
        client_id: CLIENT_ID.to_string(),
        client_secret,
    };

    let app = Router::new()
        .route("/", get(health).post(exchange))
        .layer(middleware::from_fn(cors))
        .with_state(state);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Relay listening");
    axum::serve(listener, app).await
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Discord OAuth endpoint is working",
        status: "ready",
    })
}

async fn exchange(
    State(state): State<RelayState>,
    Json(body): Json<ExchangeRequest>,
) -> Response {
    let (Some(code), Some(redirect_uri)) = (body.code, body.redirect_uri) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing code or redirectUri",
            None,
        );
    };

    let Some(secret) = state.client_secret.as_deref() else {
        tracing::error!("DISCORD_CLIENT_SECRET not configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error",
            None,
        );
    };

    let tokens = match exchange::exchange_code(
        &state.http,
        &state.client_id,
        secret,
        &code,
        &redirect_uri,
    )
    .await
    {
        Ok(tokens) => tokens,
        Err(RelayError::Exchange { status, details }) => {
            tracing::error!(status, "Token exchange failed");
            return error_response(
                StatusCode::BAD_REQUEST,
                "Token exchange failed",
                Some(details),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "OAuth handler error");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                None,
            );
        }
    };

    let user = match exchange::fetch_user(&state.http, &tokens.access_token).await {
        Ok(user) => user,
        Err(RelayError::UserInfo { status }) => {
            tracing::error!(status, "Failed to get user info");
            return error_response(StatusCode::BAD_REQUEST, "Failed to get user info", None);
        }
        Err(e) => {
            tracing::error!(error = %e, "OAuth handler error");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                None,
            );
        }
    };

    tracing::info!(user = %user.username, "Authorized");
    Json(ExchangeResponse {
        success: true,
        user_info: user,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
    })
    .into_response()
}

fn error_response(status: StatusCode, error: &'static str, details: Option<String>) -> Response {
    (status, Json(ErrorResponse { error, details })).into_response()
}

/// Permissive CORS so the extension's origin can call the relay.
async fn cors(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(
        "access-control-allow-origin",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("Content-Type"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_request_parses() {
        let body = r#"{"code":"abc","redirectUri":"https://example.com/cb"}"#;
        let req: ExchangeRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.code.as_deref(), Some("abc"));
        assert_eq!(req.redirect_uri.as_deref(), Some("https://example.com/cb"));
    }

    #[test]
    fn test_exchange_request_tolerates_missing_fields() {
        let req: ExchangeRequest = serde_json::from_str(r#"{"code":"abc"}"#).unwrap();
        assert!(req.redirect_uri.is_none());
    }

    #[test]
    fn test_success_wire_format() {
        let user: DiscordUser =
            serde_json::from_str(r#"{"id":"1","username":"nelly"}"#).unwrap();
        let json = serde_json::to_value(ExchangeResponse {
            success: true,
            user_info: user,
            access_token: "tok".into(),
            refresh_token: Some("ref".into()),
            expires_in: Some(604_800),
        })
        .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["userInfo"]["username"], "nelly");
        assert_eq!(json["accessToken"], "tok");
        assert_eq!(json["refreshToken"], "ref");
        assert_eq!(json["expiresIn"], 604_800);
    }

    #[test]
    fn test_error_wire_format_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse {
            error: "Missing code or redirectUri",
            details: None,
        })
        .unwrap();
        assert_eq!(json["error"], "Missing code or redirectUri");
        assert!(json.get("details").is_none());
    }
}
