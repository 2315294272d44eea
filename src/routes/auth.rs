// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! YouTube OAuth authorization-code flow.
//!
//! `GET /api/auth/youtube` sets a CSRF state cookie and redirects to Google.
//! The callback checks the state, exchanges the code and stores the tokens
//! for the signed-in user. Every outcome of the callback is a redirect back
//! to the playlists page.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::session_user;
use crate::services::google_oauth::authorization_url;
use crate::AppState;

/// Cookie holding the CSRF state of an authorization attempt.
pub const OAUTH_STATE_COOKIE: &str = "youtube_oauth_state";

const STATE_MAX_AGE_SECS: i64 = 10 * 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/youtube", get(auth_start))
        .route("/api/auth/youtube/callback", get(auth_callback))
}

/// 302 redirect (browsers follow it with a GET, like the OAuth redirects expect).
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// 32 random bytes, base64url without padding.
fn generate_state() -> Result<String> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate OAuth state")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Exact, constant-time comparison of the returned state with the cookie.
fn state_matches(returned: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(stored) => returned.as_bytes().ct_eq(stored.as_bytes()).into(),
        None => false,
    }
}

fn state_cookie(value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Start OAuth flow - redirect to Google's consent screen.
async fn auth_start(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<Response> {
    let client_id = state
        .config
        .google_client_id
        .as_deref()
        .ok_or(AppError::MisconfiguredClient("GOOGLE_CLIENT_ID"))?;

    let oauth_state = generate_state()?;
    let auth_url = authorization_url(client_id, &state.config.redirect_uri(), &oauth_state);

    let jar = jar.add(state_cookie(
        oauth_state,
        STATE_MAX_AGE_SECS,
        state.config.secure_cookies(),
    ));

    tracing::info!("Starting YouTube OAuth flow, redirecting to Google");
    Ok((jar, found(&auth_url)).into_response())
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Why a callback did not connect the account. The message is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallbackFailure {
    Denied,
    MissingParams,
    StateMismatch,
    NotAuthenticated,
    ExchangeFailed,
}

impl CallbackFailure {
    fn message(self) -> &'static str {
        match self {
            Self::Denied => "Google OAuth was denied or failed",
            Self::MissingParams => "Missing authorization code or state",
            Self::StateMismatch => "Invalid state parameter",
            Self::NotAuthenticated => "User not authenticated",
            Self::ExchangeFailed => "Failed to complete YouTube authorization",
        }
    }
}

/// OAuth callback - verify state, exchange code, store tokens.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let app_url = state.config.app_url.trim_end_matches('/').to_string();

    match complete_authorization(&state, &headers, &jar, params).await {
        Ok(user_id) => {
            tracing::info!(user_id, "YouTube connected");
            let jar = jar.remove(state_cookie(
                String::new(),
                0,
                state.config.secure_cookies(),
            ));
            let location = format!("{}/playlists?youtube_connected=true", app_url);
            (jar, found(&location)).into_response()
        }
        Err(failure) => {
            let location = format!(
                "{}/playlists?youtube_error={}",
                app_url,
                urlencoding::encode(failure.message())
            );
            found(&location)
        }
    }
}

/// Steps of the callback in order; the first failing check decides the message.
async fn complete_authorization(
    state: &AppState,
    headers: &HeaderMap,
    jar: &CookieJar,
    params: CallbackParams,
) -> std::result::Result<String, CallbackFailure> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return Err(CallbackFailure::Denied);
    }

    let (code, returned_state) = match (params.code, params.state) {
        (Some(code), Some(returned)) if !code.is_empty() && !returned.is_empty() => {
            (code, returned)
        }
        _ => return Err(CallbackFailure::MissingParams),
    };

    let stored_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value());
    if !state_matches(&returned_state, stored_state) {
        tracing::warn!("OAuth state mismatch, rejecting callback");
        return Err(CallbackFailure::StateMismatch);
    }

    let user = session_user(jar, headers, &state.config.session_signing_key)
        .ok_or(CallbackFailure::NotAuthenticated)?;

    tracing::info!(user_id = %user.user_id, "Exchanging authorization code for tokens");
    if let Err(e) = state.youtube.tokens().connect(&user.user_id, &code).await {
        tracing::error!(user_id = %user.user_id, error = %e, "YouTube authorization failed");
        return Err(CallbackFailure::ExchangeFailed);
    }

    Ok(user.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_state_shape() {
        let a = generate_state().unwrap();
        let b = generate_state().unwrap();

        assert_eq!(a.len(), 43);
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_must_match_exactly() {
        assert!(state_matches("abc123", Some("abc123")));
        assert!(!state_matches("abc123", Some("abc124")));
        assert!(!state_matches("abc123", Some("abc1234")));
        assert!(!state_matches("abc123", None));
    }

    #[test]
    fn test_state_cookie_attributes() {
        let cookie = state_cookie("value".to_string(), STATE_MAX_AGE_SECS, true);

        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(600)));
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            CallbackFailure::StateMismatch.message(),
            "Invalid state parameter"
        );
        assert_eq!(
            CallbackFailure::ExchangeFailed.message(),
            "Failed to complete YouTube authorization"
        );
    }
}
