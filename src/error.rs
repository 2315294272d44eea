// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("YouTube not connected")]
    NotConnected,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Failed to refresh token: {0}")]
    RefreshFailed(String),

    #[error("Google OAuth client misconfigured: {0}")]
    MisconfiguredClient(&'static str),

    #[error("YouTube API error: HTTP {status}: {body}")]
    RemoteApi { status: u16, body: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the user has to go through the OAuth flow again before
    /// YouTube calls can succeed.
    pub fn requires_reauth(&self) -> bool {
        match self {
            AppError::NotConnected | AppError::NoRefreshToken | AppError::RefreshFailed(_) => {
                true
            }
            AppError::RemoteApi { status, .. } => *status == 401,
            _ => false,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    /// The UI should send the user back through the OAuth consent screen.
    reauth_required: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let reauth_required = self.requires_reauth();
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotConnected => (StatusCode::CONFLICT, "youtube_not_connected", None),
            AppError::NoRefreshToken => (StatusCode::CONFLICT, "youtube_reauth_required", None),
            AppError::RefreshFailed(body) => (
                StatusCode::UNAUTHORIZED,
                "youtube_refresh_failed",
                Some(body.clone()),
            ),
            AppError::MisconfiguredClient(what) => {
                tracing::error!(missing = what, "OAuth client misconfigured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "oauth_misconfigured",
                    None,
                )
            }
            AppError::RemoteApi { status, body } => (
                StatusCode::BAD_GATEWAY,
                "youtube_api_error",
                Some(format!("HTTP {}: {}", status, body)),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            reauth_required,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_reauth() {
        assert!(AppError::NotConnected.requires_reauth());
        assert!(AppError::NoRefreshToken.requires_reauth());
        assert!(AppError::RefreshFailed("invalid_grant".to_string()).requires_reauth());
        assert!(AppError::RemoteApi {
            status: 401,
            body: "expired".to_string()
        }
        .requires_reauth());

        assert!(!AppError::RemoteApi {
            status: 403,
            body: "quotaExceeded".to_string()
        }
        .requires_reauth());
        assert!(!AppError::MisconfiguredClient("GOOGLE_CLIENT_SECRET").requires_reauth());
        assert!(!AppError::Unauthorized.requires_reauth());
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::NotConnected, StatusCode::CONFLICT),
            (AppError::NoRefreshToken, StatusCode::CONFLICT),
            (
                AppError::RefreshFailed("revoked".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::MisconfiguredClient("GOOGLE_CLIENT_ID"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::RemoteApi {
                    status: 404,
                    body: "playlistNotFound".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::NotFound("playlist".to_string()),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
