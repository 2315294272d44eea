// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth 2.0 client for the YouTube connection.
//!
//! Builds the consent URL and talks to Google's token endpoint for the
//! authorization-code exchange and refresh-token grants. Neither call is
//! retried: codes are single-use and a rejected refresh usually means the
//! user revoked access.

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Full read/write access to the user's YouTube account.
pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Token endpoint response for both grant types.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Only present on code exchange (refresh tokens are not rotated)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Google's token endpoint, behind a trait so the token lifecycle can be
/// exercised without network access.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange a single-use authorization code (`grant_type=authorization_code`).
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError>;

    /// Obtain a new access token (`grant_type=refresh_token`).
    ///
    /// Fails with `MisconfiguredClient` when credentials are absent and with
    /// `RefreshFailed` carrying Google's error body on a non-2xx response.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError>;
}

/// Build the consent-screen URL for the authorization-code flow.
///
/// `access_type=offline` plus `prompt=consent` makes Google issue a refresh
/// token even when the user already granted access before.
pub fn authorization_url(client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope={}&\
         access_type=offline&\
         prompt=consent&\
         state={}",
        GOOGLE_AUTH_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(YOUTUBE_SCOPE),
        urlencoding::encode(state)
    )
}

/// reqwest-backed Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_timeout(config, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(config: &Config, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building OAuth HTTP client")?;

        Ok(Self {
            http,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.redirect_uri(),
        })
    }

    /// Point the client at a different token endpoint (emulators, tests).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    fn credentials(&self) -> Result<(&str, &str), AppError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(AppError::MisconfiguredClient("GOOGLE_CLIENT_ID"))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or(AppError::MisconfiguredClient("GOOGLE_CLIENT_SECRET"))?;
        Ok((client_id, client_secret))
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> Result<reqwest::Response, AppError> {
        self.http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Token request failed: {}", e)))
    }
}

#[async_trait]
impl TokenEndpoint for GoogleOAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        let (client_id, client_secret) = self.credentials()?;

        let response = self
            .post_form(&[
                ("code", code),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            return Err(AppError::RemoteApi {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to parse token response: {}", e)))
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        let (client_id, client_secret) = self.credentials()?;

        let response = self
            .post_form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Google token refresh rejected");
            return Err(AppError::RefreshFailed(body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to parse token response: {}", e)))
    }
}
