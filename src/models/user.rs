// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! YouTube connection fields stored on the user document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-user YouTube OAuth tokens.
///
/// Lives on the `users/{user_id}` document next to profile fields owned by the
/// identity sync, so writes only ever touch these fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserTokenRecord {
    /// Identity-provider user id (also used as document ID)
    #[serde(default)]
    pub user_id: String,
    pub youtube_access_token: Option<String>,
    pub youtube_refresh_token: Option<String>,
    /// When the access token expires
    pub youtube_token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub youtube_connected: bool,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl UserTokenRecord {
    /// A record with every token field cleared.
    pub fn disconnected(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            youtube_access_token: None,
            youtube_refresh_token: None,
            youtube_token_expiry: None,
            youtube_connected: false,
            updated_at: now,
        }
    }

    pub fn has_tokens(&self) -> bool {
        self.youtube_access_token.is_some() && self.youtube_refresh_token.is_some()
    }
}

/// Token fields as persisted on the user document.
///
/// Both tokens are KMS ciphertexts (base64); plaintext tokens only exist in
/// memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncryptedUserTokens {
    #[serde(default)]
    pub user_id: String,
    /// Encrypted access token (base64)
    pub youtube_access_token_encrypted: Option<String>,
    /// Encrypted refresh token (base64)
    pub youtube_refresh_token_encrypted: Option<String>,
    pub youtube_token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub youtube_connected: bool,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

/// Connection status exposed to the UI (never includes token values).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub has_tokens: bool,
}

impl From<Option<&UserTokenRecord>> for ConnectionStatus {
    fn from(record: Option<&UserTokenRecord>) -> Self {
        record
            .map(|r| ConnectionStatus {
                connected: r.youtube_connected,
                has_tokens: r.has_tokens(),
            })
            .unwrap_or_default()
    }
}
