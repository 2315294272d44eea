// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! YouTube token lifecycle: storing grants, resolving a usable access token
//! and refreshing it through Google's token endpoint.

use crate::db::YoutubeStore;
use crate::error::AppError;
use crate::models::{ConnectionStatus, UserTokenRecord};
use crate::services::google_oauth::{TokenEndpoint, TokenGrant};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Shared per-user refresh locks.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Whether a token expiring at `expiry` should be refreshed before use.
///
/// A record without an expiry is used as is.
pub fn needs_refresh(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expiry {
        Some(expiry) => expiry <= now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS),
        None => false,
    }
}

/// Owns the per-user YouTube token record.
///
/// Refreshes are serialized per user; a caller that waited on another
/// caller's refresh re-reads the store and reuses its token.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn YoutubeStore>,
    endpoint: Arc<dyn TokenEndpoint>,
    refresh_locks: RefreshLocks,
}

impl TokenService {
    pub fn new(store: Arc<dyn YoutubeStore>, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self {
            store,
            endpoint,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Persist a fresh grant and mark the user connected.
    pub async fn save(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        expires_in_secs: i64,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let record = UserTokenRecord {
            user_id: user_id.to_string(),
            youtube_access_token: Some(access_token.to_string()),
            youtube_refresh_token: Some(refresh_token.to_string()),
            youtube_token_expiry: Some(now + Duration::seconds(expires_in_secs)),
            youtube_connected: true,
            updated_at: now,
        };

        self.store.set_tokens(&record).await?;
        tracing::info!(user_id, expires_in_secs, "YouTube tokens saved");
        Ok(())
    }

    /// Exchange an authorization code and store the resulting tokens.
    ///
    /// Google only returns a refresh token with `prompt=consent`; a grant
    /// without one cannot be kept alive and is rejected.
    pub async fn connect(&self, user_id: &str, code: &str) -> Result<(), AppError> {
        let TokenGrant {
            access_token,
            refresh_token,
            expires_in,
            ..
        } = self.endpoint.exchange_code(code).await?;

        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AppError::NoRefreshToken)?;

        self.save(user_id, &access_token, &refresh_token, expires_in)
            .await
    }

    /// Clear every token field, then drop the user's cached playlists and videos.
    pub async fn clear(&self, user_id: &str) -> Result<(), AppError> {
        self.store
            .set_tokens(&UserTokenRecord::disconnected(user_id, Utc::now()))
            .await?;
        let deleted = self.store.clear_all(user_id).await?;
        tracing::info!(user_id, deleted, "YouTube disconnected");
        Ok(())
    }

    pub async fn status(&self, user_id: &str) -> Result<ConnectionStatus, AppError> {
        let record = self.store.get_tokens(user_id).await?;
        Ok(ConnectionStatus::from(record.as_ref()))
    }

    /// Return an access token that stays valid for at least the refresh margin.
    pub async fn resolve(&self, user_id: &str) -> Result<String, AppError> {
        let record = self.store.get_tokens(user_id).await?;
        let (access_token, expiry) = stored_access_token(record.as_ref())?;
        if !needs_refresh(expiry, Utc::now()) {
            return Ok(access_token);
        }

        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        // Another task may have refreshed while we were waiting.
        let record = self.store.get_tokens(user_id).await?;
        let (access_token, expiry) = stored_access_token(record.as_ref())?;
        if !needs_refresh(expiry, Utc::now()) {
            tracing::debug!(user_id, "Reusing token refreshed by another request");
            return Ok(access_token);
        }

        tracing::info!(user_id, "Access token expiring, refreshing");
        self.refresh_locked(user_id, record.as_ref()).await
    }

    /// Unconditionally refresh the access token.
    pub async fn refresh(&self, user_id: &str) -> Result<String, AppError> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let record = self.store.get_tokens(user_id).await?;
        self.refresh_locked(user_id, record.as_ref()).await
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Caller must hold the user's refresh lock.
    async fn refresh_locked(
        &self,
        user_id: &str,
        record: Option<&UserTokenRecord>,
    ) -> Result<String, AppError> {
        let refresh_token = record
            .and_then(|r| r.youtube_refresh_token.as_deref())
            .filter(|t| !t.is_empty())
            .ok_or(AppError::NoRefreshToken)?;

        let grant = self.endpoint.refresh_access_token(refresh_token).await?;
        let expiry = Utc::now() + Duration::seconds(grant.expires_in);

        self.store
            .update_access_token(user_id, &grant.access_token, expiry)
            .await?;

        tracing::info!(user_id, expires_at = %expiry, "Access token refreshed");
        Ok(grant.access_token)
    }
}

fn stored_access_token(
    record: Option<&UserTokenRecord>,
) -> Result<(String, Option<DateTime<Utc>>), AppError> {
    let record = record.ok_or(AppError::NotConnected)?;
    let access_token = record
        .youtube_access_token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or(AppError::NotConnected)?;
    Ok((access_token, record.youtube_token_expiry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_lookahead_boundary() {
        let now = Utc::now();
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        assert!(needs_refresh(Some(now + margin), now));
        assert!(needs_refresh(Some(now - Duration::seconds(1)), now));
        assert!(needs_refresh(
            Some(now + margin - Duration::milliseconds(1)),
            now
        ));
        assert!(!needs_refresh(
            Some(now + margin + Duration::milliseconds(1)),
            now
        ));
        assert!(!needs_refresh(Some(now + Duration::hours(1)), now));
    }

    #[test]
    fn test_missing_expiry_never_refreshes() {
        assert!(!needs_refresh(None, Utc::now()));
    }

    #[test]
    fn test_stored_access_token_requires_token() {
        let now = Utc::now();
        assert!(matches!(
            stored_access_token(None),
            Err(AppError::NotConnected)
        ));

        let record = UserTokenRecord::disconnected("user_1", now);
        assert!(matches!(
            stored_access_token(Some(&record)),
            Err(AppError::NotConnected)
        ));

        let record = UserTokenRecord {
            youtube_access_token: Some("ya29.a".to_string()),
            youtube_token_expiry: Some(now),
            ..record
        };
        let (token, expiry) = stored_access_token(Some(&record)).unwrap();
        assert_eq!(token, "ya29.a");
        assert_eq!(expiry, Some(now));
    }
}
