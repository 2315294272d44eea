// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage traits for YouTube tokens and the playlist cache.
//!
//! Every operation is scoped to a single user id. Staleness is never stored;
//! it is derived from `cached_at` when rows are read.

use crate::error::AppError;
use crate::models::{CachedPlaylist, CachedVideo, UserTokenRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Persisted per-user YouTube OAuth tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_tokens(&self, user_id: &str) -> Result<Option<UserTokenRecord>, AppError>;

    /// Overwrite every token field of the user (used for grants and disconnects).
    async fn set_tokens(&self, record: &UserTokenRecord) -> Result<(), AppError>;

    /// Replace only the access token and its expiry (after a refresh).
    async fn update_access_token(
        &self,
        user_id: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

/// Persisted per-user mirror of YouTube playlists and playlist videos.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn upsert_playlists(
        &self,
        user_id: &str,
        rows: &[CachedPlaylist],
    ) -> Result<(), AppError>;

    async fn upsert_playlist_videos(
        &self,
        user_id: &str,
        playlist_id: &str,
        rows: &[CachedVideo],
    ) -> Result<(), AppError>;

    /// Cached playlists, ordered by title.
    async fn read_playlists(&self, user_id: &str) -> Result<Vec<CachedPlaylist>, AppError>;

    async fn read_playlist(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Option<CachedPlaylist>, AppError>;

    /// Videos of one playlist, ordered by position.
    async fn read_playlist_videos(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Vec<CachedVideo>, AppError>;

    /// Every cached video of the user, one row per video id (last seen wins).
    async fn read_all_videos(&self, user_id: &str) -> Result<Vec<CachedVideo>, AppError>;

    /// Delete the user's playlists whose id is not in `keep`.
    ///
    /// Returns the ids of the deleted playlists. Their videos are left to the caller.
    async fn delete_playlists_not_in(
        &self,
        user_id: &str,
        keep: &HashSet<String>,
    ) -> Result<Vec<String>, AppError>;

    /// Delete the playlist's videos whose id is not in `keep`. Returns the count.
    async fn delete_videos_not_in(
        &self,
        user_id: &str,
        playlist_id: &str,
        keep: &HashSet<String>,
    ) -> Result<usize, AppError>;

    /// Delete the user's videos whose playlist id is not in `keep_playlists`.
    /// Returns the count.
    async fn delete_videos_outside(
        &self,
        user_id: &str,
        keep_playlists: &HashSet<String>,
    ) -> Result<usize, AppError>;

    /// Drop every cached playlist and video of the user. Returns the count.
    async fn clear_all(&self, user_id: &str) -> Result<usize, AppError>;
}

/// Both stores behind one handle, as shared through `AppState`.
pub trait YoutubeStore: TokenStore + CacheStore {}

impl<T: TokenStore + CacheStore> YoutubeStore for T {}

/// Sort order shared by both backends for playlist listings.
pub(crate) fn sort_playlists(rows: &mut [CachedPlaylist]) {
    rows.sort_by(|a, b| {
        a.title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then_with(|| a.playlist_id.cmp(&b.playlist_id))
    });
}

/// Sort order for flat video listings: by playlist, then position.
pub(crate) fn sort_videos(rows: &mut [CachedVideo]) {
    rows.sort_by(|a, b| {
        a.playlist_id
            .cmp(&b.playlist_id)
            .then(a.position.cmp(&b.position))
            .then_with(|| a.video_id.cmp(&b.video_id))
    });
}
