// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! High-level YouTube service: cache queries, fetches and playlist edits.
//!
//! Queries only read the cache. Fetches resolve an access token, call the
//! YouTube API and reconcile the cache. Edits call the API directly and then
//! force a fetch of the affected scope.
//!
//! Fetches for one (user, scope) are serialized. A caller that had to wait
//! reuses a fetch that started after it arrived instead of issuing its own.

use crate::db::YoutubeStore;
use crate::error::AppError;
use crate::models::{
    ConnectionStatus, PlaylistView, VideoSnapshot, VideoSummaryView, VideoView,
};
use crate::services::cache::CacheReconciler;
use crate::services::tokens::TokenService;
use crate::services::youtube_api::{AddedPlaylistItem, CreatedPlaylist, NewPlaylist, YoutubeApi};
use crate::time_utils::{is_stale, CACHE_TTL_MS};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Unit of cache refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyncScope {
    Playlists { user_id: String },
    PlaylistItems { user_id: String, playlist_id: String },
}

/// Start time of the last successful fetch for each scope.
pub type SyncLocks = Arc<DashMap<SyncScope, Arc<Mutex<Option<Instant>>>>>;

#[derive(Debug, Clone, Copy)]
enum Trigger {
    /// Always fetch, unless a fetch started after `arrived` already succeeded.
    Forced { arrived: Instant },
    /// Fetch only if the cached scope is empty or stale.
    IfStale,
}

fn cache_ttl() -> Duration {
    Duration::from_millis(CACHE_TTL_MS as u64)
}

/// Whether a cached scope can be served without a fetch.
///
/// An empty scope is fresh only if a fetch confirmed it empty within the TTL.
pub fn scope_is_fresh(
    cached_at: impl IntoIterator<Item = DateTime<Utc>>,
    last_fetch: Option<Instant>,
    now: DateTime<Utc>,
) -> bool {
    let mut rows = cached_at.into_iter().peekable();
    if rows.peek().is_none() {
        return last_fetch.is_some_and(|started| started.elapsed() <= cache_ttl());
    }
    rows.all(|cached_at| !is_stale(cached_at, now))
}

#[derive(Clone)]
pub struct YoutubeService {
    store: Arc<dyn YoutubeStore>,
    api: Arc<dyn YoutubeApi>,
    tokens: TokenService,
    reconciler: CacheReconciler,
    sync_locks: SyncLocks,
}

impl YoutubeService {
    pub fn new(store: Arc<dyn YoutubeStore>, api: Arc<dyn YoutubeApi>, tokens: TokenService) -> Self {
        Self {
            reconciler: CacheReconciler::new(store.clone()),
            store,
            api,
            tokens,
            sync_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn reconciler(&self) -> &CacheReconciler {
        &self.reconciler
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    pub async fn status(&self, user_id: &str) -> Result<ConnectionStatus, AppError> {
        self.tokens.status(user_id).await
    }

    pub async fn playlists(&self, user_id: &str) -> Result<Vec<PlaylistView>, AppError> {
        let now = Utc::now();
        Ok(self
            .store
            .read_playlists(user_id)
            .await?
            .into_iter()
            .map(|row| PlaylistView::from_cached(row, now))
            .collect())
    }

    pub async fn playlist(&self, user_id: &str, playlist_id: &str) -> Result<PlaylistView, AppError> {
        self.store
            .read_playlist(user_id, playlist_id)
            .await?
            .map(|row| PlaylistView::from_cached(row, Utc::now()))
            .ok_or_else(|| AppError::NotFound(format!("Playlist {}", playlist_id)))
    }

    pub async fn playlist_videos(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Vec<VideoView>, AppError> {
        let now = Utc::now();
        Ok(self
            .store
            .read_playlist_videos(user_id, playlist_id)
            .await?
            .into_iter()
            .map(|row| VideoView::from_cached(row, now))
            .collect())
    }

    pub async fn all_videos(&self, user_id: &str) -> Result<Vec<VideoSummaryView>, AppError> {
        Ok(self
            .store
            .read_all_videos(user_id)
            .await?
            .into_iter()
            .map(VideoSummaryView::from)
            .collect())
    }

    // ─── Fetches ─────────────────────────────────────────────────────────────

    /// Fetch the user's playlists from YouTube and reconcile the cache.
    pub async fn fetch_playlists(&self, user_id: &str) -> Result<Vec<PlaylistView>, AppError> {
        let arrived = Instant::now();
        self.run_playlists_fetch(user_id, Trigger::Forced { arrived })
            .await?;
        self.playlists(user_id).await
    }

    /// Return cached playlists, fetching first if the cache is empty or stale.
    pub async fn sync_playlists(&self, user_id: &str) -> Result<Vec<PlaylistView>, AppError> {
        let cached = self.playlists(user_id).await?;
        if !cached.is_empty() && cached.iter().all(|p| !p.is_stale) {
            return Ok(cached);
        }

        self.run_playlists_fetch(user_id, Trigger::IfStale).await?;
        self.playlists(user_id).await
    }

    /// Fetch one playlist's items from YouTube and reconcile the cache.
    pub async fn fetch_playlist_items(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Vec<VideoView>, AppError> {
        let arrived = Instant::now();
        self.run_items_fetch(user_id, playlist_id, Trigger::Forced { arrived })
            .await?;
        self.playlist_videos(user_id, playlist_id).await
    }

    pub async fn sync_playlist_items(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Vec<VideoView>, AppError> {
        let cached = self.playlist_videos(user_id, playlist_id).await?;
        if !cached.is_empty() && cached.iter().all(|v| !v.is_stale) {
            return Ok(cached);
        }

        self.run_items_fetch(user_id, playlist_id, Trigger::IfStale)
            .await?;
        self.playlist_videos(user_id, playlist_id).await
    }

    fn scope_lock(&self, scope: SyncScope) -> Arc<Mutex<Option<Instant>>> {
        self.sync_locks
            .entry(scope)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    async fn run_playlists_fetch(&self, user_id: &str, trigger: Trigger) -> Result<(), AppError> {
        let lock = self.scope_lock(SyncScope::Playlists {
            user_id: user_id.to_string(),
        });
        let mut last_fetch = lock.lock().await;

        let skip = match trigger {
            Trigger::Forced { arrived } => last_fetch.is_some_and(|started| started >= arrived),
            Trigger::IfStale => {
                let rows = self.store.read_playlists(user_id).await?;
                scope_is_fresh(rows.iter().map(|r| r.cached_at), *last_fetch, Utc::now())
            }
        };
        if skip {
            tracing::debug!(user_id, "Playlists fetched by a concurrent request");
            return Ok(());
        }

        let started = Instant::now();
        let access_token = self.tokens.resolve(user_id).await?;
        let snapshot = self.api.list_playlists(&access_token).await?;
        tracing::info!(user_id, count = snapshot.len(), "Fetched playlists from YouTube");

        self.reconciler
            .reconcile_playlists(user_id, snapshot, Utc::now())
            .await?;
        *last_fetch = Some(started);
        Ok(())
    }

    async fn run_items_fetch(
        &self,
        user_id: &str,
        playlist_id: &str,
        trigger: Trigger,
    ) -> Result<(), AppError> {
        let lock = self.scope_lock(SyncScope::PlaylistItems {
            user_id: user_id.to_string(),
            playlist_id: playlist_id.to_string(),
        });
        let mut last_fetch = lock.lock().await;

        let skip = match trigger {
            Trigger::Forced { arrived } => last_fetch.is_some_and(|started| started >= arrived),
            Trigger::IfStale => {
                let rows = self.store.read_playlist_videos(user_id, playlist_id).await?;
                scope_is_fresh(rows.iter().map(|r| r.cached_at), *last_fetch, Utc::now())
            }
        };
        if skip {
            tracing::debug!(user_id, playlist_id, "Playlist items fetched by a concurrent request");
            return Ok(());
        }

        let started = Instant::now();
        let access_token = self.tokens.resolve(user_id).await?;
        let mut items = self
            .api
            .list_playlist_items(&access_token, playlist_id)
            .await?;
        self.fill_durations(user_id, &access_token, &mut items).await;
        tracing::info!(
            user_id,
            playlist_id,
            count = items.len(),
            "Fetched playlist items from YouTube"
        );

        self.reconciler
            .reconcile_videos(user_id, playlist_id, items, Utc::now())
            .await?;
        *last_fetch = Some(started);
        Ok(())
    }

    /// Look up durations for `items`. Failure leaves durations empty.
    async fn fill_durations(&self, user_id: &str, access_token: &str, items: &mut [VideoSnapshot]) {
        let video_ids: Vec<String> = items.iter().map(|v| v.video_id.clone()).collect();
        if video_ids.is_empty() {
            return;
        }

        match self.api.get_durations(access_token, &video_ids).await {
            Ok(durations) => {
                for item in items.iter_mut() {
                    if let Some(duration) = durations.get(&item.video_id) {
                        item.duration = duration.clone();
                    }
                }
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Duration lookup failed, caching without durations");
            }
        }
    }

    // ─── Edits ───────────────────────────────────────────────────────────────

    pub async fn create_playlist(
        &self,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<CreatedPlaylist, AppError> {
        let access_token = self.tokens.resolve(user_id).await?;
        let created = self.api.create_playlist(&access_token, playlist).await?;
        tracing::info!(user_id, playlist_id = %created.id, "Created playlist");

        self.fetch_playlists(user_id).await?;
        Ok(created)
    }

    pub async fn delete_playlist(&self, user_id: &str, playlist_id: &str) -> Result<(), AppError> {
        let access_token = self.tokens.resolve(user_id).await?;
        self.api.delete_playlist(&access_token, playlist_id).await?;
        tracing::info!(user_id, playlist_id, "Deleted playlist");

        self.fetch_playlists(user_id).await?;
        Ok(())
    }

    pub async fn add_video(
        &self,
        user_id: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<AddedPlaylistItem, AppError> {
        let access_token = self.tokens.resolve(user_id).await?;
        let added = self
            .api
            .add_playlist_item(&access_token, playlist_id, video_id)
            .await?;
        tracing::info!(user_id, playlist_id, video_id, "Added video to playlist");

        self.fetch_playlist_items(user_id, playlist_id).await?;
        Ok(added)
    }

    pub async fn remove_video(
        &self,
        user_id: &str,
        playlist_id: &str,
        playlist_item_id: &str,
    ) -> Result<(), AppError> {
        let access_token = self.tokens.resolve(user_id).await?;
        self.api
            .remove_playlist_item(&access_token, playlist_item_id)
            .await?;
        tracing::info!(user_id, playlist_id, playlist_item_id, "Removed video from playlist");

        self.fetch_playlist_items(user_id, playlist_id).await?;
        Ok(())
    }

    // ─── Connection ──────────────────────────────────────────────────────────

    pub async fn refresh_token(&self, user_id: &str) -> Result<(), AppError> {
        self.tokens.refresh(user_id).await.map(|_| ())
    }

    pub async fn disconnect(&self, user_id: &str) -> Result<(), AppError> {
        self.tokens.clear(user_id).await?;
        self.sync_locks.retain(|scope, _| match scope {
            SyncScope::Playlists { user_id: owner } => owner != user_id,
            SyncScope::PlaylistItems { user_id: owner, .. } => owner != user_id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_scope_freshness() {
        let now = Utc::now();
        let fresh = now - ChronoDuration::minutes(1);
        let stale = now - ChronoDuration::minutes(11);

        assert!(scope_is_fresh([fresh, fresh], None, now));
        assert!(!scope_is_fresh([fresh, stale], None, now));
        assert!(!scope_is_fresh(Vec::<DateTime<Utc>>::new(), None, now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_scope_fresh_only_after_recent_fetch() {
        let now = Utc::now();
        let fetched = Instant::now();

        assert!(scope_is_fresh(Vec::<DateTime<Utc>>::new(), Some(fetched), now));

        tokio::time::advance(cache_ttl() + Duration::from_secs(1)).await;
        assert!(!scope_is_fresh(Vec::<DateTime<Utc>>::new(), Some(fetched), now));
    }
}
