// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.
//!
//! Mirrors the Firestore layout with one map per collection. Data lives only
//! as long as the process.

use crate::db::store::{sort_playlists, sort_videos, CacheStore, TokenStore};
use crate::error::AppError;
use crate::models::{dedup_by_video_id, CachedPlaylist, CachedVideo, UserTokenRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

type PlaylistKey = (String, String);
type VideoKey = (String, String, String);

#[derive(Default)]
struct Collections {
    users: DashMap<String, UserTokenRecord>,
    playlists: DashMap<PlaylistKey, CachedPlaylist>,
    videos: DashMap<VideoKey, CachedVideo>,
}

/// Process-local store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Collections>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryDb {
    async fn get_tokens(&self, user_id: &str) -> Result<Option<UserTokenRecord>, AppError> {
        Ok(self.inner.users.get(user_id).map(|r| r.clone()))
    }

    async fn set_tokens(&self, record: &UserTokenRecord) -> Result<(), AppError> {
        self.inner
            .users
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    async fn update_access_token(
        &self,
        user_id: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), AppError> {
        // Same semantics as a masked Firestore update: creates the document if needed.
        let now = Utc::now();
        let mut entry = self
            .inner
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserTokenRecord::disconnected(user_id, now));
        entry.youtube_access_token = Some(access_token.to_string());
        entry.youtube_token_expiry = Some(expiry);
        entry.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryDb {
    async fn upsert_playlists(
        &self,
        user_id: &str,
        rows: &[CachedPlaylist],
    ) -> Result<(), AppError> {
        for row in rows {
            self.inner.playlists.insert(
                (user_id.to_string(), row.playlist_id.clone()),
                CachedPlaylist {
                    user_id: user_id.to_string(),
                    ..row.clone()
                },
            );
        }
        Ok(())
    }

    async fn upsert_playlist_videos(
        &self,
        user_id: &str,
        playlist_id: &str,
        rows: &[CachedVideo],
    ) -> Result<(), AppError> {
        for row in rows {
            self.inner.videos.insert(
                (
                    user_id.to_string(),
                    playlist_id.to_string(),
                    row.video_id.clone(),
                ),
                CachedVideo {
                    user_id: user_id.to_string(),
                    playlist_id: playlist_id.to_string(),
                    ..row.clone()
                },
            );
        }
        Ok(())
    }

    async fn read_playlists(&self, user_id: &str) -> Result<Vec<CachedPlaylist>, AppError> {
        let mut rows: Vec<CachedPlaylist> = self
            .inner
            .playlists
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect();
        sort_playlists(&mut rows);
        Ok(rows)
    }

    async fn read_playlist(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Option<CachedPlaylist>, AppError> {
        Ok(self
            .inner
            .playlists
            .get(&(user_id.to_string(), playlist_id.to_string()))
            .map(|r| r.clone()))
    }

    async fn read_playlist_videos(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Vec<CachedVideo>, AppError> {
        let mut rows: Vec<CachedVideo> = self
            .inner
            .videos
            .iter()
            .filter(|e| e.key().0 == user_id && e.key().1 == playlist_id)
            .map(|e| e.value().clone())
            .collect();
        sort_videos(&mut rows);
        Ok(rows)
    }

    async fn read_all_videos(&self, user_id: &str) -> Result<Vec<CachedVideo>, AppError> {
        let mut rows: Vec<CachedVideo> = self
            .inner
            .videos
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect();
        sort_videos(&mut rows);
        Ok(dedup_by_video_id(rows))
    }

    async fn delete_playlists_not_in(
        &self,
        user_id: &str,
        keep: &HashSet<String>,
    ) -> Result<Vec<String>, AppError> {
        let mut removed = Vec::new();
        self.inner.playlists.retain(|(owner, playlist_id), _| {
            let drop = owner == user_id && !keep.contains(playlist_id);
            if drop {
                removed.push(playlist_id.clone());
            }
            !drop
        });
        removed.sort();
        Ok(removed)
    }

    async fn delete_videos_not_in(
        &self,
        user_id: &str,
        playlist_id: &str,
        keep: &HashSet<String>,
    ) -> Result<usize, AppError> {
        let mut deleted = 0;
        self.inner.videos.retain(|(owner, playlist, video_id), _| {
            let drop = owner == user_id && playlist == playlist_id && !keep.contains(video_id);
            if drop {
                deleted += 1;
            }
            !drop
        });
        Ok(deleted)
    }

    async fn delete_videos_outside(
        &self,
        user_id: &str,
        keep_playlists: &HashSet<String>,
    ) -> Result<usize, AppError> {
        let mut deleted = 0;
        self.inner.videos.retain(|(owner, playlist, _), _| {
            let drop = owner == user_id && !keep_playlists.contains(playlist);
            deleted += usize::from(drop);
            !drop
        });
        Ok(deleted)
    }

    async fn clear_all(&self, user_id: &str) -> Result<usize, AppError> {
        let mut deleted = 0;
        self.inner.playlists.retain(|(owner, _), _| {
            let drop = owner == user_id;
            deleted += usize::from(drop);
            !drop
        });
        self.inner.videos.retain(|(owner, _, _), _| {
            let drop = owner == user_id;
            deleted += usize::from(drop);
            !drop
        });
        Ok(deleted)
    }
}
