// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upsert-then-prune reconciliation of the playlist cache.
//!
//! Every fetch is a full resync: rows present in the fresh snapshot are
//! upserted with a new `cached_at`, and rows missing from it are deleted, so
//! remote deletions and reorders show up without special cases.

use crate::db::YoutubeStore;
use crate::error::AppError;
use crate::models::{CachedPlaylist, CachedVideo, PlaylistSnapshot, VideoSnapshot};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub upserted: usize,
    pub removed: usize,
}

#[derive(Clone)]
pub struct CacheReconciler {
    store: Arc<dyn YoutubeStore>,
}

impl CacheReconciler {
    pub fn new(store: Arc<dyn YoutubeStore>) -> Self {
        Self { store }
    }

    /// Make the user's cached playlists match `snapshot`.
    ///
    /// Cached videos whose playlist is not in `snapshot` are deleted too.
    pub async fn reconcile_playlists(
        &self,
        user_id: &str,
        snapshot: Vec<PlaylistSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, AppError> {
        let rows: Vec<CachedPlaylist> = dedup_playlists(snapshot)
            .into_iter()
            .map(|p| CachedPlaylist::from_snapshot(user_id, p, now))
            .collect();
        let keep: HashSet<String> = rows.iter().map(|r| r.playlist_id.clone()).collect();

        self.store.upsert_playlists(user_id, &rows).await?;
        let removed = self.store.delete_playlists_not_in(user_id, &keep).await?;

        // Also catches rows of playlists that were fetched but never listed.
        let videos = self.store.delete_videos_outside(user_id, &keep).await?;
        if videos > 0 {
            tracing::debug!(user_id, videos, "Pruned videos of uncached playlists");
        }

        let outcome = ReconcileOutcome {
            upserted: rows.len(),
            removed: removed.len(),
        };
        tracing::info!(
            user_id,
            upserted = outcome.upserted,
            removed = outcome.removed,
            "Playlists cache reconciled"
        );
        Ok(outcome)
    }

    /// Make one playlist's cached videos match `snapshot`.
    ///
    /// Positions are renumbered densely in snapshot order.
    pub async fn reconcile_videos(
        &self,
        user_id: &str,
        playlist_id: &str,
        snapshot: Vec<VideoSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, AppError> {
        let rows: Vec<CachedVideo> = renumber(snapshot)
            .into_iter()
            .map(|v| CachedVideo::from_snapshot(user_id, playlist_id, v, now))
            .collect();
        let keep: HashSet<String> = rows.iter().map(|r| r.video_id.clone()).collect();

        self.store
            .upsert_playlist_videos(user_id, playlist_id, &rows)
            .await?;
        let removed = self
            .store
            .delete_videos_not_in(user_id, playlist_id, &keep)
            .await?;

        let outcome = ReconcileOutcome {
            upserted: rows.len(),
            removed,
        };
        tracing::info!(
            user_id,
            playlist_id,
            upserted = outcome.upserted,
            removed = outcome.removed,
            "Videos cache reconciled"
        );
        Ok(outcome)
    }
}

/// One entry per playlist id, keeping the last occurrence in its first slot.
fn dedup_playlists(snapshot: Vec<PlaylistSnapshot>) -> Vec<PlaylistSnapshot> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<PlaylistSnapshot> = Vec::with_capacity(snapshot.len());
    for playlist in snapshot {
        match index.get(&playlist.playlist_id) {
            Some(&i) => unique[i] = playlist,
            None => {
                index.insert(playlist.playlist_id.clone(), unique.len());
                unique.push(playlist);
            }
        }
    }
    unique
}

/// Order by provider position, collapse repeated video ids (a video added
/// twice keeps its first slot) and number the result 0..n.
fn renumber(mut snapshot: Vec<VideoSnapshot>) -> Vec<VideoSnapshot> {
    snapshot.sort_by_key(|v| v.position);

    let mut seen = HashSet::new();
    snapshot.retain(|v| seen.insert(v.video_id.clone()));

    for (position, video) in snapshot.iter_mut().enumerate() {
        video.position = position as u32;
    }
    snapshot
}
