// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Cached YouTube playlists and playlist videos.

use crate::time_utils::{format_utc_rfc3339, is_stale};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Playlist visibility on YouTube.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PrivacyStatus {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl PrivacyStatus {
    /// Map the API's `status.privacyStatus`; anything unknown is treated as private.
    pub fn from_remote(value: Option<&str>) -> Self {
        match value {
            Some("public") => Self::Public,
            Some("unlisted") => Self::Unlisted,
            _ => Self::Private,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Unlisted => "unlisted",
        }
    }
}

// ─── Fresh snapshots from the YouTube API ────────────────────

/// One playlist as returned by a fresh playlist listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSnapshot {
    pub playlist_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_count: u32,
    pub privacy_status: PrivacyStatus,
    pub published_at: Option<String>,
}

/// One playlist membership as returned by a fresh playlist-items listing.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSnapshot {
    pub video_id: String,
    /// Needed later to remove this membership.
    pub playlist_item_id: Option<String>,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub channel_title: String,
    /// Human form (`H:MM:SS` / `M:SS`), empty when unknown
    pub duration: String,
    pub position: u32,
    pub published_at: Option<String>,
}

// ─── Stored cache rows ───────────────────────────────────────

/// Cached playlist row, keyed by user + playlist id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedPlaylist {
    pub user_id: String,
    pub playlist_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_count: u32,
    pub privacy_status: PrivacyStatus,
    pub published_at: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl CachedPlaylist {
    pub fn from_snapshot(user_id: &str, snapshot: PlaylistSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            playlist_id: snapshot.playlist_id,
            title: snapshot.title,
            description: snapshot.description,
            thumbnail_url: snapshot.thumbnail_url,
            video_count: snapshot.video_count,
            privacy_status: snapshot.privacy_status,
            published_at: snapshot.published_at,
            cached_at: now,
        }
    }
}

/// Cached playlist video row, keyed by user + playlist id + video id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedVideo {
    pub user_id: String,
    pub playlist_id: String,
    pub video_id: String,
    pub playlist_item_id: Option<String>,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub channel_title: String,
    pub duration: String,
    pub position: u32,
    pub published_at: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl CachedVideo {
    pub fn from_snapshot(
        user_id: &str,
        playlist_id: &str,
        snapshot: VideoSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            playlist_id: playlist_id.to_string(),
            video_id: snapshot.video_id,
            playlist_item_id: snapshot.playlist_item_id,
            title: snapshot.title,
            description: snapshot.description,
            thumbnail_url: snapshot.thumbnail_url,
            channel_title: snapshot.channel_title,
            duration: snapshot.duration,
            position: snapshot.position,
            published_at: snapshot.published_at,
            cached_at: now,
        }
    }
}

/// Collapse a flat list of video rows to one row per video id.
///
/// The last occurrence wins, but the result keeps the order in which each
/// video id was first seen.
pub fn dedup_by_video_id(rows: Vec<CachedVideo>) -> Vec<CachedVideo> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<CachedVideo> = Vec::with_capacity(rows.len());

    for row in rows {
        match index.get(&row.video_id) {
            Some(&i) => unique[i] = row,
            None => {
                index.insert(row.video_id.clone(), unique.len());
                unique.push(row);
            }
        }
    }

    unique
}

// ─── Views returned to the UI ────────────────────────────────

/// Cached playlist with staleness computed at read time.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlaylistView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_count: u32,
    pub privacy_status: PrivacyStatus,
    pub published_at: Option<String>,
    pub cached_at: String,
    pub is_stale: bool,
}

impl PlaylistView {
    pub fn from_cached(row: CachedPlaylist, now: DateTime<Utc>) -> Self {
        Self {
            is_stale: is_stale(row.cached_at, now),
            cached_at: format_utc_rfc3339(row.cached_at),
            id: row.playlist_id,
            title: row.title,
            description: row.description,
            thumbnail_url: row.thumbnail_url,
            video_count: row.video_count,
            privacy_status: row.privacy_status,
            published_at: row.published_at,
        }
    }
}

/// Cached playlist video with staleness computed at read time.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VideoView {
    pub id: String,
    pub playlist_item_id: Option<String>,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub channel_title: String,
    pub duration: String,
    pub position: u32,
    pub published_at: Option<String>,
    pub cached_at: String,
    pub is_stale: bool,
}

impl VideoView {
    pub fn from_cached(row: CachedVideo, now: DateTime<Utc>) -> Self {
        Self {
            is_stale: is_stale(row.cached_at, now),
            cached_at: format_utc_rfc3339(row.cached_at),
            id: row.video_id,
            playlist_item_id: row.playlist_item_id,
            title: row.title,
            description: row.description,
            thumbnail_url: row.thumbnail_url,
            channel_title: row.channel_title,
            duration: row.duration,
            position: row.position,
            published_at: row.published_at,
        }
    }
}

/// Entry of the flattened "all videos" list.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VideoSummaryView {
    pub id: String,
    pub playlist_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub channel_title: String,
    pub duration: String,
    pub published_at: Option<String>,
    pub cached_at: String,
}

impl From<CachedVideo> for VideoSummaryView {
    fn from(row: CachedVideo) -> Self {
        Self {
            cached_at: format_utc_rfc3339(row.cached_at),
            id: row.video_id,
            playlist_id: row.playlist_id,
            title: row.title,
            description: row.description,
            thumbnail_url: row.thumbnail_url,
            channel_title: row.channel_title,
            duration: row.duration,
            published_at: row.published_at,
        }
    }
}
