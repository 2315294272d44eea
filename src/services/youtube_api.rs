// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! YouTube Data API v3 client for playlists and playlist items.
//!
//! Handles:
//! - Playlist listing, creation and deletion
//! - Playlist item listing, insertion and removal
//! - Batch duration lookup for videos
//!
//! Listings fetch a single page of up to 50 entries; larger libraries are
//! truncated. Non-2xx responses surface as `AppError::RemoteApi` and are
//! never retried here.

use crate::error::AppError;
use crate::models::{PlaylistSnapshot, PrivacyStatus, VideoSnapshot};
use crate::time_utils::format_iso8601_duration;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size for listings, also the API's cap for `videos?id=` lookups.
pub const MAX_RESULTS: usize = 50;

/// Input for creating a playlist.
#[derive(Debug, Clone, Default)]
pub struct NewPlaylist {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to private
    pub privacy_status: Option<PrivacyStatus>,
}

/// Playlist returned by a successful create call.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPlaylist {
    pub id: String,
    pub title: String,
}

/// Membership created by adding a video to a playlist.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddedPlaylistItem {
    pub playlist_item_id: String,
}

/// Operations against the YouTube Data API, each authenticated with a
/// resolved access token.
#[async_trait]
pub trait YoutubeApi: Send + Sync {
    /// The authenticated user's playlists (first page only).
    async fn list_playlists(&self, access_token: &str) -> Result<Vec<PlaylistSnapshot>, AppError>;

    /// Items of a playlist (first page only). Durations are left empty.
    async fn list_playlist_items(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Vec<VideoSnapshot>, AppError>;

    /// Human-readable durations keyed by video id.
    async fn get_durations(
        &self,
        access_token: &str,
        video_ids: &[String],
    ) -> Result<HashMap<String, String>, AppError>;

    async fn create_playlist(
        &self,
        access_token: &str,
        playlist: &NewPlaylist,
    ) -> Result<CreatedPlaylist, AppError>;

    async fn delete_playlist(&self, access_token: &str, playlist_id: &str) -> Result<(), AppError>;

    async fn add_playlist_item(
        &self,
        access_token: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<AddedPlaylistItem, AppError>;

    async fn remove_playlist_item(
        &self,
        access_token: &str,
        playlist_item_id: &str,
    ) -> Result<(), AppError>;
}

/// YouTube API client.
#[derive(Clone)]
pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: String,
}

impl YoutubeClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Client whose requests fail once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building YouTube HTTP client")?;

        Ok(Self {
            http,
            base_url: YOUTUBE_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root (emulators, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        check_response_json(response).await
    }

    async fn delete(
        &self,
        path: &str,
        access_token: &str,
        id: &str,
    ) -> Result<(), AppError> {
        let response = self
            .http
            .delete(format!("{}/{}", self.base_url, path))
            .bearer_auth(access_token)
            .query(&[("id", id)])
            .send()
            .await
            .map_err(transport_error)?;

        check_response(response).await
    }
}

#[async_trait]
impl YoutubeApi for YoutubeClient {
    async fn list_playlists(&self, access_token: &str) -> Result<Vec<PlaylistSnapshot>, AppError> {
        let max_results = MAX_RESULTS.to_string();
        let page: ListResponse<PlaylistResource> = self
            .get_json(
                "playlists",
                access_token,
                &[
                    ("part", "snippet,contentDetails,status"),
                    ("mine", "true"),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;

        Ok(page
            .items
            .into_iter()
            .map(PlaylistResource::into_snapshot)
            .collect())
    }

    async fn list_playlist_items(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Vec<VideoSnapshot>, AppError> {
        let max_results = MAX_RESULTS.to_string();
        let page: ListResponse<PlaylistItemResource> = self
            .get_json(
                "playlistItems",
                access_token,
                &[
                    ("part", "snippet,contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;

        Ok(playlist_items_to_snapshots(page.items))
    }

    async fn get_durations(
        &self,
        access_token: &str,
        video_ids: &[String],
    ) -> Result<HashMap<String, String>, AppError> {
        let mut durations = HashMap::with_capacity(video_ids.len());

        for chunk in video_ids.chunks(MAX_RESULTS) {
            let ids = chunk.join(",");
            let page: ListResponse<VideoResource> = self
                .get_json(
                    "videos",
                    access_token,
                    &[("part", "contentDetails"), ("id", ids.as_str())],
                )
                .await?;

            durations.extend(page.items.into_iter().map(|video| {
                let raw = video.content_details.and_then(|d| d.duration);
                (video.id, format_iso8601_duration(raw.as_deref()))
            }));
        }

        Ok(durations)
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        playlist: &NewPlaylist,
    ) -> Result<CreatedPlaylist, AppError> {
        let body = serde_json::json!({
            "snippet": {
                "title": playlist.title,
                "description": playlist.description.as_deref().unwrap_or_default(),
            },
            "status": {
                "privacyStatus": playlist.privacy_status.unwrap_or_default().as_str(),
            },
        });

        let response = self
            .http
            .post(format!("{}/playlists", self.base_url))
            .bearer_auth(access_token)
            .query(&[("part", "snippet,status")])
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let created: CreatedPlaylistResource = check_response_json(response).await?;
        Ok(CreatedPlaylist {
            id: created.id,
            title: created.snippet.title,
        })
    }

    async fn delete_playlist(&self, access_token: &str, playlist_id: &str) -> Result<(), AppError> {
        self.delete("playlists", access_token, playlist_id).await
    }

    async fn add_playlist_item(
        &self,
        access_token: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<AddedPlaylistItem, AppError> {
        let body = serde_json::json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video_id,
                },
            },
        });

        let response = self
            .http
            .post(format!("{}/playlistItems", self.base_url))
            .bearer_auth(access_token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let inserted: InsertedResource = check_response_json(response).await?;
        Ok(AddedPlaylistItem {
            playlist_item_id: inserted.id,
        })
    }

    async fn remove_playlist_item(
        &self,
        access_token: &str,
        playlist_item_id: &str,
    ) -> Result<(), AppError> {
        self.delete("playlistItems", access_token, playlist_item_id)
            .await
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("YouTube API request failed: {}", e))
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(remote_error(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(remote_error(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("YouTube JSON parse error: {}", e)))
}

async fn remote_error(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!("YouTube rate limit hit (429)");
    }

    AppError::RemoteApi {
        status: status.as_u16(),
        body,
    }
}

// ─── Wire types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    /// Prefer the largest rendition.
    fn best_url(self) -> Option<String> {
        self.high
            .or(self.medium)
            .or(self.default)
            .map(|thumbnail| thumbnail.url)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
    id: String,
    snippet: PlaylistSnippet,
    content_details: Option<PlaylistContentDetails>,
    status: Option<PlaylistStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    #[serde(default)]
    title: String,
    description: Option<String>,
    thumbnails: Option<Thumbnails>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    item_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistStatus {
    privacy_status: Option<String>,
}

impl PlaylistResource {
    fn into_snapshot(self) -> PlaylistSnapshot {
        PlaylistSnapshot {
            playlist_id: self.id,
            title: self.snippet.title,
            description: self.snippet.description.unwrap_or_default(),
            thumbnail_url: self.snippet.thumbnails.and_then(Thumbnails::best_url),
            video_count: self
                .content_details
                .and_then(|d| d.item_count)
                .unwrap_or(0),
            privacy_status: PrivacyStatus::from_remote(
                self.status
                    .as_ref()
                    .and_then(|s| s.privacy_status.as_deref()),
            ),
            published_at: self.snippet.published_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    id: String,
    snippet: PlaylistItemSnippet,
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    #[serde(default)]
    title: String,
    description: Option<String>,
    thumbnails: Option<Thumbnails>,
    video_owner_channel_title: Option<String>,
    position: Option<u32>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: Option<String>,
}

/// Map playlist items to snapshots, skipping items without a video id
/// (deleted or private videos).
fn playlist_items_to_snapshots(items: Vec<PlaylistItemResource>) -> Vec<VideoSnapshot> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let video_id = item.content_details.and_then(|d| d.video_id)?;
            Some(VideoSnapshot {
                video_id,
                playlist_item_id: Some(item.id),
                title: item.snippet.title,
                description: item.snippet.description.unwrap_or_default(),
                thumbnail_url: item.snippet.thumbnails.and_then(Thumbnails::best_url),
                channel_title: item.snippet.video_owner_channel_title.unwrap_or_default(),
                duration: String::new(),
                position: item.snippet.position.unwrap_or(index as u32),
                published_at: item.snippet.published_at,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylistResource {
    id: String,
    snippet: CreatedPlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylistSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct InsertedResource {
    id: String,
}
