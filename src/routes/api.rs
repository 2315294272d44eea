// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{ConnectionStatus, PlaylistView, PrivacyStatus, VideoSummaryView, VideoView};
use crate::services::{AddedPlaylistItem, CreatedPlaylist, NewPlaylist};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/youtube/status", get(get_status))
        .route(
            "/api/youtube/playlists",
            get(get_playlists).post(create_playlist),
        )
        .route("/api/youtube/playlists/fetch", post(fetch_playlists))
        .route("/api/youtube/playlists/sync", post(sync_playlists))
        .route(
            "/api/youtube/playlists/{playlist_id}",
            get(get_playlist).delete(delete_playlist),
        )
        .route(
            "/api/youtube/playlists/{playlist_id}/videos",
            get(get_playlist_videos).post(add_video),
        )
        .route(
            "/api/youtube/playlists/{playlist_id}/videos/{playlist_item_id}",
            delete(remove_video),
        )
        .route(
            "/api/youtube/playlists/{playlist_id}/fetch",
            post(fetch_playlist_items),
        )
        .route(
            "/api/youtube/playlists/{playlist_id}/sync",
            post(sync_playlist_items),
        )
        .route("/api/youtube/videos", get(get_all_videos))
        .route("/api/youtube/token/refresh", post(refresh_token))
        .route("/api/youtube/connection", delete(disconnect))
}

// ─── Queries ─────────────────────────────────────────────────

async fn get_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectionStatus>> {
    Ok(Json(state.youtube.status(&user.user_id).await?))
}

async fn get_playlists(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PlaylistView>>> {
    Ok(Json(state.youtube.playlists(&user.user_id).await?))
}

async fn get_playlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> Result<Json<PlaylistView>> {
    Ok(Json(
        state.youtube.playlist(&user.user_id, &playlist_id).await?,
    ))
}

async fn get_playlist_videos(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> Result<Json<Vec<VideoView>>> {
    Ok(Json(
        state
            .youtube
            .playlist_videos(&user.user_id, &playlist_id)
            .await?,
    ))
}

async fn get_all_videos(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<VideoSummaryView>>> {
    Ok(Json(state.youtube.all_videos(&user.user_id).await?))
}

// ─── Fetch / sync ────────────────────────────────────────────

async fn fetch_playlists(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PlaylistView>>> {
    Ok(Json(state.youtube.fetch_playlists(&user.user_id).await?))
}

async fn sync_playlists(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PlaylistView>>> {
    Ok(Json(state.youtube.sync_playlists(&user.user_id).await?))
}

async fn fetch_playlist_items(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> Result<Json<Vec<VideoView>>> {
    Ok(Json(
        state
            .youtube
            .fetch_playlist_items(&user.user_id, &playlist_id)
            .await?,
    ))
}

async fn sync_playlist_items(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> Result<Json<Vec<VideoView>>> {
    Ok(Json(
        state
            .youtube
            .sync_playlist_items(&user.user_id, &playlist_id)
            .await?,
    ))
}

// ─── Playlist edits ──────────────────────────────────────────

/// Request body for creating a playlist.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreatePlaylistRequest {
    #[validate(length(min = 1, max = 150))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub privacy_status: Option<PrivacyStatus>,
}

async fn create_playlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreatePlaylistRequest>,
) -> Result<(StatusCode, Json<CreatedPlaylist>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be blank".to_string()));
    }

    let playlist = NewPlaylist {
        title: body.title,
        description: body.description,
        privacy_status: body.privacy_status,
    };
    let created = state
        .youtube
        .create_playlist(&user.user_id, &playlist)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> Result<StatusCode> {
    state
        .youtube
        .delete_playlist(&user.user_id, &playlist_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for adding a video to a playlist.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AddVideoRequest {
    #[validate(length(min = 1, max = 64))]
    pub video_id: String,
}

async fn add_video(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
    Json(body): Json<AddVideoRequest>,
) -> Result<(StatusCode, Json<AddedPlaylistItem>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let added = state
        .youtube
        .add_video(&user.user_id, &playlist_id, &body.video_id)
        .await?;

    Ok((StatusCode::CREATED, Json(added)))
}

async fn remove_video(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((playlist_id, playlist_item_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    state
        .youtube
        .remove_video(&user.user_id, &playlist_id, &playlist_item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Connection ──────────────────────────────────────────────

/// Response for an explicit token refresh. The token itself stays server-side.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RefreshResponse {
    pub refreshed: bool,
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RefreshResponse>> {
    state.youtube.refresh_token(&user.user_id).await?;
    Ok(Json(RefreshResponse { refreshed: true }))
}

async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.youtube.disconnect(&user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
