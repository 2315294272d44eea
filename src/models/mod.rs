// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod user;
pub mod youtube;

pub use user::{ConnectionStatus, EncryptedUserTokens, UserTokenRecord};
pub use youtube::{
    dedup_by_video_id, CachedPlaylist, CachedVideo, PlaylistSnapshot, PlaylistView,
    PrivacyStatus, VideoSnapshot, VideoSummaryView, VideoView,
};
