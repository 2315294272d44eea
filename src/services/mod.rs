// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cache;
pub mod google_oauth;
pub mod kms;
pub mod tokens;
pub mod youtube;
pub mod youtube_api;

pub use cache::{CacheReconciler, ReconcileOutcome};
pub use google_oauth::{GoogleOAuthClient, TokenEndpoint, TokenGrant};
pub use kms::KmsService;
pub use tokens::{needs_refresh, TokenService};
pub use youtube::{SyncScope, YoutubeService};
pub use youtube_api::{
    AddedPlaylistItem, CreatedPlaylist, NewPlaylist, YoutubeApi, YoutubeClient,
};
