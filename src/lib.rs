// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! TubeFlow: YouTube connection and playlist cache backend
//!
//! This crate provides the API that connects a signed-in user's YouTube
//! account, keeps its OAuth tokens alive and mirrors the user's playlists
//! and playlist videos in a TTL-based cache.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::YoutubeService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub youtube: YoutubeService,
}
