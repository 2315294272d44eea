// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request middleware: session authentication and response headers.

pub mod auth;
pub mod security;

pub use auth::{require_auth, session_user, AuthUser};
