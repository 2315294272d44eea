// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// How long a cached playlist or video row is considered fresh (10 minutes).
pub const CACHE_TTL_MS: i64 = 10 * 60 * 1000;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A cache row is stale once strictly more than the TTL has elapsed.
pub fn is_stale(cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - cached_at > Duration::milliseconds(CACHE_TTL_MS)
}

/// Time part of an ISO 8601 duration. Unanchored: anything after the last
/// whole-number component is ignored.
static ISO8601_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern is valid")
});

/// Convert an ISO 8601 duration (`PT#H#M#S`) into `H:MM:SS`, or `M:SS` when
/// there are no hours.
///
/// Inputs without a `PT` time part or without any numeric component yield an
/// empty string.
pub fn format_iso8601_duration(raw: Option<&str>) -> String {
    parse_iso8601_duration(raw.unwrap_or_default())
        .map(|(hours, minutes, seconds)| {
            if hours > 0 {
                format!("{}:{:02}:{:02}", hours, minutes, seconds)
            } else {
                format!("{}:{:02}", minutes, seconds)
            }
        })
        .unwrap_or_default()
}

fn parse_iso8601_duration(raw: &str) -> Option<(u64, u64, u64)> {
    let caps = ISO8601_TIME.captures(raw)?;
    let parts: Vec<Option<u64>> = (1..=3)
        .map(|i| caps.get(i).and_then(|m| m.as_str().parse().ok()))
        .collect();

    if parts.iter().all(Option::is_none) {
        return None;
    }

    Some((
        parts[0].unwrap_or(0),
        parts[1].unwrap_or(0),
        parts[2].unwrap_or(0),
    ))
}
