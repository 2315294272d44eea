// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST`); they are skipped otherwise.

use chrono::{Duration, Utc};
use std::collections::HashSet;
use tubeflow::db::{CacheStore, FirestoreDb, TokenStore};
use tubeflow::models::{CachedPlaylist, CachedVideo, UserTokenRecord};
use tubeflow::services::KmsService;

mod common;
use common::{playlist, video};

async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project", KmsService::new_mock())
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique user id per test, so runs against a shared emulator don't collide.
fn unique_user_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{}", prefix, nanos)
}

fn ids<'a>(values: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    values.into_iter().map(String::from).collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// TOKEN TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_token_roundtrip_and_refresh_update() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id("tokens");

    assert!(db.get_tokens(&user_id).await.unwrap().is_none());

    let expiry = Utc::now() + Duration::hours(1);
    db.set_tokens(&UserTokenRecord {
        user_id: user_id.clone(),
        youtube_access_token: Some("ya29.first".to_string()),
        youtube_refresh_token: Some("1//refresh".to_string()),
        youtube_token_expiry: Some(expiry),
        youtube_connected: true,
        updated_at: Utc::now(),
    })
    .await
    .unwrap();

    let stored = db.get_tokens(&user_id).await.unwrap().unwrap();
    assert!(stored.youtube_connected);
    assert_eq!(stored.youtube_access_token.as_deref(), Some("ya29.first"));

    let new_expiry = Utc::now() + Duration::hours(2);
    db.update_access_token(&user_id, "ya29.second", new_expiry)
        .await
        .unwrap();

    let updated = db.get_tokens(&user_id).await.unwrap().unwrap();
    assert_eq!(updated.youtube_access_token.as_deref(), Some("ya29.second"));
    assert_eq!(updated.youtube_refresh_token.as_deref(), Some("1//refresh"));
    assert!(updated.youtube_token_expiry.unwrap() > expiry);
}

#[tokio::test]
async fn test_disconnect_clears_token_fields() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id("disconnect");

    common::seed_valid_tokens(&db, &user_id).await;
    db.set_tokens(&UserTokenRecord::disconnected(&user_id, Utc::now()))
        .await
        .unwrap();

    let record = db.get_tokens(&user_id).await.unwrap().unwrap();
    assert!(!record.youtube_connected);
    assert!(!record.has_tokens());
}

// ═══════════════════════════════════════════════════════════════════════════
// CACHE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_playlist_upsert_read_and_prune() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id("playlists");
    let now = Utc::now();

    let rows: Vec<CachedPlaylist> = [playlist("B", "beta"), playlist("A", "Alpha")]
        .into_iter()
        .map(|p| CachedPlaylist::from_snapshot(&user_id, p, now))
        .collect();
    db.upsert_playlists(&user_id, &rows).await.unwrap();

    let titles: Vec<_> = db
        .read_playlists(&user_id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["Alpha", "beta"]);

    let removed = db
        .delete_playlists_not_in(&user_id, &ids(["A"]))
        .await
        .unwrap();
    assert_eq!(removed, vec!["B".to_string()]);
    assert_eq!(
        db.delete_videos_outside(&user_id, &ids(["A"])).await.unwrap(),
        0
    );
    assert!(db.read_playlist(&user_id, "B").await.unwrap().is_none());
    assert!(db.read_playlist(&user_id, "A").await.unwrap().is_some());
}

#[tokio::test]
async fn test_video_upsert_prune_and_clear() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id("videos");
    let now = Utc::now();

    let rows: Vec<CachedVideo> = [video("v2", 1), video("v1", 0), video("v3", 2)]
        .into_iter()
        .map(|v| CachedVideo::from_snapshot(&user_id, "PL", v, now))
        .collect();
    db.upsert_playlist_videos(&user_id, "PL", &rows).await.unwrap();

    let order: Vec<_> = db
        .read_playlist_videos(&user_id, "PL")
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.video_id)
        .collect();
    assert_eq!(order, vec!["v1", "v2", "v3"]);

    let removed = db
        .delete_videos_not_in(&user_id, "PL", &ids(["v1", "v3"]))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(db.read_all_videos(&user_id).await.unwrap().len(), 2);

    db.upsert_playlists(
        &user_id,
        &[CachedPlaylist::from_snapshot(&user_id, playlist("PL", "PL"), now)],
    )
    .await
    .unwrap();
    let cleared = db.clear_all(&user_id).await.unwrap();
    assert_eq!(cleared, 3);
    assert!(db.read_playlists(&user_id).await.unwrap().is_empty());
    assert!(db.read_all_videos(&user_id).await.unwrap().is_empty());
}
