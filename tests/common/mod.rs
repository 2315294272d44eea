// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tubeflow::config::Config;
use tubeflow::db::{MemoryDb, TokenStore};
use tubeflow::error::AppError;
use tubeflow::middleware::auth::create_jwt;
use tubeflow::models::{PlaylistSnapshot, PrivacyStatus, UserTokenRecord, VideoSnapshot};
use tubeflow::routes::create_router;
use tubeflow::services::{
    AddedPlaylistItem, CreatedPlaylist, NewPlaylist, TokenEndpoint, TokenGrant, TokenService,
    YoutubeApi, YoutubeService,
};
use tubeflow::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

// ─── Fixtures ────────────────────────────────────────────────

#[allow(dead_code)]
pub fn playlist(id: &str, title: &str) -> PlaylistSnapshot {
    PlaylistSnapshot {
        playlist_id: id.to_string(),
        title: title.to_string(),
        description: format!("{} description", title),
        thumbnail_url: Some(format!("https://i.ytimg.com/{}/hq.jpg", id)),
        video_count: 0,
        privacy_status: PrivacyStatus::Private,
        published_at: Some("2024-01-01T00:00:00Z".to_string()),
    }
}

#[allow(dead_code)]
pub fn video(video_id: &str, position: u32) -> VideoSnapshot {
    VideoSnapshot {
        video_id: video_id.to_string(),
        playlist_item_id: Some(format!("item_{}", video_id)),
        title: format!("Video {}", video_id),
        description: String::new(),
        thumbnail_url: None,
        channel_title: "Test Channel".to_string(),
        duration: String::new(),
        position,
        published_at: None,
    }
}

/// Store a connected token record for `user_id` expiring at `expiry`.
#[allow(dead_code)]
pub async fn seed_tokens(db: &dyn TokenStore, user_id: &str, expiry: DateTime<Utc>) {
    db.set_tokens(&UserTokenRecord {
        user_id: user_id.to_string(),
        youtube_access_token: Some("ya29.stored".to_string()),
        youtube_refresh_token: Some("1//refresh".to_string()),
        youtube_token_expiry: Some(expiry),
        youtube_connected: true,
        updated_at: Utc::now(),
    })
    .await
    .unwrap();
}

/// Store a token record that stays valid for an hour.
#[allow(dead_code)]
pub async fn seed_valid_tokens(db: &dyn TokenStore, user_id: &str) {
    seed_tokens(db, user_id, Utc::now() + Duration::hours(1)).await;
}

// ─── Fake YouTube API ────────────────────────────────────────

/// In-process YouTube fake holding one account's playlists.
#[derive(Default)]
pub struct FakeYoutubeApi {
    pub playlists: Mutex<Vec<PlaylistSnapshot>>,
    pub items: Mutex<HashMap<String, Vec<VideoSnapshot>>>,
    pub durations: Mutex<HashMap<String, String>>,
    pub list_playlists_calls: AtomicUsize,
    pub list_items_calls: AtomicUsize,
    pub duration_calls: AtomicUsize,
    pub tokens_seen: Mutex<Vec<String>>,
    pub fail_durations: AtomicBool,
    /// HTTP status returned by every call when set
    pub fail_status: Mutex<Option<u16>>,
    /// Delay applied to list calls, to widen race windows
    pub list_delay: Mutex<Option<std::time::Duration>>,
    next_id: AtomicUsize,
}

#[allow(dead_code)]
impl FakeYoutubeApi {
    pub fn with_playlists(playlists: Vec<PlaylistSnapshot>) -> Self {
        let api = Self::default();
        *api.playlists.lock().unwrap() = playlists;
        api
    }

    pub fn set_items(&self, playlist_id: &str, items: Vec<VideoSnapshot>) {
        self.items
            .lock()
            .unwrap()
            .insert(playlist_id.to_string(), items);
    }

    pub fn set_playlists(&self, playlists: Vec<PlaylistSnapshot>) {
        *self.playlists.lock().unwrap() = playlists;
    }

    pub fn set_duration(&self, video_id: &str, duration: &str) {
        self.durations
            .lock()
            .unwrap()
            .insert(video_id.to_string(), duration.to_string());
    }

    pub fn set_list_delay(&self, delay: std::time::Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_with(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    pub fn playlist_fetches(&self) -> usize {
        self.list_playlists_calls.load(Ordering::SeqCst)
    }

    pub fn item_fetches(&self) -> usize {
        self.list_items_calls.load(Ordering::SeqCst)
    }

    fn check(&self, access_token: &str) -> Result<(), AppError> {
        self.tokens_seen
            .lock()
            .unwrap()
            .push(access_token.to_string());
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(AppError::RemoteApi {
                status,
                body: format!("fake failure {}", status),
            }),
            None => Ok(()),
        }
    }

    async fn list_delay(&self) {
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl YoutubeApi for FakeYoutubeApi {
    async fn list_playlists(&self, access_token: &str) -> Result<Vec<PlaylistSnapshot>, AppError> {
        self.list_playlists_calls.fetch_add(1, Ordering::SeqCst);
        self.list_delay().await;
        self.check(access_token)?;
        Ok(self.playlists.lock().unwrap().clone())
    }

    async fn list_playlist_items(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Vec<VideoSnapshot>, AppError> {
        self.list_items_calls.fetch_add(1, Ordering::SeqCst);
        self.list_delay().await;
        self.check(access_token)?;
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_durations(
        &self,
        access_token: &str,
        video_ids: &[String],
    ) -> Result<HashMap<String, String>, AppError> {
        self.duration_calls.fetch_add(1, Ordering::SeqCst);
        self.check(access_token)?;
        if self.fail_durations.load(Ordering::SeqCst) {
            return Err(AppError::RemoteApi {
                status: 403,
                body: "quotaExceeded".to_string(),
            });
        }
        let durations = self.durations.lock().unwrap();
        Ok(video_ids
            .iter()
            .filter_map(|id| durations.get(id).map(|d| (id.clone(), d.clone())))
            .collect())
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        new: &NewPlaylist,
    ) -> Result<CreatedPlaylist, AppError> {
        self.check(access_token)?;
        let id = format!("PL_new_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut snapshot = playlist(&id, &new.title);
        snapshot.description = new.description.clone().unwrap_or_default();
        snapshot.privacy_status = new.privacy_status.unwrap_or_default();
        self.playlists.lock().unwrap().push(snapshot);
        Ok(CreatedPlaylist {
            id,
            title: new.title.clone(),
        })
    }

    async fn delete_playlist(&self, access_token: &str, playlist_id: &str) -> Result<(), AppError> {
        self.check(access_token)?;
        let mut playlists = self.playlists.lock().unwrap();
        let before = playlists.len();
        playlists.retain(|p| p.playlist_id != playlist_id);
        if playlists.len() == before {
            return Err(AppError::RemoteApi {
                status: 404,
                body: "playlistNotFound".to_string(),
            });
        }
        self.items.lock().unwrap().remove(playlist_id);
        Ok(())
    }

    async fn add_playlist_item(
        &self,
        access_token: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<AddedPlaylistItem, AppError> {
        self.check(access_token)?;
        let mut items = self.items.lock().unwrap();
        let list = items.entry(playlist_id.to_string()).or_default();
        let mut item = video(video_id, list.len() as u32);
        let playlist_item_id = format!("item_new_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        item.playlist_item_id = Some(playlist_item_id.clone());
        list.push(item);
        Ok(AddedPlaylistItem { playlist_item_id })
    }

    async fn remove_playlist_item(
        &self,
        access_token: &str,
        playlist_item_id: &str,
    ) -> Result<(), AppError> {
        self.check(access_token)?;
        for list in self.items.lock().unwrap().values_mut() {
            list.retain(|v| v.playlist_item_id.as_deref() != Some(playlist_item_id));
        }
        Ok(())
    }
}

// ─── Fake token endpoint ─────────────────────────────────────

/// Google token endpoint fake with call counters.
pub struct FakeTokenEndpoint {
    pub refresh_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    /// Error body returned by refreshes when set
    pub refresh_error: Mutex<Option<String>>,
    pub exchange_fails: AtomicBool,
    pub omit_refresh_token: AtomicBool,
    pub misconfigured: AtomicBool,
    pub refresh_delay: Mutex<Option<std::time::Duration>>,
    pub expires_in: i64,
}

impl Default for FakeTokenEndpoint {
    fn default() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            refresh_error: Mutex::new(None),
            exchange_fails: AtomicBool::new(false),
            omit_refresh_token: AtomicBool::new(false),
            misconfigured: AtomicBool::new(false),
            refresh_delay: Mutex::new(None),
            expires_in: 3599,
        }
    }
}

#[allow(dead_code)]
impl FakeTokenEndpoint {
    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn exchanges(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn reject_refresh(&self, body: &str) {
        *self.refresh_error.lock().unwrap() = Some(body.to_string());
    }

    pub fn set_refresh_delay(&self, delay: std::time::Duration) {
        *self.refresh_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl TokenEndpoint for FakeTokenEndpoint {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if self.misconfigured.load(Ordering::SeqCst) {
            return Err(AppError::MisconfiguredClient("GOOGLE_CLIENT_SECRET"));
        }
        if self.exchange_fails.load(Ordering::SeqCst) {
            return Err(AppError::RemoteApi {
                status: 400,
                body: r#"{"error":"invalid_grant"}"#.to_string(),
            });
        }
        let refresh_token = if self.omit_refresh_token.load(Ordering::SeqCst) {
            None
        } else {
            Some(format!("1//refresh-for-{}", code))
        };
        Ok(TokenGrant {
            access_token: format!("ya29.from-{}", code),
            refresh_token,
            expires_in: self.expires_in,
            scope: Some("https://www.googleapis.com/auth/youtube".to_string()),
        })
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.refresh_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.misconfigured.load(Ordering::SeqCst) {
            return Err(AppError::MisconfiguredClient("GOOGLE_CLIENT_SECRET"));
        }
        if let Some(body) = self.refresh_error.lock().unwrap().clone() {
            return Err(AppError::RefreshFailed(body));
        }
        assert!(!refresh_token.is_empty());
        Ok(TokenGrant {
            access_token: format!("ya29.refreshed-{}", n),
            refresh_token: None,
            expires_in: self.expires_in,
            scope: None,
        })
    }
}

// ─── App wiring ──────────────────────────────────────────────

/// Everything a test needs to drive the app and inspect its collaborators.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub api: Arc<FakeYoutubeApi>,
    pub oauth: Arc<FakeTokenEndpoint>,
}

/// Build the service layer over an in-memory store and the fakes.
#[allow(dead_code)]
pub fn create_service(
    db: &MemoryDb,
    api: Arc<FakeYoutubeApi>,
    oauth: Arc<FakeTokenEndpoint>,
) -> YoutubeService {
    let store = Arc::new(db.clone());
    let tokens = TokenService::new(store.clone(), oauth);
    YoutubeService::new(store, api, tokens)
}

/// Create a test app with in-memory storage and fake Google endpoints.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default(), FakeYoutubeApi::default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config, api: FakeYoutubeApi) -> TestApp {
    let db = MemoryDb::new();
    let api = Arc::new(api);
    let oauth = Arc::new(FakeTokenEndpoint::default());

    let youtube = create_service(&db, api.clone(), oauth.clone());
    let state = Arc::new(AppState { config, youtube });

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        api,
        oauth,
    }
}

/// Session JWT for `user_id`, signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str) -> String {
    create_jwt(user_id, &Config::test_default().session_signing_key).unwrap()
}

/// Send a request through the router, returning status, headers and the
/// JSON body (`Null` when the body is empty or not JSON).
#[allow(dead_code)]
pub async fn call(
    app: &axum::Router,
    method: &str,
    uri: &str,
    session: Option<&str>,
    body: Option<serde_json::Value>,
) -> (
    axum::http::StatusCode,
    axum::http::HeaderMap,
    serde_json::Value,
) {
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = session {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Bearer {}", create_test_jwt(user_id)),
        );
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, headers, json)
}
