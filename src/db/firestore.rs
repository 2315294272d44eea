// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (YouTube token fields only, KMS-encrypted)
//! - Playlist cache (one document per user + playlist)
//! - Video cache (one document per user + playlist + video)

use crate::db::collections;
use crate::db::store::{sort_playlists, sort_videos, CacheStore, TokenStore};
use crate::db::{playlist_doc_id, video_doc_id};
use crate::error::AppError;
use crate::models::{
    dedup_by_video_id, CachedPlaylist, CachedVideo, EncryptedUserTokens, UserTokenRecord,
};
use crate::services::KmsService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
    kms: KmsService,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// Tokens are encrypted with `kms` before they are written.
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, kms: KmsService) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, kms).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client, kms })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str, kms: KmsService) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client, kms })
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Write documents in transactions of at most `BATCH_SIZE` operations.
    async fn batch_upsert<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Sync + Send,
        F: Fn(&T) -> String,
    {
        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction =
                self.client.begin_transaction().await.map_err(|e| {
                    AppError::Database(format!("Failed to begin transaction: {}", e))
                })?;

            for item in chunk {
                let doc_id = id_extractor(item);
                self.client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(&doc_id)
                    .object(item)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add write to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch write: {}", e))
            })?;
        }

        Ok(())
    }

    /// Delete documents in transactions of at most `BATCH_SIZE` operations.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction =
                self.client.begin_transaction().await.map_err(|e| {
                    AppError::Database(format!("Failed to begin transaction: {}", e))
                })?;

            for item in chunk {
                let doc_id = id_extractor(item);
                self.client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    async fn query_user_playlists(&self, user_id: &str) -> Result<Vec<CachedPlaylist>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::YOUTUBE_PLAYLISTS_CACHE)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn query_user_videos(
        &self,
        user_id: &str,
        playlist_id: Option<&str>,
    ) -> Result<Vec<CachedVideo>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::YOUTUBE_VIDEOS_CACHE)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    playlist_id.and_then(|id| q.field("playlist_id").eq(id)),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

// ─── Token Operations ────────────────────────────────────────

#[async_trait]
impl TokenStore for FirestoreDb {
    async fn get_tokens(&self, user_id: &str) -> Result<Option<UserTokenRecord>, AppError> {
        let stored: Option<EncryptedUserTokens> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match stored {
            Some(stored) => Ok(Some(open_tokens(&self.kms, user_id, stored).await?)),
            None => Ok(None),
        }
    }

    async fn set_tokens(&self, record: &UserTokenRecord) -> Result<(), AppError> {
        let stored = seal_tokens(&self.kms, record).await?;

        let _: EncryptedUserTokens = self
            .client
            .fluent()
            .update()
            .fields(paths!(EncryptedUserTokens::{
                user_id,
                youtube_access_token_encrypted,
                youtube_refresh_token_encrypted,
                youtube_token_expiry,
                youtube_connected,
                updated_at
            }))
            .in_col(collections::USERS)
            .document_id(&record.user_id)
            .object(&stored)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_access_token(
        &self,
        user_id: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let patch = EncryptedUserTokens {
            user_id: user_id.to_string(),
            youtube_access_token_encrypted: Some(self.kms.encrypt(access_token, user_id).await?),
            youtube_refresh_token_encrypted: None,
            youtube_token_expiry: Some(expiry),
            youtube_connected: false,
            updated_at: Utc::now(),
        };

        let _: EncryptedUserTokens = self
            .client
            .fluent()
            .update()
            .fields(paths!(EncryptedUserTokens::{
                youtube_access_token_encrypted,
                youtube_token_expiry,
                updated_at
            }))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Encrypt the token fields of `record` for storage.
async fn seal_tokens(
    kms: &KmsService,
    record: &UserTokenRecord,
) -> Result<EncryptedUserTokens, AppError> {
    let user_id = record.user_id.as_str();
    Ok(EncryptedUserTokens {
        user_id: user_id.to_string(),
        youtube_access_token_encrypted: kms
            .encrypt_opt(record.youtube_access_token.as_deref(), user_id)
            .await?,
        youtube_refresh_token_encrypted: kms
            .encrypt_opt(record.youtube_refresh_token.as_deref(), user_id)
            .await?,
        youtube_token_expiry: record.youtube_token_expiry,
        youtube_connected: record.youtube_connected,
        updated_at: record.updated_at,
    })
}

async fn open_tokens(
    kms: &KmsService,
    user_id: &str,
    stored: EncryptedUserTokens,
) -> Result<UserTokenRecord, AppError> {
    // Profile-only documents written by the identity sync have no user_id field.
    Ok(UserTokenRecord {
        user_id: user_id.to_string(),
        youtube_access_token: kms
            .decrypt_opt(stored.youtube_access_token_encrypted.as_deref(), user_id)
            .await?,
        youtube_refresh_token: kms
            .decrypt_opt(stored.youtube_refresh_token_encrypted.as_deref(), user_id)
            .await?,
        youtube_token_expiry: stored.youtube_token_expiry,
        youtube_connected: stored.youtube_connected,
        updated_at: stored.updated_at,
    })
}

// ─── Cache Operations ────────────────────────────────────────

#[async_trait]
impl CacheStore for FirestoreDb {
    async fn upsert_playlists(
        &self,
        user_id: &str,
        rows: &[CachedPlaylist],
    ) -> Result<(), AppError> {
        self.batch_upsert(rows, collections::YOUTUBE_PLAYLISTS_CACHE, |row| {
            playlist_doc_id(user_id, &row.playlist_id)
        })
        .await
    }

    async fn upsert_playlist_videos(
        &self,
        user_id: &str,
        playlist_id: &str,
        rows: &[CachedVideo],
    ) -> Result<(), AppError> {
        self.batch_upsert(rows, collections::YOUTUBE_VIDEOS_CACHE, |row| {
            video_doc_id(user_id, playlist_id, &row.video_id)
        })
        .await
    }

    async fn read_playlists(&self, user_id: &str) -> Result<Vec<CachedPlaylist>, AppError> {
        let mut rows = self.query_user_playlists(user_id).await?;
        sort_playlists(&mut rows);
        Ok(rows)
    }

    async fn read_playlist(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Option<CachedPlaylist>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::YOUTUBE_PLAYLISTS_CACHE)
            .obj()
            .one(&playlist_doc_id(user_id, playlist_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn read_playlist_videos(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Vec<CachedVideo>, AppError> {
        let mut rows = self.query_user_videos(user_id, Some(playlist_id)).await?;
        sort_videos(&mut rows);
        Ok(rows)
    }

    async fn read_all_videos(&self, user_id: &str) -> Result<Vec<CachedVideo>, AppError> {
        let mut rows = self.query_user_videos(user_id, None).await?;
        sort_videos(&mut rows);
        Ok(dedup_by_video_id(rows))
    }

    async fn delete_playlists_not_in(
        &self,
        user_id: &str,
        keep: &HashSet<String>,
    ) -> Result<Vec<String>, AppError> {
        let doomed: Vec<CachedPlaylist> = self
            .query_user_playlists(user_id)
            .await?
            .into_iter()
            .filter(|row| !keep.contains(&row.playlist_id))
            .collect();

        self.batch_delete(&doomed, collections::YOUTUBE_PLAYLISTS_CACHE, |row| {
            playlist_doc_id(user_id, &row.playlist_id)
        })
        .await?;

        let mut removed: Vec<String> = doomed.into_iter().map(|row| row.playlist_id).collect();
        removed.sort();
        Ok(removed)
    }

    async fn delete_videos_not_in(
        &self,
        user_id: &str,
        playlist_id: &str,
        keep: &HashSet<String>,
    ) -> Result<usize, AppError> {
        let doomed: Vec<CachedVideo> = self
            .query_user_videos(user_id, Some(playlist_id))
            .await?
            .into_iter()
            .filter(|row| !keep.contains(&row.video_id))
            .collect();

        self.batch_delete(&doomed, collections::YOUTUBE_VIDEOS_CACHE, |row| {
            video_doc_id(user_id, playlist_id, &row.video_id)
        })
        .await?;

        Ok(doomed.len())
    }

    async fn delete_videos_outside(
        &self,
        user_id: &str,
        keep_playlists: &HashSet<String>,
    ) -> Result<usize, AppError> {
        let doomed: Vec<CachedVideo> = self
            .query_user_videos(user_id, None)
            .await?
            .into_iter()
            .filter(|row| !keep_playlists.contains(&row.playlist_id))
            .collect();

        self.batch_delete(&doomed, collections::YOUTUBE_VIDEOS_CACHE, |row| {
            video_doc_id(user_id, &row.playlist_id, &row.video_id)
        })
        .await?;

        Ok(doomed.len())
    }

    async fn clear_all(&self, user_id: &str) -> Result<usize, AppError> {
        let videos = self.query_user_videos(user_id, None).await?;
        self.batch_delete(&videos, collections::YOUTUBE_VIDEOS_CACHE, |row| {
            video_doc_id(user_id, &row.playlist_id, &row.video_id)
        })
        .await?;
        tracing::debug!(user_id, count = videos.len(), "Deleted cached videos");

        let playlists = self.query_user_playlists(user_id).await?;
        self.batch_delete(&playlists, collections::YOUTUBE_PLAYLISTS_CACHE, |row| {
            playlist_doc_id(user_id, &row.playlist_id)
        })
        .await?;
        tracing::debug!(user_id, count = playlists.len(), "Deleted cached playlists");

        Ok(videos.len() + playlists.len())
    }
}
