// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TubeFlow API Server
//!
//! Connects users' YouTube accounts and serves their cached playlists and
//! videos.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tubeflow::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryDb, YoutubeStore},
    services::{GoogleOAuthClient, KmsService, TokenService, YoutubeClient, YoutubeService},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting TubeFlow API");

    let store: Arc<dyn YoutubeStore> = match config.storage_backend {
        StorageBackend::Firestore => {
            let kms = KmsService::new(
                &config.gcp_project_id,
                &config.gcp_region,
                &config.kms_key_name,
            )
            .await
            .expect("Failed to initialize KMS service");

            Arc::new(
                FirestoreDb::new(&config.gcp_project_id, kms)
                    .await
                    .expect("Failed to connect to Firestore"),
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    if config.google_client_secret.is_none() {
        tracing::warn!("GOOGLE_CLIENT_SECRET not set; YouTube authorization will fail");
    }

    let tokens = TokenService::new(store.clone(), Arc::new(GoogleOAuthClient::new(&config)?));
    let youtube = YoutubeService::new(store, Arc::new(YoutubeClient::new()?), tokens);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        youtube,
    });

    // Build router
    let app = tubeflow::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tubeflow=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
