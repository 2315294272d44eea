//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables via secret bindings,
//! so everything is read once at startup.

use std::env;

/// Where the token store and playlist cache live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    /// Process-local maps, for development without the emulator.
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Firestore => "firestore",
            Self::Memory => "memory",
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID. Absence is reported when the OAuth flow is used.
    pub google_client_id: Option<String>,
    /// Deployed app base URL, used for the OAuth redirect URI and result pages
    pub app_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// GCP region (location of the KMS key ring)
    pub gcp_region: String,
    /// KMS key used to encrypt stored YouTube tokens
    pub kms_key_name: String,
    /// Server port
    pub port: u16,
    pub storage_backend: StorageBackend,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: Option<String>,
    /// API key for unauthenticated YouTube metadata lookups. Not used by this
    /// server; loaded so the public-metadata importer shares one config.
    pub youtube_api_key: Option<String>,
    /// Session JWT signing key (raw bytes)
    pub session_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            google_client_id: Some("test_client_id".to_string()),
            app_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-west1".to_string(),
            kms_key_name: "youtube-token-encryption".to_string(),
            port: 8080,
            storage_backend: StorageBackend::Memory,
            google_client_secret: Some("test_secret".to_string()),
            youtube_api_key: None,
            session_signing_key: b"test_session_key_32_bytes_min!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            google_client_id: optional_var("GOOGLE_CLIENT_ID"),
            app_url: env::var("APP_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-west1".to_string()),
            kms_key_name: env::var("KMS_KEY_NAME")
                .unwrap_or_else(|_| "youtube-token-encryption".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            storage_backend: match env::var("STORAGE_BACKEND") {
                Ok(v) => StorageBackend::parse(&v)?,
                Err(_) => StorageBackend::Firestore,
            },

            google_client_secret: optional_var("GOOGLE_CLIENT_SECRET"),
            youtube_api_key: optional_var("YOUTUBE_API_KEY"),
            session_signing_key: env::var("SESSION_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// The fixed OAuth redirect URI registered with Google.
    pub fn redirect_uri(&self) -> String {
        format!("{}/api/auth/youtube/callback", self.app_url)
    }

    /// Cookies get the `Secure` attribute when the app is served over HTTPS.
    pub fn secure_cookies(&self) -> bool {
        self.app_url.starts_with("https://")
    }
}

/// Read a variable, treating empty values as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
