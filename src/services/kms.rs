// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud KMS encryption for YouTube OAuth tokens at rest.
//!
//! Tokens are encrypted directly with a symmetric KMS key (no envelope
//! encryption). Every ciphertext is bound to its owner through additional
//! authenticated data, so a token copied onto another user document fails
//! to decrypt.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;

/// KMS encryption service.
#[derive(Clone)]
pub struct KmsService {
    /// Full resource path to the KMS key
    /// Format: projects/{project}/locations/{location}/keyRings/{ring}/cryptoKeys/{key}
    key_path: String,

    /// GCP KMS client
    client: Option<Arc<google_cloud_kms::client::Client>>,
}

impl KmsService {
    const KEY_RING_NAME: &str = "tubeflow";

    /// Connect to Cloud KMS.
    pub async fn new(project_id: &str, location: &str, key_name: &str) -> Result<Self, AppError> {
        let key_path = format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}",
            project_id,
            location,
            Self::KEY_RING_NAME,
            key_name
        );

        let config = google_cloud_kms::client::ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create KMS auth config: {}", e))
            })?;

        let client = google_cloud_kms::client::Client::new(config)
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create KMS client: {}", e))
            })?;

        tracing::info!(key = %key_path, "KMS service initialized");

        Ok(Self {
            key_path,
            client: Some(Arc::new(client)),
        })
    }

    /// Offline stand-in for tests and the emulator. Debug builds only.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            key_path: "projects/mock/locations/mock/keyRings/mock/cryptoKeys/mock".to_string(),
            client: None,
        }
    }

    /// Encrypt `plaintext` for `user_id`. Returns base64 ciphertext.
    pub async fn encrypt(&self, plaintext: &str, user_id: &str) -> Result<String, AppError> {
        use google_cloud_googleapis::cloud::kms::v1::EncryptRequest;

        let aad = associated_data(user_id);

        #[cfg(debug_assertions)]
        {
            if self.client.is_none() {
                return Ok(mock::seal(plaintext, &aad));
            }
        }

        let client = self.connected()?;
        let req = EncryptRequest {
            name: self.key_path.clone(),
            plaintext: plaintext.as_bytes().to_vec(),
            additional_authenticated_data: aad,
            ..Default::default()
        };

        let response = client
            .encrypt(req, None)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("KMS encrypt failed: {}", e)))?;

        Ok(BASE64.encode(response.ciphertext))
    }

    /// Decrypt a base64 ciphertext written by [`KmsService::encrypt`] for `user_id`.
    pub async fn decrypt(&self, ciphertext_b64: &str, user_id: &str) -> Result<String, AppError> {
        use google_cloud_googleapis::cloud::kms::v1::DecryptRequest;

        let aad = associated_data(user_id);

        #[cfg(debug_assertions)]
        {
            if self.client.is_none() {
                return mock::open(ciphertext_b64, &aad);
            }
        }

        let client = self.connected()?;
        let ciphertext = BASE64
            .decode(ciphertext_b64)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Base64 decode failed: {}", e)))?;

        let req = DecryptRequest {
            name: self.key_path.clone(),
            ciphertext,
            additional_authenticated_data: aad,
            ..Default::default()
        };

        let response = client
            .decrypt(req, None)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("KMS decrypt failed: {}", e)))?;

        String::from_utf8(response.plaintext)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("UTF-8 decode failed: {}", e)))
    }

    /// Encrypt an optional token; `None` stays `None`.
    pub async fn encrypt_opt(
        &self,
        plaintext: Option<&str>,
        user_id: &str,
    ) -> Result<Option<String>, AppError> {
        match plaintext {
            Some(value) => Ok(Some(self.encrypt(value, user_id).await?)),
            None => Ok(None),
        }
    }

    pub async fn decrypt_opt(
        &self,
        ciphertext_b64: Option<&str>,
        user_id: &str,
    ) -> Result<Option<String>, AppError> {
        match ciphertext_b64 {
            Some(value) => Ok(Some(self.decrypt(value, user_id).await?)),
            None => Ok(None),
        }
    }

    // Release builds refuse to run without a real client.
    fn connected(&self) -> Result<&google_cloud_kms::client::Client, AppError> {
        self.client
            .as_deref()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("KMS client not connected")))
    }
}

fn associated_data(user_id: &str) -> Vec<u8> {
    format!("user_id:{}", user_id).into_bytes()
}

/// Reversible encoding that still checks the associated data.
#[cfg(debug_assertions)]
mod mock {
    use super::BASE64;
    use crate::error::AppError;
    use base64::Engine as _;

    const SEPARATOR: u8 = b'\n';

    pub(super) fn seal(plaintext: &str, aad: &[u8]) -> String {
        let mut sealed = aad.to_vec();
        sealed.push(SEPARATOR);
        sealed.extend_from_slice(plaintext.as_bytes());
        BASE64.encode(sealed)
    }

    pub(super) fn open(ciphertext_b64: &str, aad: &[u8]) -> Result<String, AppError> {
        let bytes = BASE64.decode(ciphertext_b64).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Base64 decode failed (mock): {}", e))
        })?;

        let plaintext = bytes
            .strip_prefix(aad)
            .and_then(|rest| rest.strip_prefix(&[SEPARATOR]))
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("KMS decrypt failed (mock): AAD mismatch"))
            })?;

        String::from_utf8(plaintext.to_vec()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("UTF-8 decode failed (mock): {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_roundtrip_hides_plaintext() {
        let kms = KmsService::new_mock();

        let sealed = kms.encrypt("1//refresh-secret", "user_1").await.unwrap();

        assert!(!sealed.contains("refresh-secret"));
        assert_eq!(
            kms.decrypt(&sealed, "user_1").await.unwrap(),
            "1//refresh-secret"
        );
    }

    #[tokio::test]
    async fn test_ciphertext_bound_to_user() {
        let kms = KmsService::new_mock();

        let sealed = kms.encrypt("ya29.token", "user_1").await.unwrap();

        assert!(kms.decrypt(&sealed, "user_2").await.is_err());
        assert!(kms.decrypt("not base64!", "user_1").await.is_err());
    }

    #[tokio::test]
    async fn test_optional_values_pass_through() {
        let kms = KmsService::new_mock();

        assert_eq!(kms.encrypt_opt(None, "user_1").await.unwrap(), None);
        let sealed = kms.encrypt_opt(Some("t"), "user_1").await.unwrap();
        assert_eq!(
            kms.decrypt_opt(sealed.as_deref(), "user_1").await.unwrap(),
            Some("t".to_string())
        );
    }
}
