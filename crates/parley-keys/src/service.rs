// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key registration, rotation, revocation, and resolution.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, info};

use parley_core::{ParleyError, Provider};
use parley_storage::Database;
use parley_storage::queries::provider_keys;
use parley_vault::KeyVault;

use crate::cache::KeyCache;

/// The single mutation path for provider keys.
///
/// Every write goes ciphertext-first into the database; the cache is
/// invalidated eagerly on every mutation so a rotated key can never be
/// served stale for longer than one in-flight request.
#[derive(Clone)]
pub struct KeyService {
    db: Database,
    vault: Arc<KeyVault>,
    cache: Arc<KeyCache>,
}

impl KeyService {
    pub fn new(db: Database, vault: Arc<KeyVault>, cache: Arc<KeyCache>) -> Self {
        Self { db, vault, cache }
    }

    /// Encrypt and store (or rotate) a user's key for a provider.
    pub async fn store_key(
        &self,
        user_id: &str,
        provider: Provider,
        api_key: SecretString,
    ) -> Result<(), ParleyError> {
        let ciphertext = self.vault.encrypt(&api_key)?;
        provider_keys::upsert_key(&self.db, user_id, &provider.to_string(), &ciphertext).await?;
        self.cache.invalidate(user_id, Some(provider));
        info!(user_id = %user_id, provider = %provider, "provider key stored");
        Ok(())
    }

    /// Revoke a user's key for a provider. Returns false when no key was
    /// stored in the first place.
    pub async fn delete_key(&self, user_id: &str, provider: Provider) -> Result<bool, ParleyError> {
        let removed = provider_keys::delete_key(&self.db, user_id, &provider.to_string()).await?;
        self.cache.invalidate(user_id, Some(provider));
        if removed {
            info!(user_id = %user_id, provider = %provider, "provider key deleted");
        }
        Ok(removed)
    }

    /// Provider names with a stored key. Never returns key material.
    pub async fn list_providers(&self, user_id: &str) -> Result<Vec<String>, ParleyError> {
        provider_keys::list_key_providers(&self.db, user_id).await
    }

    /// Resolve the plaintext key for a chat request: cache, then database
    /// row plus vault decrypt, caching the result on the way out.
    pub async fn resolve_key(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<SecretString, ParleyError> {
        if let Some(key) = self.cache.get(user_id, provider) {
            debug!(user_id = %user_id, provider = %provider, "key cache hit");
            return Ok(key);
        }

        let record = provider_keys::get_key(&self.db, user_id, &provider.to_string())
            .await?
            .ok_or_else(|| {
                ParleyError::Credential(format!("no API key stored for provider {provider}"))
            })?;

        let key = self.vault.decrypt(&record.ciphertext)?;
        self.cache.set(user_id, provider, key.clone());
        debug!(user_id = %user_id, provider = %provider, "key resolved from vault");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn setup() -> (KeyService, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let vault = Arc::new(KeyVault::new(&SecretString::from("test secret")).unwrap());
        let cache = Arc::new(KeyCache::new(Duration::from_secs(300)));
        (KeyService::new(db, vault, cache), dir)
    }

    #[tokio::test]
    async fn store_then_resolve_roundtrips_plaintext() {
        let (svc, _dir) = setup().await;

        svc.store_key("u1", Provider::Openai, SecretString::from("sk-live-1"))
            .await
            .unwrap();

        let key = svc.resolve_key("u1", Provider::Openai).await.unwrap();
        assert_eq!(key.expose_secret(), "sk-live-1");
    }

    #[tokio::test]
    async fn resolve_missing_key_is_a_credential_error() {
        let (svc, _dir) = setup().await;

        let err = svc.resolve_key("u1", Provider::Claude).await.unwrap_err();
        assert!(matches!(err, ParleyError::Credential(_)));
    }

    #[tokio::test]
    async fn rotation_invalidates_the_cached_key() {
        let (svc, _dir) = setup().await;

        svc.store_key("u1", Provider::Openai, SecretString::from("sk-old"))
            .await
            .unwrap();
        // Populate the cache.
        svc.resolve_key("u1", Provider::Openai).await.unwrap();

        svc.store_key("u1", Provider::Openai, SecretString::from("sk-new"))
            .await
            .unwrap();

        let key = svc.resolve_key("u1", Provider::Openai).await.unwrap();
        assert_eq!(key.expose_secret(), "sk-new");
    }

    #[tokio::test]
    async fn delete_revokes_even_when_cached() {
        let (svc, _dir) = setup().await;

        svc.store_key("u1", Provider::Groq, SecretString::from("sk-g"))
            .await
            .unwrap();
        svc.resolve_key("u1", Provider::Groq).await.unwrap();

        assert!(svc.delete_key("u1", Provider::Groq).await.unwrap());
        assert!(svc.resolve_key("u1", Provider::Groq).await.is_err());
        assert!(!svc.delete_key("u1", Provider::Groq).await.unwrap());
    }

    #[tokio::test]
    async fn list_names_only_no_material() {
        let (svc, _dir) = setup().await;

        svc.store_key("u1", Provider::Openai, SecretString::from("sk-1"))
            .await
            .unwrap();
        svc.store_key("u1", Provider::Gemini, SecretString::from("sk-2"))
            .await
            .unwrap();

        let names = svc.list_providers("u1").await.unwrap();
        assert_eq!(names, vec!["gemini", "openai"]);
    }
}
