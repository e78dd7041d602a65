//! Persisted session storage for the HealthBridge SDK

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use healthbridge_protocol::common::SessionUser;

use crate::error::{ClientError, Result};

/// Stored session information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub user: SessionUser,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Token storage configuration
#[derive(Debug, Clone, Default)]
pub struct TokenStoreConfig {
    pub enabled: bool,
    pub storage_path: Option<PathBuf>,
    pub encryption_key: Option<String>,
}

/// Token storage manager
#[derive(Debug)]
pub struct TokenStore {
    config: TokenStoreConfig,
    session: Option<StoredSession>,
}

impl TokenStore {
    pub fn new(config: TokenStoreConfig) -> Result<Self> {
        let mut store = Self {
            config,
            session: None,
        };

        if store.config.enabled {
            store.load_session()?;
        }

        Ok(store)
    }

    pub fn store_session(&mut self, session: StoredSession) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.session = Some(session);
        self.save_session()?;
        Ok(())
    }

    pub fn get_session(&self) -> Option<StoredSession> {
        if !self.config.enabled {
            return None;
        }
        self.session.clone()
    }

    pub fn has_session(&self) -> bool {
        self.config.enabled && self.session.is_some()
    }

    pub fn remove_session(&mut self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.session = None;
        self.save_session()?;
        Ok(())
    }

    pub fn get_user(&self) -> Option<SessionUser> {
        if !self.config.enabled {
            return None;
        }
        self.session.as_ref().map(|s| s.user.clone())
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.config.storage_path.as_deref()
    }

    fn get_storage_path(&self) -> Result<PathBuf> {
        self.config
            .storage_path
            .clone()
            .ok_or_else(|| ClientError::invalid_input("Token storage path not configured"))
    }

    fn load_session(&mut self) -> Result<()> {
        let path = self.get_storage_path()?;

        if !path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| ClientError::storage_read(format!("{}: {e}", path.display())))?;

        if content.trim().is_empty() {
            return Ok(());
        }

        let decoded_content = if let Some(key) = &self.config.encryption_key {
            self.decrypt_content(&content, key)?
        } else {
            content
        };

        self.session = serde_json::from_str(&decoded_content)
            .map_err(|e| ClientError::storage_decode(e.to_string()))?;

        Ok(())
    }

    fn save_session(&self) -> Result<()> {
        let path = self.get_storage_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ClientError::storage_write(format!("{}: {e}", parent.display())))?;
        }

        let content = serde_json::to_string_pretty(&self.session)
            .map_err(|e| ClientError::serialization(e.to_string()))?;

        let final_content = if let Some(key) = &self.config.encryption_key {
            self.encrypt_content(&content, key)?
        } else {
            content
        };

        fs::write(&path, final_content)
            .map_err(|e| ClientError::storage_write(format!("{}: {e}", path.display())))?;

        Ok(())
    }

    fn encrypt_content(&self, content: &str, key: &str) -> Result<String> {
        let key_bytes = key.as_bytes();
        let content_bytes = content.as_bytes();
        let mut encrypted = Vec::with_capacity(content_bytes.len());

        for (i, &byte) in content_bytes.iter().enumerate() {
            let key_byte = key_bytes[i % key_bytes.len()];
            encrypted.push(byte ^ key_byte);
        }

        Ok(base64::engine::general_purpose::STANDARD.encode(encrypted))
    }

    fn decrypt_content(&self, encrypted_content: &str, key: &str) -> Result<String> {
        let encrypted_bytes = base64::engine::general_purpose::STANDARD
            .decode(encrypted_content.trim())
            .map_err(|e| ClientError::storage_decode(e.to_string()))?;

        let key_bytes = key.as_bytes();
        let mut decrypted = Vec::with_capacity(encrypted_bytes.len());

        for (i, &byte) in encrypted_bytes.iter().enumerate() {
            let key_byte = key_bytes[i % key_bytes.len()];
            decrypted.push(byte ^ key_byte);
        }

        String::from_utf8(decrypted).map_err(|e| ClientError::storage_decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::test_helpers::{sample_session, temp_store_config};
    use tempfile::tempdir;

    #[test]
    fn disabled_store_holds_nothing() {
        let mut store = TokenStore::new(TokenStoreConfig::default()).unwrap();
        store.store_session(sample_session()).unwrap();
        assert!(!store.has_session());
        assert!(store.get_session().is_none());
    }

    #[test]
    fn session_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let config = temp_store_config(&dir, None);

        let mut store = TokenStore::new(config.clone()).unwrap();
        store.store_session(sample_session()).unwrap();

        let reloaded = TokenStore::new(config).unwrap();
        let session = reloaded.get_session().unwrap();
        assert_eq!(session.user.email, "pat@example.com");
        assert_eq!(session.access_token, "access-token");
    }

    #[test]
    fn keyed_store_round_trips_and_obscures_content() {
        let dir = tempdir().unwrap();
        let config = temp_store_config(&dir, Some("storage-key"));

        let mut store = TokenStore::new(config.clone()).unwrap();
        store.store_session(sample_session()).unwrap();

        let raw = fs::read_to_string(config.storage_path.as_ref().unwrap()).unwrap();
        assert!(!raw.contains("access-token"));

        let reloaded = TokenStore::new(config).unwrap();
        assert_eq!(
            reloaded.get_session().unwrap().refresh_token,
            "refresh-token"
        );
    }

    #[test]
    fn wrong_key_fails_to_decode() {
        let dir = tempdir().unwrap();
        let config = temp_store_config(&dir, Some("right-key"));

        let mut store = TokenStore::new(config.clone()).unwrap();
        store.store_session(sample_session()).unwrap();

        let mut wrong = config;
        wrong.encryption_key = Some("wrong-key".to_string());
        assert!(TokenStore::new(wrong).is_err());
    }

    #[test]
    fn remove_clears_disk_state() {
        let dir = tempdir().unwrap();
        let config = temp_store_config(&dir, None);

        let mut store = TokenStore::new(config.clone()).unwrap();
        store.store_session(sample_session()).unwrap();
        store.remove_session().unwrap();

        let reloaded = TokenStore::new(config).unwrap();
        assert!(!reloaded.has_session());
    }
}
