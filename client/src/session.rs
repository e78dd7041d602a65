//! Session management for the HealthBridge SDK
//!
//! Holds the current token pair, renews it before or when the server
//! rejects it, and mirrors the session into the optional token store so a
//! restarted process resumes where it left off.

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use tracing::{debug, warn};

use healthbridge_protocol::api::{ApiResponse, LoginRequest, LoginResponse, RefreshTokenRequest};
use healthbridge_protocol::common::SessionUser;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http::BaseClient;
use crate::store::{StoredSession, TokenStore, TokenStoreConfig};

/// Renewal margin: an access token this close to expiry is treated as
/// already stale so requests never race the server-side clock.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn token_is_fresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(expires_at) => expires_at > now + Duration::seconds(EXPIRY_MARGIN_SECS),
        None => false,
    }
}

/// Authentication session
#[derive(Debug)]
pub struct AuthSession {
    base_client: BaseClient,
    user: Option<SessionUser>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    refresh_token_expires_at: Option<DateTime<Utc>>,
    token_store: Option<TokenStore>,
}

impl AuthSession {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_client = BaseClient::new(config.clone())?;

        let token_store = if config.token_storage.enabled {
            let store_config: TokenStoreConfig = config.token_storage.into();
            Some(TokenStore::new(store_config)?)
        } else {
            None
        };

        let mut session = Self {
            base_client,
            user: None,
            access_token: None,
            refresh_token: None,
            token_expires_at: None,
            refresh_token_expires_at: None,
            token_store,
        };

        if session.token_store.is_some() {
            session.load_available_session();
        }

        Ok(session)
    }

    /// Authenticates with email and password and adopts the returned pair.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<SessionUser> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response: ApiResponse<LoginResponse> = self
            .base_client
            .request(Method::POST, "/auth/login", Some(&request))
            .await?;

        let data = response
            .data
            .ok_or_else(|| ClientError::authentication("No data in login response"))?;

        let user = data.user.clone();
        self.adopt_pair(data)?;
        debug!("login succeeded");
        Ok(user)
    }

    /// Exchanges the refresh token for a brand-new pair. A server
    /// rejection clears the stored session so a dead refresh token never
    /// becomes an infinite retry loop; transient transport failures leave
    /// it in place.
    pub async fn renew(&mut self) -> Result<String> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or_else(|| ClientError::session_missing("No refresh token available"))?;

        let request = RefreshTokenRequest {
            refresh_token: Some(refresh_token),
        };

        let result: Result<ApiResponse<LoginResponse>> = self
            .base_client
            .request(Method::POST, "/auth/refresh-token", Some(&request))
            .await;

        let data = match result {
            Ok(response) => response
                .data
                .ok_or_else(|| ClientError::authentication("No data in refresh response"))?,
            Err(err) => {
                warn!("session renewal failed: {err}");
                if err.is_auth_error() {
                    self.clear_session()?;
                }
                return Err(err);
            }
        };

        let access_token = data.access_token.clone();
        self.adopt_pair(data)?;
        debug!("session renewed");
        Ok(access_token)
    }

    /// Returns a usable access token, renewing first when the current one
    /// is at or past its expiry margin.
    pub async fn access_token(&mut self) -> Result<String> {
        let now = Utc::now();

        if token_is_fresh(self.token_expires_at, now) {
            if let Some(token) = &self.access_token {
                return Ok(token.clone());
            }
        }

        if self.refresh_token.is_some() {
            let refresh_alive = self
                .refresh_token_expires_at
                .map(|at| at > now)
                .unwrap_or(false);
            if refresh_alive {
                return self.renew().await;
            }
        }

        Err(ClientError::session_missing(
            "No valid session. Please log in again.",
        ))
    }

    /// Asks the server who the session belongs to (`GET /auth/me`).
    pub async fn fetch_session(&mut self) -> Result<SessionUser> {
        let token = self.access_token().await?;
        let response: ApiResponse<SessionUser> = self
            .base_client
            .request_with_bearer::<(), SessionUser>(Method::GET, "/auth/me", None, &token)
            .await?;
        let user = response
            .data
            .ok_or_else(|| ClientError::invalid_response("No user in session response"))?;
        self.user = Some(user.clone());
        Ok(user)
    }

    /// Ends the session: best-effort server notification, then local and
    /// stored state are cleared regardless of the server's answer.
    pub async fn logout(&mut self) -> Result<()> {
        if let Some(token) = self.access_token.clone() {
            let result: Result<ApiResponse<()>> = self
                .base_client
                .request_with_bearer::<(), ()>(Method::POST, "/auth/logout", None, &token)
                .await;
            if let Err(err) = result {
                warn!("logout request failed: {err}");
            }
        }

        self.clear_session()?;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.user
            .clone()
            .or_else(|| self.token_store.as_ref().and_then(|store| store.get_user()))
    }

    pub fn config(&self) -> &ClientConfig {
        self.base_client.config()
    }

    fn adopt_pair(&mut self, data: LoginResponse) -> Result<()> {
        self.access_token = Some(data.access_token);
        self.refresh_token = Some(data.refresh_token);
        self.token_expires_at = Some(data.expires_at);
        self.refresh_token_expires_at = Some(data.refresh_expires_at);
        self.user = Some(data.user);
        self.store_current_session()
    }

    fn clear_session(&mut self) -> Result<()> {
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
        self.token_expires_at = None;
        self.refresh_token_expires_at = None;
        if let Some(store) = &mut self.token_store {
            store.remove_session()?;
        }
        Ok(())
    }

    fn load_available_session(&mut self) {
        let Some(stored) = self.token_store.as_ref().and_then(|s| s.get_session()) else {
            return;
        };

        // A stored pair whose refresh token has lapsed is useless
        if stored.refresh_token_expires_at > Utc::now() {
            self.user = Some(stored.user);
            self.access_token = Some(stored.access_token);
            self.refresh_token = Some(stored.refresh_token);
            self.token_expires_at = Some(stored.access_token_expires_at);
            self.refresh_token_expires_at = Some(stored.refresh_token_expires_at);
        }
    }

    fn store_current_session(&mut self) -> Result<()> {
        if let Some(store) = &mut self.token_store {
            if let (
                Some(user),
                Some(access_token),
                Some(refresh_token),
                Some(access_expires),
                Some(refresh_expires),
            ) = (
                &self.user,
                &self.access_token,
                &self.refresh_token,
                &self.token_expires_at,
                &self.refresh_token_expires_at,
            ) {
                let stored = StoredSession {
                    user: user.clone(),
                    access_token: access_token.clone(),
                    refresh_token: refresh_token.clone(),
                    access_token_expires_at: *access_expires,
                    refresh_token_expires_at: *refresh_expires,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                };
                store.store_session(stored)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenStorageConfig;
    use crate::tests::utils::test_helpers::{sample_session, temp_store_config};
    use tempfile::tempdir;

    fn config_with_store(dir: &tempfile::TempDir) -> ClientConfig {
        let store = temp_store_config(dir, None);
        ClientConfig {
            token_storage: TokenStorageConfig {
                enabled: true,
                storage_path: Some(
                    store
                        .storage_path
                        .as_ref()
                        .unwrap()
                        .to_string_lossy()
                        .to_string(),
                ),
                encryption_key: None,
            },
            ..ClientConfig::default()
        }
    }

    #[test]
    fn fresh_token_check_honors_margin() {
        let now = Utc::now();
        assert!(token_is_fresh(Some(now + Duration::seconds(300)), now));
        assert!(!token_is_fresh(Some(now + Duration::seconds(30)), now));
        assert!(!token_is_fresh(Some(now - Duration::seconds(10)), now));
        assert!(!token_is_fresh(None, now));
    }

    #[test]
    fn stored_session_is_adopted_on_construction() {
        let dir = tempdir().unwrap();
        let config = config_with_store(&dir);

        {
            let store_config = crate::store::TokenStoreConfig {
                enabled: true,
                storage_path: config
                    .token_storage
                    .storage_path
                    .clone()
                    .map(std::path::PathBuf::from),
                encryption_key: None,
            };
            let mut store = TokenStore::new(store_config).unwrap();
            store.store_session(sample_session()).unwrap();
        }

        let session = AuthSession::new(config).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(
            session.current_user().unwrap().email,
            "pat@example.com"
        );
    }

    #[test]
    fn lapsed_stored_session_is_ignored() {
        let dir = tempdir().unwrap();
        let config = config_with_store(&dir);

        {
            let store_config = crate::store::TokenStoreConfig {
                enabled: true,
                storage_path: config
                    .token_storage
                    .storage_path
                    .clone()
                    .map(std::path::PathBuf::from),
                encryption_key: None,
            };
            let mut store = TokenStore::new(store_config).unwrap();
            let mut stale = sample_session();
            stale.refresh_token_expires_at = Utc::now() - Duration::hours(1);
            store.store_session(stale).unwrap();
        }

        let session = AuthSession::new(config).unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn access_token_without_session_reports_missing() {
        let session_config = ClientConfig::default();
        let mut session = AuthSession::new(session_config).unwrap();
        let err = session.access_token().await.unwrap_err();
        assert!(err.is_auth_error());
    }
}
