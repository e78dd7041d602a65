//! HTTP client implementations for the HealthBridge SDK

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use healthbridge_protocol::api::ApiResponse;
use healthbridge_protocol::common::SessionUser;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::AuthSession;

/// Decodes a response body into the uniform envelope, mapping auth
/// statuses before anything else is inspected.
fn decode_envelope<R>(status: StatusCode, body: &str) -> Result<ApiResponse<R>>
where
    R: DeserializeOwned,
{
    let parsed = serde_json::from_str::<ApiResponse<R>>(body);

    if status == StatusCode::UNAUTHORIZED {
        let detail = parsed
            .ok()
            .and_then(|r| r.error.or(r.message))
            .unwrap_or_else(|| "Authentication failed".to_string());
        return Err(ClientError::authentication(detail));
    }

    if status == StatusCode::FORBIDDEN {
        let detail = parsed
            .ok()
            .and_then(|r| r.error.or(r.message))
            .unwrap_or_else(|| "Insufficient permissions".to_string());
        return Err(ClientError::authorization(detail));
    }

    match parsed {
        Ok(api_response) => {
            if !api_response.success {
                let error_message = api_response
                    .error
                    .or(api_response.message)
                    .unwrap_or_else(|| "Unknown API error".to_string());
                return Err(ClientError::api(status.as_u16(), error_message));
            }
            Ok(api_response)
        }
        Err(_) => Err(ClientError::api(
            status.as_u16(),
            format!("Invalid API response: {}", body),
        )),
    }
}

/// Base HTTP client for API operations
#[derive(Debug, Clone)]
pub struct BaseClient {
    client: Client,
    config: ClientConfig,
}

impl BaseClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self { client, config })
    }

    /// Sends a request and returns the raw status and body. Bearer
    /// handling and envelope decoding sit above this so the renewal loop
    /// can look at the status first.
    pub async fn send<T>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
        bearer_token: Option<&str>,
    ) -> Result<(StatusCode, String)>
    where
        T: Serialize + ?Sized,
    {
        let url = self.config.endpoint_url(endpoint);

        let mut request_builder = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json");

        if let Some(token) = bearer_token {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
        }

        if let Some(data) = payload {
            request_builder = request_builder.json(data);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, %url, "api response");
        Ok((status, body))
    }

    pub async fn request<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let (status, body) = self.send(method, endpoint, payload, None).await?;
        decode_envelope(status, &body)
    }

    pub async fn request_with_bearer<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
        bearer_token: &str,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let (status, body) = self
            .send(method, endpoint, payload, Some(bearer_token))
            .await?;
        decode_envelope(status, &body)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// The client surface the auth state machine and the CLI depend on.
/// [`HttpClient`] is the real implementation; tests substitute a mock.
#[allow(async_fn_in_trait)]
pub trait ApiClient {
    async fn is_authenticated(&self) -> bool;

    async fn current_user(&self) -> Option<SessionUser>;

    fn config(&self) -> ClientConfig;

    async fn login(&self, email: &str, password: &str) -> Result<SessionUser>;

    async fn logout(&self) -> Result<()>;

    /// Probes the server for the current session (`/auth/me`).
    async fn fetch_session(&self) -> Result<SessionUser>;

    async fn authenticated_request<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize + Sync + ?Sized,
        R: DeserializeOwned;
}

/// HTTP client with authentication support
#[derive(Debug)]
pub struct HttpClient {
    base_client: BaseClient,
    session: Mutex<AuthSession>,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_client = BaseClient::new(config.clone())?;
        let session = AuthSession::new(config)?;
        Ok(Self {
            base_client,
            session: Mutex::new(session),
        })
    }
}

impl ApiClient for HttpClient {
    async fn is_authenticated(&self) -> bool {
        self.session.lock().await.is_authenticated()
    }

    async fn current_user(&self) -> Option<SessionUser> {
        self.session.lock().await.current_user()
    }

    fn config(&self) -> ClientConfig {
        self.base_client.config().clone()
    }

    async fn login(&self, email: &str, password: &str) -> Result<SessionUser> {
        self.session.lock().await.login(email, password).await
    }

    async fn logout(&self) -> Result<()> {
        self.session.lock().await.logout().await
    }

    async fn fetch_session(&self) -> Result<SessionUser> {
        self.session.lock().await.fetch_session().await
    }

    /// Sends an authenticated request. On a 401 response the session is
    /// renewed at most once and the request retried once; a second 401 or
    /// a failed renewal surfaces as an authentication error.
    async fn authenticated_request<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let mut renewed = false;
        loop {
            let token = {
                let mut session = self.session.lock().await;
                session.access_token().await?
            };

            let (status, body) = self
                .base_client
                .send(method.clone(), endpoint, payload, Some(&token))
                .await?;

            if status == StatusCode::UNAUTHORIZED && !renewed {
                renewed = true;
                debug!(%endpoint, "access token rejected, renewing session");
                let mut session = self.session.lock().await;
                // renew() clears stored tokens on failure, so a dead
                // refresh token drops straight to unauthenticated
                session.renew().await?;
                continue;
            }

            return decode_envelope(status, &body);
        }
    }
}
