//! Authentication error taxonomy and HTTP mappings

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use healthbridge_protocol::api::ApiResponse;

use crate::directory::DirectoryError;
use crate::token::TokenError;

/// Every failure the auth subsystem can surface. Each variant maps 1:1 to
/// an HTTP status at the boundary; none are swallowed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication credential is missing")]
    MissingCredential,
    #[error("token is invalid")]
    InvalidToken,
    #[error("token has expired")]
    Expired,
    #[error("user no longer exists")]
    UserNotFound,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("request is not authenticated")]
    Unauthenticated,
    #[error("insufficient role for this resource")]
    Forbidden,
    #[error("email is already registered")]
    EmailTaken,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::InvalidToken
            | AuthError::Expired
            | AuthError::UserNotFound
            | AuthError::InvalidCredentials
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::Expired,
            TokenError::InvalidSignature | TokenError::Malformed => AuthError::InvalidToken,
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidCredentials => AuthError::InvalidCredentials,
            DirectoryError::EmailTaken => AuthError::EmailTaken,
            DirectoryError::Lookup(msg) => AuthError::Internal(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("auth failure: {self}");
        }
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}
