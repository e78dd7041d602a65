//! Authentication API DTOs
//!
//! This module contains data transfer objects for authentication-related
//! endpoints, including login, registration and token refresh.

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::common::{Claims, LoginResponse, Role, SessionUser};

// ============================================================================
// Login DTOs
// ============================================================================

/// Credentials-based login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

// ============================================================================
// Registration DTOs
// ============================================================================

/// New account registration request
///
/// The role defaults to `patient` when omitted; elevated roles are
/// assigned through the directory, not self-service registration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 2, message = "first name must be at least 2 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, message = "last name must be at least 2 characters"))]
    pub last_name: String,
    pub role: Option<Role>,
}

// ============================================================================
// Token Refresh DTOs
// ============================================================================

/// Refresh access token request
///
/// The token may instead travel in the HTTP-only refresh cookie, in which
/// case the body field is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Refresh token response
pub type RefreshTokenResponse = LoginResponse;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_rejects_bad_email() {
        let req = LoginRequest {
            email: "not-an-email".to_string(),
            password: "secret".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn register_request_enforces_password_length() {
        let req = RegisterRequest {
            email: "pat@example.com".to_string(),
            password: "short".to_string(),
            first_name: "Pat".to_string(),
            last_name: "Smith".to_string(),
            role: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn refresh_request_tolerates_empty_body() {
        let req: RefreshTokenRequest = serde_json::from_str("{}").unwrap();
        assert!(req.refresh_token.is_none());
    }
}
