//! Request authentication and role authorization gates
//!
//! `authenticate` runs once per protected request: it verifies the bearer
//! access token, re-resolves the subject against the directory and
//! attaches a typed [`AuthenticatedUser`] to the request extensions.
//! `authorize` composes after it and compares the attached role against a
//! route's allow-list, failing closed when no identity is present.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use healthbridge_protocol::common::Role;

use crate::error::AuthError;
use crate::state::AppState;

/// Identity attached to a request after successful authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The authenticator's core: header extraction, token verification and
/// subject re-resolution. Deleted accounts with still-valid tokens stop
/// here with `UserNotFound`.
pub async fn resolve_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingCredential)?;
    let claims = state.issuer.verify_access(token)?;
    let user = state
        .directory
        .find_by_id(&claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    Ok(AuthenticatedUser {
        id: user.id,
        email: user.email,
        role: user.role,
    })
}

/// Middleware wrapper around [`resolve_identity`]; attaches the identity
/// for downstream handlers and authorizers.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = resolve_identity(&state, req.headers()).await?;
    debug!(user_id = %identity.id, role = %identity.role, "request authenticated");
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Pure role check. An empty allow-list admits any authenticated
/// identity; a missing identity is `Unauthenticated`, never `Forbidden`.
pub fn check_role(
    identity: Option<&AuthenticatedUser>,
    allowed: &[Role],
) -> Result<(), AuthError> {
    let identity = identity.ok_or(AuthError::Unauthenticated)?;
    if allowed.is_empty() || allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Role gate middleware, composed after [`authenticate`]:
///
/// ```ignore
/// .route_layer(middleware::from_fn(|req, next| {
///     authorize(&[Role::Admin], req, next)
/// }))
/// ```
pub async fn authorize(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    check_role(req.extensions().get::<AuthenticatedUser>(), allowed)?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::directory::{MemoryDirectory, NewUser, UserDirectory};
    use crate::revocation::NoRevocation;
    use axum::http::HeaderValue;
    use std::sync::Arc;

    fn test_config() -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            access_secret: "access-secret".to_string(),
            refresh_secret: "refresh-secret".to_string(),
            access_ttl_secs: 60,
            refresh_ttl_secs: 120,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }

    async fn state_with_user() -> (AppState, Arc<MemoryDirectory>, String) {
        let directory = Arc::new(MemoryDirectory::new());
        let user = directory
            .create(NewUser {
                email: "nina@example.com".to_string(),
                password: "hunter22".to_string(),
                first_name: "Nina".to_string(),
                last_name: "Okoye".to_string(),
                role: Role::Nurse,
            })
            .await
            .unwrap();
        let state = AppState::new(&test_config(), directory.clone(), Arc::new(NoRevocation));
        (state, directory, user.id)
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(bearer_token(&headers), Some("tok"));
    }

    #[tokio::test]
    async fn missing_header_is_missing_credential() {
        let (state, _, _) = state_with_user().await;
        let err = resolve_identity(&state, &HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_token() {
        let (state, _, _) = state_with_user().await;

        let mut foreign_config = test_config();
        foreign_config.access_secret = "someone-elses-secret".to_string();
        let foreign_directory = Arc::new(MemoryDirectory::new());
        foreign_directory
            .create(NewUser {
                email: "x@example.com".to_string(),
                password: "hunter22".to_string(),
                first_name: "Xa".to_string(),
                last_name: "Yu".to_string(),
                role: Role::Patient,
            })
            .await
            .unwrap();
        let foreign_state =
            AppState::new(&foreign_config, foreign_directory, Arc::new(NoRevocation));
        let session = foreign_state
            .issuer
            .login("x@example.com", "hunter22")
            .await
            .unwrap();

        let err = resolve_identity(&state, &bearer_headers(&session.access.token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn deleted_subject_is_user_not_found() {
        let (state, directory, user_id) = state_with_user().await;
        let session = state
            .issuer
            .login("nina@example.com", "hunter22")
            .await
            .unwrap();
        directory.remove(&user_id);

        let err = resolve_identity(&state, &bearer_headers(&session.access.token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn valid_token_resolves_identity() {
        let (state, _, user_id) = state_with_user().await;
        let session = state
            .issuer
            .login("nina@example.com", "hunter22")
            .await
            .unwrap();

        let identity = resolve_identity(&state, &bearer_headers(&session.access.token))
            .await
            .unwrap();
        assert_eq!(identity.id, user_id);
        assert_eq!(identity.role, Role::Nurse);
    }

    #[test]
    fn check_role_fails_closed_without_identity() {
        let err = check_role(None, &[]).unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[test]
    fn check_role_distinguishes_forbidden() {
        let nurse = AuthenticatedUser {
            id: "u-1".to_string(),
            email: "nina@example.com".to_string(),
            role: Role::Nurse,
        };
        assert!(check_role(Some(&nurse), &[]).is_ok());
        assert!(check_role(Some(&nurse), &[Role::Nurse, Role::Doctor]).is_ok());
        let err = check_role(Some(&nurse), &[Role::Admin]).unwrap_err();
        assert!(matches!(err, AuthError::Forbidden));
    }
}
