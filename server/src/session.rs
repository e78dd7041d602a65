//! Session issuance and renewal
//!
//! The issuer turns an authenticated user into a token pair and rotates
//! pairs on renewal. It keeps no per-session state: a renewal re-resolves
//! the user so the new pair carries the directory's current role, and the
//! configured [`RevocationCheck`] is the only way to refuse an otherwise
//! valid refresh token.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use healthbridge_protocol::common::{Claims, LoginResponse};

use crate::directory::{NewUser, User, UserDirectory};
use crate::error::AuthError;
use crate::revocation::RevocationCheck;
use crate::token::{IssuedToken, TokenCodec, TokenError, TokenKind};

/// An issued session: the user it belongs to and the fresh token pair.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

impl Session {
    pub fn to_response(&self) -> LoginResponse {
        LoginResponse {
            access_token: self.access.token.clone(),
            refresh_token: self.refresh.token.clone(),
            expires_at: self.access.expires_at,
            refresh_expires_at: self.refresh.expires_at,
            token_type: "Bearer".to_string(),
            user: self.user.session_user(),
        }
    }
}

pub struct SessionIssuer {
    codec: TokenCodec,
    directory: Arc<dyn UserDirectory>,
    revocation: Arc<dyn RevocationCheck>,
}

impl SessionIssuer {
    pub fn new(
        codec: TokenCodec,
        directory: Arc<dyn UserDirectory>,
        revocation: Arc<dyn RevocationCheck>,
    ) -> Self {
        Self {
            codec,
            directory,
            revocation,
        }
    }

    /// Authenticates credentials against the directory and issues a fresh
    /// pair for the resolved user.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.directory.find_by_credentials(email, password).await?;
        self.issue_pair(user)
    }

    /// Creates the account through the directory and signs it in.
    pub async fn register(&self, new_user: NewUser) -> Result<Session, AuthError> {
        let user = self.directory.create(new_user).await?;
        self.issue_pair(user)
    }

    /// Rotates a session: verifies the refresh token, re-resolves the user
    /// by id so role changes and deletions since issuance take effect, and
    /// issues a brand-new pair.
    pub async fn renew(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let claims = self.codec.verify(TokenKind::Refresh, refresh_token)?;
        if self.revocation.is_revoked(&claims.jti) {
            debug!(jti = %claims.jti, "refresh token is revoked");
            return Err(AuthError::InvalidToken);
        }
        let user = self
            .directory
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.issue_pair(user)
    }

    /// Best-effort revocation of a presented refresh token. Invalid or
    /// expired tokens are ignored; there is nothing left to revoke.
    pub fn revoke(&self, refresh_token: &str) {
        if let Ok(claims) = self.codec.verify(TokenKind::Refresh, refresh_token) {
            debug!(jti = %claims.jti, "revoking refresh token");
            self.revocation.revoke(&claims.jti);
        }
    }

    /// Verifies an access token for the request authenticator.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.codec.verify(TokenKind::Access, token)
    }

    fn issue_pair(&self, user: User) -> Result<Session, AuthError> {
        let identity = user.identity();
        let access = self.codec.issue(TokenKind::Access, &identity)?;
        let refresh = self.codec.issue(TokenKind::Refresh, &identity)?;
        debug!(user_id = %user.id, expires_at = %access.expires_at, "session pair issued");
        Ok(Session {
            user,
            access,
            refresh,
        })
    }

    /// Seconds until the given instant, for cookie lifetimes.
    pub fn seconds_until(expires_at: chrono::DateTime<Utc>) -> i64 {
        (expires_at - Utc::now()).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::revocation::{DenylistRevocation, NoRevocation};
    use chrono::Duration;
    use healthbridge_protocol::common::Role;

    fn issuer_with(
        directory: Arc<MemoryDirectory>,
        revocation: Arc<dyn RevocationCheck>,
    ) -> SessionIssuer {
        let codec = TokenCodec::new(
            "access-secret",
            "refresh-secret",
            Duration::seconds(60),
            Duration::seconds(120),
        );
        SessionIssuer::new(codec, directory, revocation)
    }

    async fn seeded_directory() -> (Arc<MemoryDirectory>, String) {
        let directory = Arc::new(MemoryDirectory::new());
        let user = directory
            .create(NewUser {
                email: "doc@example.com".to_string(),
                password: "hunter22".to_string(),
                first_name: "Dana".to_string(),
                last_name: "Reyes".to_string(),
                role: Role::Doctor,
            })
            .await
            .unwrap();
        (directory, user.id)
    }

    #[tokio::test]
    async fn login_issues_verifiable_pair() {
        let (directory, _) = seeded_directory().await;
        let issuer = issuer_with(directory, Arc::new(NoRevocation));

        let session = issuer.login("doc@example.com", "hunter22").await.unwrap();
        let claims = issuer.verify_access(&session.access.token).unwrap();
        assert_eq!(claims.role, Role::Doctor);
        assert_eq!(claims.email, "doc@example.com");

        let response = session.to_response();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.user.role, Role::Doctor);
    }

    #[tokio::test]
    async fn login_with_bad_password_fails() {
        let (directory, _) = seeded_directory().await;
        let issuer = issuer_with(directory, Arc::new(NoRevocation));
        let err = issuer.login("doc@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn renew_reflects_current_directory_role() {
        let (directory, user_id) = seeded_directory().await;
        let issuer = issuer_with(directory.clone(), Arc::new(NoRevocation));

        let session = issuer.login("doc@example.com", "hunter22").await.unwrap();
        directory.set_role(&user_id, Role::Admin);

        let renewed = issuer.renew(&session.refresh.token).await.unwrap();
        let claims = issuer.verify_access(&renewed.access.token).unwrap();
        assert_eq!(claims.role, Role::Admin);
    }

    #[tokio::test]
    async fn renew_fails_for_deleted_user() {
        let (directory, user_id) = seeded_directory().await;
        let issuer = issuer_with(directory.clone(), Arc::new(NoRevocation));

        let session = issuer.login("doc@example.com", "hunter22").await.unwrap();
        directory.remove(&user_id);

        let err = issuer.renew(&session.refresh.token).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn renew_rejects_an_access_token() {
        let (directory, _) = seeded_directory().await;
        let issuer = issuer_with(directory, Arc::new(NoRevocation));
        let session = issuer.login("doc@example.com", "hunter22").await.unwrap();
        let err = issuer.renew(&session.access.token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn revoked_refresh_token_is_refused() {
        let (directory, _) = seeded_directory().await;
        let issuer = issuer_with(directory, Arc::new(DenylistRevocation::new()));

        let session = issuer.login("doc@example.com", "hunter22").await.unwrap();
        issuer.revoke(&session.refresh.token);

        let err = issuer.renew(&session.refresh.token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn revoke_ignores_garbage_tokens() {
        let (directory, _) = seeded_directory().await;
        let issuer = issuer_with(directory, Arc::new(DenylistRevocation::new()));
        issuer.revoke("not.a.token");
        let session = issuer.login("doc@example.com", "hunter22").await.unwrap();
        assert!(issuer.renew(&session.refresh.token).await.is_ok());
    }
}
