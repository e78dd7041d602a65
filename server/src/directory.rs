//! User directory boundary
//!
//! The authentication gates only ever read from the directory; account
//! storage itself belongs to the surrounding product. [`MemoryDirectory`]
//! backs the standalone binary and the tests.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use std::collections::HashMap;
use uuid::Uuid;

use healthbridge_protocol::common::{Identity, Role, SessionUser};

/// Directory user record.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
        }
    }
}

/// Account data for a new registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email is already registered")]
    EmailTaken,
    #[error("directory lookup failed: {0}")]
    Lookup(String),
}

/// Identity lookups used by the authentication gates.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError>;

    /// Resolves a user by credentials. Unknown email and wrong password
    /// collapse into the same error so callers cannot probe for accounts.
    async fn find_by_credentials(&self, email: &str, password: &str)
        -> Result<User, DirectoryError>;

    async fn create(&self, new_user: NewUser) -> Result<User, DirectoryError>;
}

fn hash_password(password: &str) -> Result<String, DirectoryError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| DirectoryError::Lookup(format!("salt generation failed: {e}")))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| DirectoryError::Lookup(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DirectoryError::Lookup(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// In-memory directory used by the standalone server and the test suite.
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes an account, modelling deletion or deactivation. Tokens
    /// already issued for it must stop authenticating.
    pub fn remove(&self, id: &str) -> Option<User> {
        self.users.write().remove(id)
    }

    /// Replaces a user's role, modelling an administrative change between
    /// token issuance and renewal.
    pub fn set_role(&self, id: &str, role: Role) -> bool {
        match self.users.write().get_mut(id) {
            Some(user) => {
                user.role = role;
                true
            }
            None => false,
        }
    }

    fn email_in_use(&self, email: &str) -> bool {
        self.users
            .read()
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email))
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, DirectoryError> {
        let user = self
            .users
            .read()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or(DirectoryError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash) {
            return Err(DirectoryError::InvalidCredentials);
        }
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, DirectoryError> {
        if self.email_in_use(&new_user.email) {
            return Err(DirectoryError::EmailTaken);
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: new_user.email,
            password_hash: hash_password(&new_user.password)?,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
        };
        self.users.write().insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_patient(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "hunter22".to_string(),
            first_name: "Pat".to_string(),
            last_name: "Smith".to_string(),
            role: Role::Patient,
        }
    }

    #[tokio::test]
    async fn created_user_is_found_by_id_and_credentials() {
        let directory = MemoryDirectory::new();
        let user = directory.create(new_patient("pat@example.com")).await.unwrap();

        let by_id = directory.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "pat@example.com");

        let by_creds = directory
            .find_by_credentials("pat@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(by_creds.id, user.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let directory = MemoryDirectory::new();
        directory.create(new_patient("pat@example.com")).await.unwrap();

        let wrong_password = directory
            .find_by_credentials("pat@example.com", "nope")
            .await
            .unwrap_err();
        let unknown_email = directory
            .find_by_credentials("ghost@example.com", "hunter22")
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let directory = MemoryDirectory::new();
        directory.create(new_patient("pat@example.com")).await.unwrap();
        let err = directory
            .create(new_patient("PAT@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::EmailTaken));
    }

    #[tokio::test]
    async fn removed_user_is_absent() {
        let directory = MemoryDirectory::new();
        let user = directory.create(new_patient("pat@example.com")).await.unwrap();
        directory.remove(&user.id);
        assert!(directory.find_by_id(&user.id).await.unwrap().is_none());
    }

    #[test]
    fn password_hashes_verify_and_reject() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }
}
