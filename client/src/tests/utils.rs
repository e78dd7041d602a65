//! Test utilities and helpers for unit tests

#[cfg(test)]
pub mod test_helpers {
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    use healthbridge_protocol::common::{Role, SessionUser};

    use crate::store::{StoredSession, TokenStoreConfig};

    /// A signed-in patient fixture
    pub fn sample_user() -> SessionUser {
        user_with_role(Role::Patient)
    }

    pub fn user_with_role(role: Role) -> SessionUser {
        SessionUser {
            id: "user-1".to_string(),
            email: "pat@example.com".to_string(),
            first_name: "Pat".to_string(),
            last_name: "Smith".to_string(),
            role,
        }
    }

    /// A stored session whose pair is still comfortably valid
    pub fn sample_session() -> StoredSession {
        let now = Utc::now();
        StoredSession {
            user: sample_user(),
            access_token: "access-token".to_string(),
            refresh_token: "refresh-token".to_string(),
            access_token_expires_at: now + Duration::hours(1),
            refresh_token_expires_at: now + Duration::days(7),
            created_at: now,
            updated_at: now,
        }
    }

    /// Store config pointing into a temp dir
    pub fn temp_store_config(dir: &TempDir, encryption_key: Option<&str>) -> TokenStoreConfig {
        TokenStoreConfig {
            enabled: true,
            storage_path: Some(dir.path().join("session.json")),
            encryption_key: encryption_key.map(str::to_string),
        }
    }
}
