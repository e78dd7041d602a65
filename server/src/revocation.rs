//! Refresh-token revocation checks
//!
//! Refresh tokens are valid by signature and expiry alone, so this hook
//! is the single place a session can be cut short before its natural
//! expiry. The default implementation accepts everything, preserving
//! rotation-only behavior; deployments that need hard logout install
//! [`DenylistRevocation`] or their own store-backed check.

use parking_lot::RwLock;
use std::collections::HashSet;

/// Decides whether a refresh token id is still acceptable.
pub trait RevocationCheck: Send + Sync {
    fn is_revoked(&self, token_id: &str) -> bool;

    fn revoke(&self, token_id: &str);
}

/// Accepts every token; revocation requests are dropped.
pub struct NoRevocation;

impl RevocationCheck for NoRevocation {
    fn is_revoked(&self, _token_id: &str) -> bool {
        false
    }

    fn revoke(&self, _token_id: &str) {}
}

/// In-memory denylist keyed by token id. Entries live until process
/// restart, which outlasts every refresh token's expiry.
#[derive(Default)]
pub struct DenylistRevocation {
    revoked: RwLock<HashSet<String>>,
}

impl DenylistRevocation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RevocationCheck for DenylistRevocation {
    fn is_revoked(&self, token_id: &str) -> bool {
        self.revoked.read().contains(token_id)
    }

    fn revoke(&self, token_id: &str) {
        self.revoked.write().insert(token_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_revocation_accepts_everything() {
        let check = NoRevocation;
        check.revoke("t-1");
        assert!(!check.is_revoked("t-1"));
    }

    #[test]
    fn denylist_remembers_revoked_ids() {
        let check = DenylistRevocation::new();
        assert!(!check.is_revoked("t-1"));
        check.revoke("t-1");
        assert!(check.is_revoked("t-1"));
        assert!(!check.is_revoked("t-2"));
    }
}
