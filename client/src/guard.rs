//! Route guard decisions
//!
//! Pure gate over [`AuthState`]: given a route's rule and the current
//! location, decide whether to render, wait, surface an error, or
//! redirect. Authentication failures go to the login path (carrying the
//! attempted location for post-login restore); authorization failures go
//! to the landing path instead.

use healthbridge_protocol::common::Role;

use crate::state::AuthState;

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING_PATH: &str = "/";

/// Access rule attached to a route.
#[derive(Debug, Clone, Default)]
pub struct RouteRule {
    /// Roles admitted to the route; empty admits any authenticated user.
    pub allowed_roles: Vec<Role>,
    /// Where unauthenticated visitors are sent; defaults to the login path.
    pub redirect_path: Option<String>,
}

impl RouteRule {
    /// Any authenticated identity may enter.
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Only the given roles may enter.
    pub fn roles(allowed_roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: allowed_roles.into_iter().collect(),
            redirect_path: None,
        }
    }

    pub fn with_redirect(mut self, path: impl Into<String>) -> Self {
        self.redirect_path = Some(path.into());
        self
    }
}

/// What the shell should do with a guarded route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session check has not resolved; show a neutral indicator and
    /// make no redirect decision yet.
    Wait,
    /// Render the protected content.
    Render,
    /// The session check failed; surface the error and do not redirect.
    ShowError(String),
    /// Not signed in: go to the login path, remembering where we were.
    RedirectToLogin { redirect_to: String, from: String },
    /// Signed in but not allowed here: go to the landing path.
    RedirectToHome { redirect_to: String },
}

pub fn evaluate(state: &AuthState, rule: &RouteRule, location: &str) -> GuardDecision {
    if state.loading {
        return GuardDecision::Wait;
    }

    if let Some(error) = &state.error {
        return GuardDecision::ShowError(error.to_string());
    }

    let Some(user) = &state.user else {
        let redirect_to = rule
            .redirect_path
            .clone()
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());
        return GuardDecision::RedirectToLogin {
            redirect_to,
            from: location.to_string(),
        };
    };

    if !rule.allowed_roles.is_empty() && !rule.allowed_roles.contains(&user.role) {
        return GuardDecision::RedirectToHome {
            redirect_to: DEFAULT_LANDING_PATH.to_string(),
        };
    }

    GuardDecision::Render
}
