//! Client auth state machine
//!
//! One source of truth for "who is signed in, is the check still running,
//! did it fail". A single asynchronous session check drives it: at most
//! one check is in flight, and a check whose observer went away is
//! discarded instead of overwriting newer state.

use parking_lot::Mutex;

use healthbridge_protocol::common::SessionUser;

use crate::error::ClientError;
use crate::http::ApiClient;

/// Observable auth state.
///
/// A resolved check lands in exactly one of three terminal shapes:
/// a populated `user`, an empty `user` with no error (definitively signed
/// out), or an `error` (the check itself failed, e.g. the server was
/// unreachable).
#[derive(Debug, Clone)]
pub struct AuthState {
    pub user: Option<SessionUser>,
    pub loading: bool,
    pub error: Option<ClientError>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Handle for one session check. Completion is only accepted from the
/// holder of the current handle; anything older is stale.
#[derive(Debug)]
pub struct CheckToken {
    epoch: u64,
}

#[derive(Debug)]
struct MonitorInner {
    state: AuthState,
    epoch: u64,
    in_flight: bool,
}

/// Drives [`AuthState`] through its transitions.
#[derive(Debug)]
pub struct SessionMonitor {
    inner: Mutex<MonitorInner>,
}

impl Default for SessionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMonitor {
    /// Starts in the loading state: the initial session check is expected
    /// to run immediately, and nothing should redirect before it resolves.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MonitorInner {
                state: AuthState {
                    user: None,
                    loading: true,
                    error: None,
                },
                epoch: 0,
                in_flight: false,
            }),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.inner.lock().state.clone()
    }

    /// Begins a session check. Returns `None` while another check is in
    /// flight so two checks can never race each other's terminal states.
    pub fn begin_check(&self) -> Option<CheckToken> {
        let mut inner = self.inner.lock();
        if inner.in_flight {
            return None;
        }
        inner.epoch += 1;
        inner.in_flight = true;
        inner.state.loading = true;
        inner.state.error = None;
        Some(CheckToken { epoch: inner.epoch })
    }

    /// Applies a check result. `Ok(Some(user))` is a signed-in session,
    /// `Ok(None)` a definitive signed-out answer, `Err` a failed check.
    /// Returns false when the token is stale and the result was discarded.
    pub fn complete(
        &self,
        token: CheckToken,
        result: Result<Option<SessionUser>, ClientError>,
    ) -> bool {
        let mut inner = self.inner.lock();
        if token.epoch != inner.epoch {
            return false;
        }
        inner.in_flight = false;
        inner.state.loading = false;
        match result {
            Ok(user) => {
                inner.state.user = user;
                inner.state.error = None;
            }
            Err(err) => {
                inner.state.user = None;
                inner.state.error = Some(err);
            }
        }
        true
    }

    /// Abandons a pending check (the observer unmounted). A completion
    /// arriving later with this token is discarded.
    pub fn cancel(&self, token: CheckToken) {
        let mut inner = self.inner.lock();
        if token.epoch == inner.epoch {
            inner.epoch += 1;
            inner.in_flight = false;
            inner.state.loading = false;
        }
    }

    /// Drops straight to the signed-out terminal state (after logout or a
    /// dead refresh token). Any in-flight check becomes stale.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        inner.in_flight = false;
        inner.state = AuthState {
            user: None,
            loading: false,
            error: None,
        };
    }
}

/// Runs one session check against the server and lands the result in the
/// monitor. An auth-flavored failure means "nobody is signed in", not a
/// surfaced error; only non-auth failures (network, server) are stored.
/// Returns false when the check was skipped or its result discarded.
pub async fn check_session(monitor: &SessionMonitor, api: &impl ApiClient) -> bool {
    let Some(token) = monitor.begin_check() else {
        return false;
    };

    let result = match api.fetch_session().await {
        Ok(user) => Ok(Some(user)),
        Err(err) if err.is_auth_error() => Ok(None),
        Err(err) => Err(err),
    };

    monitor.complete(token, result)
}
