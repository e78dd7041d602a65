//! Shared application state

use std::sync::Arc;

use chrono::Duration;

use crate::config::ServerConfig;
use crate::directory::UserDirectory;
use crate::revocation::RevocationCheck;
use crate::session::SessionIssuer;
use crate::token::TokenCodec;

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn UserDirectory>,
    pub issuer: Arc<SessionIssuer>,
}

impl AppState {
    pub fn new(
        config: &ServerConfig,
        directory: Arc<dyn UserDirectory>,
        revocation: Arc<dyn RevocationCheck>,
    ) -> Self {
        let codec = TokenCodec::new(
            &config.access_secret,
            &config.refresh_secret,
            Duration::seconds(config.access_ttl_secs),
            Duration::seconds(config.refresh_ttl_secs),
        );
        let issuer = Arc::new(SessionIssuer::new(codec, directory.clone(), revocation));
        Self { directory, issuer }
    }
}
