use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use healthbridge_protocol::common::Role;
use healthbridge_server::config::ServerConfig;
use healthbridge_server::directory::{MemoryDirectory, NewUser, UserDirectory};
use healthbridge_server::revocation::DenylistRevocation;
use healthbridge_server::routes;
use healthbridge_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Missing secrets abort here, before anything listens
    let config = ServerConfig::from_env()?;
    info!(
        bind = %config.bind_addr,
        access_ttl_secs = config.access_ttl_secs,
        refresh_ttl_secs = config.refresh_ttl_secs,
        "healthbridge auth service starting"
    );

    let directory = Arc::new(MemoryDirectory::new());
    if let (Some(email), Some(password)) = (
        config.bootstrap_admin_email.clone(),
        config.bootstrap_admin_password.clone(),
    ) {
        let admin = directory
            .create(NewUser {
                email,
                password,
                first_name: "Bootstrap".to_string(),
                last_name: "Admin".to_string(),
                role: Role::Admin,
            })
            .await?;
        info!(user_id = %admin.id, "bootstrap admin created");
    }

    let state = AppState::new(&config, directory, Arc::new(DenylistRevocation::new()));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
