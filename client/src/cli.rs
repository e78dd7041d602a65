use dialoguer::{Input, Password};
use std::path::PathBuf;

use healthbridge_client::config::CliConfig;
use healthbridge_client::error::Result;
use healthbridge_client::http::{ApiClient, HttpClient};
use healthbridge_client::ui::UI;

use crate::{Commands, LoginArgs};

/// CLI handler for processing commands
pub struct CliHandler {
    config_path: Option<PathBuf>,
    ui: UI,
}

impl CliHandler {
    /// Create a new CLI handler with a custom config path
    pub fn with_config_path(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            ui: UI::new(),
        }
    }

    /// Load configuration using the handler's config path
    async fn load_config(&self) -> Result<CliConfig> {
        CliConfig::load(self.config_path.as_deref()).await
    }

    async fn client(&self) -> Result<HttpClient> {
        let config = self.load_config().await?;
        HttpClient::new(config.to_sdk_config())
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Logout => self.handle_logout().await,
            Commands::Status => self.handle_status().await,
            Commands::Whoami => self.handle_whoami().await,
        }
    }

    /// Handle login command
    async fn handle_login(&self, args: LoginArgs) -> Result<()> {
        let client = self.client().await?;

        let email = match args.email {
            Some(email) => email,
            None => Input::new().with_prompt("Email").interact_text()?,
        };
        let password = Password::new().with_prompt("Password").interact()?;

        let user = client.login(&email, &password).await?;
        self.ui.success(&format!(
            "Signed in as {} {} ({})",
            user.first_name, user.last_name, user.role
        ));
        Ok(())
    }

    /// Handle logout command
    async fn handle_logout(&self) -> Result<()> {
        let client = self.client().await?;

        if !client.is_authenticated().await {
            self.ui.warning("No active session");
            return Ok(());
        }

        client.logout().await?;
        self.ui.success("Signed out");
        Ok(())
    }

    /// Handle status command
    async fn handle_status(&self) -> Result<()> {
        let config = self.load_config().await?;
        let client = HttpClient::new(config.to_sdk_config())?;

        self.ui.info(&format!("Endpoint: {}", config.endpoint));

        let authenticated = client.is_authenticated().await;
        println!("Session: {}", self.ui.format_auth_status(authenticated));

        // Any answer, including "not signed in", proves the server is up
        let connected = match client.fetch_session().await {
            Ok(_) => true,
            Err(err) => err.is_auth_error(),
        };
        println!("Server: {}", self.ui.format_server_status(connected));
        Ok(())
    }

    /// Handle whoami command
    async fn handle_whoami(&self) -> Result<()> {
        let client = self.client().await?;

        match client.fetch_session().await {
            Ok(user) => {
                println!("{} {} <{}>", user.first_name, user.last_name, user.email);
                println!("Role: {}", user.role);
                Ok(())
            }
            Err(err) if err.is_auth_error() => {
                self.ui.warning("Not signed in");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
