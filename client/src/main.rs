use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::CliHandler;
use healthbridge_client::ui::UI;

#[derive(Parser)]
#[command(
    name = "hbridge",
    about = "HealthBridge session tool",
    long_about = "HealthBridge session tool

OVERVIEW:
  Sign in to a HealthBridge deployment and manage the stored session the
  SDK uses for authenticated requests.

QUICK START:
  hbridge login                         # Sign in with email and password
  hbridge status                        # Check session and server status
  hbridge whoami                        # Show the signed-in user
  hbridge logout                        # End the session",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an alternative config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with your HealthBridge account
    Login(LoginArgs),
    /// End the current session and clear stored tokens
    Logout,
    /// Show session and server status
    Status,
    /// Show the signed-in user
    Whoami,
}

#[derive(Args)]
pub struct LoginArgs {
    /// Account email; prompted for when omitted
    #[arg(short, long)]
    pub email: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let mut handler = CliHandler::with_config_path(cli.config);
    if let Err(err) = handler.execute(cli.command).await {
        UI::new().error(&err.to_string());
        std::process::exit(1);
    }
}
