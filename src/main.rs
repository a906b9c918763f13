use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskdesk::commands;
use taskdesk::config::{API_BASE_ENV, LOG_ENV};

#[derive(Parser, Debug)]
#[command(name="taskdesk", version, about="Task definition editor for the admin backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose logs
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Backend base URL (overrides the one stored at login)
    #[arg(long, global = true, env = API_BASE_ENV)]
    api_base: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Remove the stored session
    Logout,
    /// Show the stored session and check it against the backend
    Whoami,
    /// List tasks
    List,
    /// Print one task as JSON
    Show {
        id: i64,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Create a task (interactive editor, or from a JSON file)
    Create {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Edit a task (interactive editor, or replace from a JSON file)
    Edit {
        id: i64,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var(LOG_ENV).unwrap_or_else(|_| filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Login { email } => commands::cmd_login(cli.api_base, email).await?,
        Commands::Logout => commands::cmd_logout().await?,
        Commands::Whoami => commands::cmd_whoami().await?,
        Commands::List => commands::cmd_list(cli.api_base).await?,
        Commands::Show { id, out } => commands::cmd_show(cli.api_base, id, out).await?,
        Commands::Create { file } => commands::cmd_create(cli.api_base, file).await?,
        Commands::Edit { id, file } => commands::cmd_edit(cli.api_base, id, file).await?,
    }
    Ok(())
}
