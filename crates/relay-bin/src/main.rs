//! tbrelay - background HTTP relay and its command-line client.

mod app;
mod client;
mod ipc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use relay_config_and_utils::{init_client_logging, init_logging, Config, Paths};

/// tbrelay command-line interface.
#[derive(Parser)]
#[command(name = "tbrelay")]
#[command(about = "Background HTTP relay for moderation tooling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the config
    /// value for the relay and to warn for client commands.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (socket, logs, config, cache). Defaults to ~/.tbrelay
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay
    Start {
        /// Also log to stderr
        #[arg(short, long)]
        foreground: bool,
    },
    /// Stop the relay
    Stop,
    /// Check relay status
    Status,
    /// Send one HTTP request through the relay
    Request(client::RequestArgs),
    /// Show the signed-in user
    Whoami,
    /// Reload the relay configuration
    Reload,
    /// Read or edit the relay's durable cache
    #[command(subcommand)]
    Cache(client::CacheArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };

    let client_level = cli.log_level.clone().unwrap_or_else(|| "warn".to_string());

    match cli.command {
        Some(Commands::Start { foreground }) => {
            start(cli.log_level, paths, foreground).await?;
        }
        None => {
            // Default to start in foreground if no command given
            start(cli.log_level, paths, true).await?;
        }
        Some(Commands::Stop) => {
            app::stop_relay(&paths).await?;
        }
        Some(Commands::Status) => {
            app::check_status(&paths).await?;
        }
        Some(Commands::Request(args)) => {
            init_client_logging(&client_level);
            client::request(&paths, args).await?;
        }
        Some(Commands::Whoami) => {
            init_client_logging(&client_level);
            client::whoami(&paths).await?;
        }
        Some(Commands::Reload) => {
            init_client_logging(&client_level);
            client::reload(&paths).await?;
        }
        Some(Commands::Cache(args)) => {
            init_client_logging(&client_level);
            client::cache(&paths, args).await?;
        }
    }

    Ok(())
}

async fn start(
    log_level: Option<String>,
    paths: Paths,
    foreground: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(&paths)?;
    let level = log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, &paths, foreground);
    app::run_relay(config, paths).await
}
