//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- run the poll server
//! - `config show|get|path` -- inspect the effective configuration
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{self, Config};
use crate::server::{self, AppState};
use crate::session::SessionCoordinator;

/// Live classroom poll server.
#[derive(Parser, Debug)]
#[command(
    name = "classpoll",
    version = env!("CARGO_PKG_VERSION"),
    about = "Live classroom polls: one teacher, many students, one shared poll"
)]
pub struct Cli {
    /// Configuration file (default: $CLASSPOLL_CONFIG or the user config dir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the poll server (default when no subcommand is given).
    Start {
        /// Port to listen on (overrides config and $PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (overrides config and $CLASSPOLL_BIND).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON.
    Show,

    /// Print a specific configuration value by dot-notation path.
    Get {
        /// Dot-notation key (e.g. "server.port", "polls.maxOptions").
        key: String,
    },

    /// Print the resolved configuration file path.
    Path,
}

/// Dispatch the parsed command line.
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let explicit = cli.config.as_deref();
    match cli.command.unwrap_or(Command::Start {
        port: None,
        bind: None,
    }) {
        Command::Start { port, bind } => handle_start(explicit, port, bind).await,
        Command::Config(ConfigCommand::Show) => handle_config_show(explicit),
        Command::Config(ConfigCommand::Get { key }) => handle_config_get(explicit, &key),
        Command::Config(ConfigCommand::Path) => {
            handle_config_path(explicit);
            Ok(())
        }
        Command::Version => {
            handle_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Run the `start` subcommand.
pub async fn handle_start(
    explicit: Option<&Path>,
    port: Option<u16>,
    bind: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = config::load_config(explicit)?;
    if let Some(port) = port {
        cfg.server.port = port;
    }
    if let Some(bind) = bind {
        cfg.server.bind = bind;
    }
    crate::logging::init(&cfg.logging)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config::get_config_path(explicit).display(),
        "starting classpoll"
    );

    let coordinator = SessionCoordinator::new(cfg.session_settings());
    let state = AppState::new(coordinator, cfg.server.queue_size);
    server::serve(&cfg.server.address(), state, server::shutdown_signal()).await?;
    Ok(())
}

/// Run the `config show` subcommand.
pub fn handle_config_show(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config(explicit)?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}

/// Run the `config get <key>` subcommand.
pub fn handle_config_get(
    explicit: Option<&Path>,
    key: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config(explicit)?;
    match config_value(&cfg, key)? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => {
            eprintln!("Key not found: {}", key);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path(explicit: Option<&Path>) {
    println!("{}", config::get_config_path(explicit).display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("classpoll {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("CLASSPOLL_BUILD_DATE"));
    println!("  Git commit: {}", env!("CLASSPOLL_GIT_HASH"));
    println!("  Profile:    {}", env!("CLASSPOLL_BUILD_PROFILE"));
    println!("  Default bind: {}", config::DEFAULT_BIND);
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config_value(cfg: &Config, key: &str) -> Result<Option<Value>, serde_json::Error> {
    let root = serde_json::to_value(cfg)?;
    Ok(get_value_at_path(&root, key))
}

/// Navigate a JSON value by dot-notation path and return the leaf value.
fn get_value_at_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
