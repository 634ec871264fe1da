// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intercab - intercity ride dispatch over Telegram bots.
//!
//! This is the binary entry point: it loads configuration and runs one of the
//! subcommands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use intercab_config::model::IntercabConfig;
use intercab_config::ConfigError;
use intercab_core::IntercabError;
use intercab_storage::Database;

/// Intercab - intercity ride dispatch over Telegram bots.
#[derive(Parser, Debug)]
#[command(name = "intercab", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the XDG lookup.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the role bots and, when enabled, the HTTP gateway.
    Serve,
    /// Create or upgrade the database schema and exit.
    Migrate,
    /// Validate the configuration and print a summary.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<IntercabConfig, Vec<ConfigError>> {
    match path {
        Some(path) => intercab_config::load_and_validate_path(path),
        None => intercab_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            intercab_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Migrate) => run_migrate(&config).await,
        Some(Commands::CheckConfig) => {
            print_config_summary(&config);
            Ok(())
        }
        None => {
            println!("intercab: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("intercab: {e}");
        std::process::exit(1);
    }
}

/// Opens the database, which applies pending migrations, and closes it again.
async fn run_migrate(config: &IntercabConfig) -> Result<(), IntercabError> {
    let path = &config.storage.database_path;
    let db = Database::open_with(path, config.storage.wal_mode).await?;
    db.close().await?;
    println!("intercab: database schema is up to date ({path})");
    Ok(())
}

fn print_config_summary(config: &IntercabConfig) {
    let configured = |token: &Option<String>| {
        if token.as_deref().is_some_and(|t| !t.trim().is_empty()) {
            "configured"
        } else {
            "not configured"
        }
    };
    println!("intercab: config is valid");
    println!("  database:      {}", config.storage.database_path);
    println!("  rider bot:     {}", configured(&config.telegram.rider_token));
    println!("  driver bot:    {}", configured(&config.telegram.driver_token));
    println!("  operator bot:  {}", configured(&config.telegram.operator_token));
    println!(
        "  operator login: {}",
        if config.operator.login.is_some() { "challenge" } else { "bootstrap ids only" }
    );
    if config.gateway.enabled {
        println!(
            "  gateway:       {}:{} (webhook {})",
            config.gateway.host,
            config.gateway.port,
            if config.gateway.webhook_secret.is_some() { "signed" } else { "unsigned" }
        );
    } else {
        println!("  gateway:       disabled");
    }
}
