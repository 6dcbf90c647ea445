//! Teevexa CLI: runs and inspects the portal gate.
//!
//! ```bash
//! teevexa serve --config teevexa.toml
//! teevexa nav --role developer
//! teevexa config --check
//! ```
//!
//! See `teevexa --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use teevexa_core::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(
    name = "teevexa",
    about = "Session and role gate for the Teevexa client portal and admin back-office",
    version
)]
struct Cli {
    /// Config file; missing files fall back to defaults
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the portal and admin shells over HTTP
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the admin navigation a role would see
    Nav {
        /// Role name (client, developer, project_manager, admin, super_admin) or "none"
        #[arg(long, default_value = "none")]
        role: String,

        /// Emit JSON instead of an outline
        #[arg(long)]
        json: bool,
    },

    /// Print the resolved configuration
    Config {
        /// Only validate, print nothing on success
        #[arg(long)]
        check: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { host, port } => commands::serve::run(&cli.config, host, port),
        Commands::Nav { role, json } => commands::nav::run(&role, json),
        Commands::Config { check } => commands::config::run(&cli.config, check),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
