//! CLI entry point for idlink.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use idlink_app::DEFAULT_CONFIG_FILE;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// Link federated sign-ups onto one native directory user.
#[derive(Parser, Debug)]
#[command(
    name = "idlink",
    version,
    about = "idlink: pre sign-up hook that reconciles federated identities by email"
)]
struct Cli {
    /// Configuration file (defaults to idlink.toml; missing means defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile one sign-up event and print the resulting event.
    Handle {
        /// Event JSON file; stdin when omitted.
        #[arg(long)]
        event: Option<PathBuf>,
        /// Pretty-print the output event.
        #[arg(long)]
        pretty: bool,
    },

    /// Show how a directory username parses into a provider identity.
    Parse {
        /// Username such as `google_1147527301736`.
        username: String,
    },
}

fn main() -> Result<()> {
    let Cli { config, cmd } = Cli::parse();
    install_tracing();

    let config_path = config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    commands::run(cmd, &config_path)
}

fn install_tracing() {
    // stdout carries the event, so logs go to stderr. RUST_LOG overrides the level.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}
