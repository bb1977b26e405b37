//! guildsmith CLI - rehearse an AI cleanup of a guild in the terminal.
//!
//! The guild comes from a JSON export. Proposals come from the configured
//! model, or from a saved plan file, and are reviewed one at a time.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use guildsmith_cleanup::{AnalysisDepth, FocusArea};
use guildsmith_config::Config;

mod commands;
mod config_bridge;
mod guild_file;
mod terminal;
mod theme;

use commands::cleanup::CleanupArgs;
use commands::{analyze, cleanup, config};
use theme::Theme;

/// guildsmith - AI-assisted server cleanup
#[derive(Parser)]
#[command(name = "guildsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review and apply AI-proposed fixes to a guild export
    Cleanup {
        /// Path to the guild export (JSON)
        #[arg(short, long)]
        guild: PathBuf,

        /// Act as this user id (defaults to the guild owner)
        #[arg(long = "as", value_name = "USER")]
        as_user: Option<String>,

        /// Analysis depth: basic, detailed, or comprehensive
        #[arg(long)]
        depth: Option<AnalysisDepth>,

        /// Focus area: all, permissions, naming, or structure
        #[arg(long, default_value = "all")]
        focus: FocusArea,

        /// Use a saved plan instead of asking the model
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Write applied changes back to the export
        #[arg(long)]
        save: bool,
    },

    /// Print the snapshot the advisor would be shown
    Analyze {
        /// Path to the guild export (JSON)
        #[arg(short, long)]
        guild: PathBuf,

        /// Analysis depth: basic, detailed, or comprehensive
        #[arg(long)]
        depth: Option<AnalysisDepth>,

        /// Focus area: all, permissions, naming, or structure
        #[arg(long, default_value = "all")]
        focus: FocusArea,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration
    Show {
        /// Also list which layer set each value
        #[arg(long)]
        sources: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let workspace_root = std::env::current_dir().ok();
    let resolved = Config::load(workspace_root.as_deref());

    // Set up logging from config, with --verbose override.
    let log_config = match &resolved {
        Ok(r) => {
            let mut lc = config_bridge::to_log_config(&r.config);
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        Err(_) => {
            let level = if cli.verbose { "debug" } else { "warn" };
            guildsmith_telemetry::LogConfig::new(level)
        },
    };
    if let Err(e) = guildsmith_telemetry::setup_logging(&log_config) {
        eprintln!("{}", Theme::error(&format!("Failed to initialize logging: {e}")));
    }

    let resolved = resolved?;
    match cli.command {
        Commands::Cleanup {
            guild,
            as_user,
            depth,
            focus,
            plan,
            save,
        } => {
            let args = CleanupArgs {
                guild,
                as_user,
                depth,
                focus,
                plan,
                save,
            };
            cleanup::run_cleanup(args, &resolved.config).await?;
        },
        Commands::Analyze {
            guild,
            depth,
            focus,
        } => {
            analyze::run_analyze(&guild, depth, focus, &resolved.config).await?;
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show { sources } => config::show_config(&resolved, sources)?,
        },
    }

    Ok(())
}
