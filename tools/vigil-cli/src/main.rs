//! Vigil CLI — Command-line interface for camera motion detection.
//!
//! Usage:
//!   vigil run [OPTIONS]        Start the motion detection loop
//!   vigil check                Check configuration and storage health
//!   vigil stats                Show snapshot storage statistics
//!   vigil cleanup              Apply retention policy to stored snapshots
//!   vigil init-config          Write a default configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use vigil_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "vigil",
    about = "Camera motion detection with automatic snapshot capture",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the capture and motion detection loop
    Run {
        /// Use the built-in synthetic frame source instead of a camera
        #[arg(long)]
        synthetic: bool,

        /// V4L2 device index override (e.g. 0 for /dev/video0)
        #[arg(long)]
        device: Option<u32>,

        /// Snapshot output directory override
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Cooldown between motion events in seconds
        #[arg(long)]
        cooldown: Option<f64>,
    },

    /// Check configuration and storage health
    Check,

    /// Show snapshot storage statistics
    Stats,

    /// Delete snapshots that exceed the retention policy
    Cleanup {
        /// Report what would be deleted without deleting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref());
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    vigil_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Run {
            synthetic,
            device,
            output,
            cooldown,
        } => commands::run::run(config, synthetic, device, output, cooldown).await,
        Commands::Check => commands::check::run(&config),
        Commands::Stats => commands::stats::run(&config),
        Commands::Cleanup { dry_run } => commands::cleanup::run(&config, dry_run),
        Commands::InitConfig { force } => commands::init::run(cli.config.as_deref(), force),
    }
}
