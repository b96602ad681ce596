//! Kino CLI - Headless Source Resolution Tool
//!
//! Features:
//! - Source classification (plain/HLS/DASH, audio/video)
//! - Surface plans for the rendering layer
//! - Playback simulation against in-memory engines

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

/// Kino CLI - Media source toolkit
#[derive(Parser)]
#[command(name = "kino-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Media source classification and playback simulation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

/// Backend configuration shared by every command
#[derive(Args)]
struct ConfigArgs {
    /// JSON file with the file backend configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Treat the source as audio
    #[arg(long)]
    force_audio: bool,

    /// Route the source through the HLS engine
    #[arg(long)]
    force_hls: bool,

    /// Route the source through the DASH engine
    #[arg(long)]
    force_dash: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a source descriptor
    Classify {
        /// URI, or a JSON string/array descriptor
        source: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show the surface the rendering layer should build
    Plan {
        /// URI, or a JSON string/array descriptor
        source: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Show native controls
        #[arg(long)]
        controls: bool,

        /// Loop playback
        #[arg(long = "loop")]
        loop_playback: bool,

        /// Requested width
        #[arg(long)]
        width: Option<String>,

        /// Requested height
        #[arg(long)]
        height: Option<String>,
    },

    /// Mount a source on an in-memory surface and drive a playback session
    Simulate {
        /// URI, or a JSON string/array descriptor
        source: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Media duration reported by the surface, in seconds
        #[arg(short, long, default_value = "60")]
        duration: f64,

        /// End of the first buffered range, in seconds
        #[arg(short, long, default_value = "30")]
        buffered: f64,

        /// Make every engine script fail to load
        #[arg(long)]
        fail_sdk: bool,

        /// Unmount while the engine script is still loading
        #[arg(long)]
        unmount_early: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    kino_media::init();

    match cli.command {
        Commands::Classify { source, config } => {
            let config = commands::load_config(&config)?;
            commands::classify(&source, &config, &cli.format)?;
        }
        Commands::Plan { source, config, controls, loop_playback, width, height } => {
            let config = commands::load_config(&config)?;
            let props = kino_media::RenderProps {
                controls,
                loop_playback,
                width,
                height,
            };
            commands::plan(&source, &config, &props, &cli.format)?;
        }
        Commands::Simulate { source, config, duration, buffered, fail_sdk, unmount_early } => {
            let config = commands::load_config(&config)?;
            let options = commands::SimulateOptions {
                duration,
                buffered,
                fail_sdk,
                unmount_early,
            };
            commands::simulate(&source, config, options, &cli.format).await?;
        }
    }

    Ok(())
}
