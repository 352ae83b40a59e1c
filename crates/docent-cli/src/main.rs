//! Docent CLI - Exhibit navigation tools
//!
//! Inspect the beat codec and topic scheme, or run a scripted docent session
//! against an in-process broker.

use clap::{Parser, Subcommand};
use docent_core::ExhibitKind;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// Docent - exhibit navigation and state synchronization
#[derive(Parser)]
#[command(name = "docent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode or decode beat identifiers
    Beat {
        #[command(subcommand)]
        action: BeatAction,
    },

    /// List the topics an exhibit uses
    Topics {
        /// Exhibit id (basecamp, overlook, summit, welcome-wall)
        #[arg(short, long)]
        exhibit: ExhibitKind,
    },

    /// Run a scripted docent session, then reboot the exhibit to show recovery
    Simulate {
        /// Exhibit to drive
        #[arg(short, long)]
        exhibit: Option<ExhibitKind>,

        /// Tour id to load
        #[arg(short, long, default_value = "morning-tour")]
        tour: String,

        /// Runtime configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum BeatAction {
    /// Build a wire beat id from a moment and zero-based beat index
    Encode {
        moment: String,

        beat_idx: usize,

        /// Check the moment against this exhibit
        #[arg(short, long)]
        exhibit: Option<ExhibitKind>,
    },

    /// Parse a wire beat id for an exhibit
    Decode {
        beat_id: String,

        #[arg(short, long)]
        exhibit: ExhibitKind,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(!cli.no_color)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Beat { action } => match action {
            BeatAction::Encode {
                moment,
                beat_idx,
                exhibit,
            } => commands::beat::encode(&moment, beat_idx, exhibit)?,
            BeatAction::Decode { beat_id, exhibit } => commands::beat::decode(&beat_id, exhibit)?,
        },

        Commands::Topics { exhibit } => {
            commands::topics::run(exhibit);
        }

        Commands::Simulate {
            exhibit,
            tour,
            config,
        } => {
            commands::simulate::run(exhibit, &tour, config.as_deref()).await?;
        }
    }

    Ok(())
}
