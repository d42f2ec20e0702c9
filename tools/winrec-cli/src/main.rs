//! winrec CLI: record a window that moves and resizes into a single video.
//!
//! Usage:
//!   winrec record [OPTIONS]          Follow a window and record it
//!   winrec recover <DIR> [--output]  Merge segments left by an interrupted session
//!   winrec check                     Check required external tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use winrec_common::config::RecorderBackendKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "winrec",
    about = "Record a moving, resizing window as one continuous video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow a window and record it until interrupted
    Record(commands::record::RecordArgs),

    /// Merge the segments of an interrupted session
    Recover {
        /// Session work directory (window_recording_<stamp>)
        session_dir: PathBuf,

        /// Output file (defaults to recording_<stamp>.<ext> in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the probe, recorder, and merge tools are installed
    Check {
        /// Recorder backend to check for
        #[arg(long, default_value = "auto")]
        backend: RecorderBackendKind,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = winrec_common::config::AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    winrec_common::logging::init_logging(&config.logging)?;

    match cli.command {
        Commands::Record(args) => commands::record::run(config, args).await,
        Commands::Recover {
            session_dir,
            output,
        } => commands::recover::run(config, session_dir, output).await,
        Commands::Check { backend } => commands::check::run(backend),
    }
}
