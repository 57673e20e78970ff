//! tissuemix - brain tissue segmentation CLI
//!
//! Usage:
//!   tissuemix segment --features voxels.json                # Fit and label
//!   tissuemix segment --features voxels.json -o report.json # Save the report
//!   tissuemix segment --features voxels.json --dims 64,64,40 --ground-truth truth.json
//!   tissuemix inspect report.json                           # Summarize a saved report
//!
//! Logging goes to stderr; `-v` enables info, `-vv` debug (per-iteration
//! progress), `-vvv` trace. `RUST_LOG` overrides the level.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod report;

use commands::{inspect, segment};

/// tissuemix - unsupervised CSF/GM/WM segmentation
///
/// Fits a Gaussian mixture to per-voxel features and maps its components to
/// tissues using prior-probability columns.
#[derive(Parser, Debug)]
#[command(name = "tissuemix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging to stderr (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit the mixture and label every voxel
    Segment {
        /// Feature file: {"columns": [...], "rows": [[...]], "coords": [[i, j, k]]}
        #[arg(long, value_name = "FILE")]
        features: PathBuf,

        /// JSON run configuration
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write the segmentation report here
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Assemble a label volume of this size
        #[arg(long, value_name = "NX,NY,NZ", value_delimiter = ',')]
        dims: Option<Vec<usize>>,

        /// N×3 JSON array of (CSF, GM, WM) reference probabilities
        #[arg(long, value_name = "FILE")]
        ground_truth: Option<PathBuf>,
    },

    /// Summarize a saved segmentation report
    Inspect {
        /// Path to a report written by `segment --output`
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Segment {
            features,
            config,
            output,
            dims,
            ground_truth,
        } => segment::run(&segment::SegmentArgs {
            features,
            config: config.as_deref(),
            output: output.as_deref(),
            dims: dims.as_deref(),
            ground_truth: ground_truth.as_deref(),
            json: cli.json,
        }),

        Commands::Inspect { file } => inspect::run(file, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            e.exit_code()
        }
    }
}
