//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Augur - Mines git history and issue trackers into defect datasets.
#[derive(Parser)]
#[command(name = "augur")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the repository to mine
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the full labelled dataset
    #[command(alias = "dataset")]
    Mine(MineArgs),

    /// Resolve and estimate ticket lifecycles
    #[command(alias = "lc")]
    Lifecycle(LifecycleArgs),

    /// Walk the commit history and report per-function change counts
    #[command(alias = "hist")]
    History(HistoryArgs),

    /// List the release catalog derived from tags
    #[command(alias = "rel")]
    Releases(ReleasesArgs),
}

#[derive(Args)]
pub struct MineArgs {
    /// Write the dataset to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the project name stamped into rows
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct LifecycleArgs {
    /// Read tickets from a local JSON file instead of the tracker
    #[arg(short, long)]
    pub tickets: Option<PathBuf>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Only report functions with at least this many revisions
    #[arg(long, default_value = "1")]
    pub min_revisions: usize,
}

#[derive(Args)]
pub struct ReleasesArgs {}

/// Dataset output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Pretty-printed JSON array
    Json,
}
