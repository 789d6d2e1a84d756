//! CLI argument structures

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Split CSV tables into key-sorted chunks and merge them back
#[derive(Parser)]
#[command(name = "disttable")]
#[command(about = "disttable - Distributed key-sorted tables over CSV files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Input files and how to distribute them.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// CSV files with a header row. Several files become one chunk each
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Primary key column(s), most significant first
    #[arg(short = 'k', long = "key", value_name = "COL", required = true)]
    pub key: Vec<String>,

    /// Number of chunks when distributing a single file
    #[arg(short = 'n', long, value_name = "N")]
    pub chunks: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge all chunks into one table, later files winning on duplicate keys
    Collect {
        #[command(flatten)]
        source: SourceArgs,

        /// Write the merged table as CSV instead of printing it
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Maximum rows to print
        #[arg(long, value_name = "N")]
        rows: Option<usize>,
    },
    /// Show chunk domains, ordering and row count
    Info {
        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
