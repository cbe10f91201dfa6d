use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fileseek")]
#[command(about = "Local file indexing, search and duplicate detection", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rebuild the index from a full rescan of a directory tree
    Index(IndexArgs),
    /// Search the index for file names containing a keyword
    Search(SearchArgs),
    /// Find byte-identical files in the index
    Dupes(DupesArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Root directory to scan
    pub root: PathBuf,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Keyword to match against indexed file names (case-insensitive)
    pub keyword: String,
    /// Rebuild the index for this root first if it has no entries under it
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DupesArgs {
    /// Only consider entries under this path
    pub prefix: Option<PathBuf>,
    /// Minimum file size in bytes (default from config, 1 MiB out of the box)
    #[arg(long)]
    pub min_size: Option<u64>,
}
