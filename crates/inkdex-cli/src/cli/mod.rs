use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod args;


pub use args::{AddArgs, LogsArgs, RemoveArgs, SearchArgs, SimilarArgs, SyncArgs};

#[derive(Debug, Parser)]
#[command(name = "inkdex")]
#[command(about = "Full-text search over a directory of markdown articles", version)]
pub struct Cli {
    #[arg(long, default_value = ".inkdex")]
    pub root: PathBuf,

    /// TOML engine config; `INKDEX_*` environment variables still override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index new and changed articles and drop deleted ones.
    Sync(SyncArgs),
    /// (Re)index a single article file.
    Add(AddArgs),
    /// Remove a document from the index.
    Rm(RemoveArgs),
    Search(SearchArgs),
    Similar(SimilarArgs),
    Stats,
    /// Drop words no document references.
    Prune,
    /// Drop every word, posting and sync record.
    Clear,
    /// Print the effective engine configuration.
    Config,
    /// Recent request log entries, newest first.
    Logs(LogsArgs),
}
