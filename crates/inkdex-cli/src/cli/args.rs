use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Directory holding `.md`/`.markdown` articles.
    pub dir: PathBuf,
    /// Skip paths (relative to `dir`) matching this glob. Repeatable.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,
    #[arg(long, default_value_t = false)]
    pub include_hidden: bool,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub file: PathBuf,
    /// Base directory for the path-derived document id. Defaults to the file's
    /// parent directory.
    #[arg(long)]
    pub articles_root: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    pub document_id: i64,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(allow_hyphen_values = true)]
    pub query: String,
    /// Defaults to the configured search limit.
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

#[derive(Debug, Args)]
pub struct SimilarArgs {
    pub document_id: i64,
    #[arg(long, default_value_t = 5)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct LogsArgs {
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
    #[arg(long)]
    pub operation: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
}
