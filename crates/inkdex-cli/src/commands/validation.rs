use std::path::Path;

use anyhow::{Result, bail};

use crate::cli::Commands;

pub(super) fn validate_command_preflight(command: &Commands) -> Result<()> {
    match command {
        Commands::Sync(args) => validate_exclude_globs(&args.exclude),
        Commands::Add(args) => validate_article_file(&args.file),
        Commands::Rm(args) => validate_document_id(args.document_id),
        Commands::Search(args) => match args.limit {
            Some(limit) => validate_limit("--limit", limit),
            None => Ok(()),
        },
        Commands::Similar(args) => {
            validate_document_id(args.document_id)?;
            validate_limit("--limit", args.limit)
        }
        Commands::Logs(args) => validate_limit("--limit", args.limit),
        Commands::Stats | Commands::Prune | Commands::Clear | Commands::Config => Ok(()),
    }
}

fn validate_document_id(document_id: i64) -> Result<()> {
    if document_id <= 0 {
        bail!("document id must be positive, got {document_id}");
    }
    Ok(())
}

fn validate_limit(flag: &str, limit: usize) -> Result<()> {
    if limit == 0 {
        bail!("{flag} must be at least 1");
    }
    Ok(())
}

fn validate_exclude_globs(exclude: &[String]) -> Result<()> {
    if exclude.iter().any(|value| value.trim().is_empty()) {
        bail!("--exclude requires a non-empty glob");
    }
    Ok(())
}

fn validate_article_file(file: &Path) -> Result<()> {
    if !file.is_file() {
        bail!("article file not found: {}", file.display());
    }
    Ok(())
}
