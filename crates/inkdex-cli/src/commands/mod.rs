use std::path::Path;

use anyhow::{Context, Result, bail};
use inkdex_core::models::DocumentId;
use inkdex_core::request_log::RequestLog;
use inkdex_core::{ArticleSource, EngineConfig, SearchEngine, SyncOptions};
use serde_json::json;

use crate::cli::Commands;

mod support;
mod validation;


use self::support::{article_root_for, normalize_excludes, print_json};
use self::validation::validate_command_preflight;

pub(crate) fn run_from_root(
    root: &Path,
    config_path: Option<&Path>,
    command: Commands,
) -> Result<()> {
    validate_command_preflight(&command)?;

    let config = EngineConfig::load(config_path).with_context(|| match config_path {
        Some(path) => format!("failed to load config {}", path.display()),
        None => "failed to load config from environment".to_string(),
    })?;
    if matches!(command, Commands::Config) {
        return print_json(&config);
    }

    let engine = SearchEngine::open(root, &config)
        .with_context(|| format!("failed to open index at {}", root.display()))?;
    run_validated(&engine, root, command)
}

fn run_validated(engine: &SearchEngine, root: &Path, command: Commands) -> Result<()> {
    match command {
        Commands::Sync(args) => {
            let options = SyncOptions {
                exclude_globs: normalize_excludes(&args.exclude),
                include_hidden: args.include_hidden,
            };
            let report = engine.sync(&args.dir, &options)?;
            print_json(&report)?;
        }
        Commands::Add(args) => {
            let articles_root = article_root_for(&args.file, args.articles_root.as_deref());
            let source = ArticleSource::load(&articles_root, &args.file)?;
            let outcome = engine.rebuild_index(&source)?;
            engine
                .store()
                .set_content_hash(source.article.id, &source.content_hash)?;
            print_json(&json!({
                "document_id": source.article.id,
                "relative_path": source.relative_path,
                "outcome": outcome,
            }))?;
        }
        Commands::Rm(args) => {
            let document_id = DocumentId(args.document_id);
            let removed = engine.delete_index(document_id)?;
            engine.store().remove_content_hash(document_id)?;
            print_json(&json!({
                "document_id": document_id,
                "removed_postings": removed,
            }))?;
        }
        Commands::Search(args) => {
            let hits = engine.search(&args.query, args.limit, args.offset)?;
            print_json(&hits)?;
        }
        Commands::Similar(args) => {
            let similar = engine.similar_documents(DocumentId(args.document_id), args.limit)?;
            print_json(&similar)?;
        }
        Commands::Stats => {
            print_json(&engine.stats()?)?;
        }
        Commands::Prune => {
            let pruned = engine.prune_words()?;
            print_json(&json!({ "pruned_words": pruned }))?;
        }
        Commands::Clear => {
            engine.clear_index()?;
            print_json(&json!({ "cleared": true }))?;
        }
        Commands::Logs(args) => {
            let log = engine
                .request_log()
                .cloned()
                .unwrap_or_else(|| RequestLog::under_root(root));
            let entries = log.list(args.limit, args.operation.as_deref(), args.status.as_deref())?;
            print_json(&entries)?;
        }
        Commands::Config => {
            bail!("config is printed before the index is opened");
        }
    }
    Ok(())
}
