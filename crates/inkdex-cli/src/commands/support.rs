use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;

pub(super) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

/// `--articles-root` when given, else the directory holding the file.
pub(super) fn article_root_for(file: &Path, articles_root: Option<&Path>) -> PathBuf {
    match articles_root {
        Some(root) => root.to_path_buf(),
        None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
    }
}

pub(super) fn normalize_excludes(values: &[String]) -> Vec<String> {
    let mut globs = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    globs.sort();
    globs.dedup();
    globs
}
