use rusqlite::Connection;

use crate::error::{InkdexError, Result};

use super::SqlitePostingStore;

const MIGRATION_SCHEMA_SQL: &str = r"
    PRAGMA journal_mode = WAL;
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS words (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        value TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS word_locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        word_id INTEGER NOT NULL,
        document_id INTEGER NOT NULL,
        position INTEGER NOT NULL,
        FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE,
        UNIQUE(word_id, document_id, position)
    );

    CREATE INDEX IF NOT EXISTS idx_word_locations_document
    ON word_locations(document_id);

    CREATE TABLE IF NOT EXISTS index_state (
        document_id INTEGER PRIMARY KEY,
        content_hash TEXT NOT NULL,
        indexed_at TEXT NOT NULL
    );
";

impl SqlitePostingStore {
    pub fn migrate(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(MIGRATION_SCHEMA_SQL)?;
            ensure_required_column(
                conn,
                "word_locations",
                "position",
                "unsupported word_locations schema: position is missing; clear the index database",
            )?;
            ensure_required_column(
                conn,
                "index_state",
                "content_hash",
                "unsupported index_state schema: content_hash is missing; clear the index database",
            )?;
            Ok(())
        })
    }
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        if row? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ensure_required_column(
    conn: &Connection,
    table: &str,
    column: &str,
    error_message: &'static str,
) -> Result<()> {
    if has_column(conn, table, column)? {
        Ok(())
    } else {
        Err(InkdexError::Validation(error_message.to_string()))
    }
}
