use std::collections::HashMap;
use std::path::Path;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::config::StoreBackend;
use crate::error::{InkdexError, Result};
use crate::models::{DocumentId, IndexStats, Posting, Word, WordId};

use super::{DocumentPositions, PostingStore};

#[derive(Clone)]
pub struct SqlitePostingStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqlitePostingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePostingStore").finish_non_exhaustive()
    }
}

impl SqlitePostingStore {
    pub(super) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| InkdexError::mutex_poisoned("sqlite"))?;
        f(&conn)
    }

    fn with_tx<T>(&self, f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| InkdexError::mutex_poisoned("sqlite"))?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        drop(conn);
        Ok(value)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::from_connection(Connection::open(path)?)?;
        #[cfg(unix)]
        harden_sqlite_permissions(path)?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }
}

impl PostingStore for SqlitePostingStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }

    fn lookup_word(&self, value: &str) -> Result<Option<WordId>> {
        self.with_conn(|conn| select_word_id(conn, value))
    }

    fn resolve_or_create_word(&self, value: &str) -> Result<WordId> {
        self.with_conn(|conn| {
            if let Some(word_id) = select_word_id(conn, value)? {
                return Ok(word_id);
            }
            match conn.execute("INSERT INTO words(value) VALUES (?1)", params![value]) {
                Ok(_) => Ok(WordId(conn.last_insert_rowid())),
                Err(err) if is_unique_violation(&err) => {
                    // Another connection to the same database created it first.
                    tracing::warn!(word = value, "word row already exists; reusing it");
                    select_word_id(conn, value)?.ok_or_else(|| {
                        InkdexError::Internal(format!(
                            "word {value:?} rejected as duplicate but not found"
                        ))
                    })
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    fn words(&self) -> Result<Vec<Word>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, value FROM words ORDER BY id ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok(Word {
                    id: WordId(row.get(0)?),
                    value: row.get(1)?,
                })
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    fn insert_postings(
        &self,
        document_id: DocumentId,
        postings: &[(WordId, u32)],
    ) -> Result<usize> {
        if postings.is_empty() {
            return Ok(0);
        }
        self.with_tx(|tx| {
            let mut stmt = tx.prepare_cached(
                r"
                INSERT INTO word_locations(word_id, document_id, position)
                VALUES (?1, ?2, ?3)
                ",
            )?;
            for (word_id, position) in postings {
                stmt.execute(params![word_id.0, document_id.0, position])?;
            }
            Ok(postings.len())
        })
    }

    fn has_postings(&self, document_id: DocumentId) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM word_locations WHERE document_id = ?1 LIMIT 1",
                    params![document_id.0],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            Ok(exists)
        })
    }

    fn delete_postings(&self, document_id: DocumentId) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM word_locations WHERE document_id = ?1",
                params![document_id.0],
            )?;
            Ok(removed)
        })
    }

    fn posting_list(&self, word_id: WordId) -> Result<Vec<DocumentPositions>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                r"
                SELECT document_id, position
                FROM word_locations
                WHERE word_id = ?1
                ORDER BY document_id ASC, position ASC
                ",
            )?;
            let rows = stmt.query_map(params![word_id.0], |row| {
                Ok((DocumentId(row.get(0)?), row.get::<_, u32>(1)?))
            })?;
            let mut out = Vec::<DocumentPositions>::new();
            for row in rows {
                let (document_id, position) = row?;
                match out.last_mut() {
                    Some(last) if last.document_id == document_id => last.positions.push(position),
                    _ => out.push(DocumentPositions {
                        document_id,
                        positions: vec![position],
                    }),
                }
            }
            Ok(out)
        })
    }

    fn postings_for_document(&self, document_id: DocumentId) -> Result<Vec<Posting>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT id, word_id, position
                FROM word_locations
                WHERE document_id = ?1
                ORDER BY position ASC, id ASC
                ",
            )?;
            let rows = stmt.query_map(params![document_id.0], |row| {
                Ok(Posting {
                    id: row.get(0)?,
                    word_id: WordId(row.get(1)?),
                    document_id,
                    position: row.get(2)?,
                })
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    fn term_counts(&self, document_id: DocumentId) -> Result<HashMap<String, u32>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT w.value, COUNT(*)
                FROM word_locations l
                JOIN words w ON w.id = l.word_id
                WHERE l.document_id = ?1
                GROUP BY w.value
                ",
            )?;
            let rows = stmt.query_map(params![document_id.0], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })?;
            let mut out = HashMap::new();
            for row in rows {
                let (value, count) = row?;
                out.insert(value, count);
            }
            Ok(out)
        })
    }

    fn indexed_documents(&self) -> Result<Vec<DocumentId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT document_id FROM word_locations ORDER BY document_id ASC",
            )?;
            let rows = stmt.query_map([], |row| Ok(DocumentId(row.get(0)?)))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    fn content_hash(&self, document_id: DocumentId) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let hash = conn
                .query_row(
                    "SELECT content_hash FROM index_state WHERE document_id = ?1",
                    params![document_id.0],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(hash)
        })
    }

    fn set_content_hash(&self, document_id: DocumentId, content_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r"
                INSERT INTO index_state(document_id, content_hash, indexed_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(document_id) DO UPDATE SET
                  content_hash = excluded.content_hash,
                  indexed_at = excluded.indexed_at
                ",
                params![document_id.0, content_hash, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
    }

    fn remove_content_hash(&self, document_id: DocumentId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM index_state WHERE document_id = ?1",
                params![document_id.0],
            )?;
            Ok(())
        })
    }

    fn tracked_documents(&self) -> Result<Vec<DocumentId>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT document_id FROM index_state ORDER BY document_id ASC")?;
            let rows = stmt.query_map([], |row| Ok(DocumentId(row.get(0)?)))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    fn prune_orphan_words(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                r"
                DELETE FROM words
                WHERE NOT EXISTS (
                    SELECT 1 FROM word_locations l WHERE l.word_id = words.id
                )
                ",
                [],
            )?;
            Ok(removed)
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM word_locations", [])?;
            tx.execute("DELETE FROM words", [])?;
            tx.execute("DELETE FROM index_state", [])?;
            Ok(())
        })
    }

    fn stats(&self) -> Result<IndexStats> {
        self.with_conn(|conn| {
            let (words, postings, documents) = conn.query_row(
                r"
                SELECT
                  (SELECT COUNT(*) FROM words),
                  (SELECT COUNT(*) FROM word_locations),
                  (SELECT COUNT(DISTINCT document_id) FROM word_locations)
                ",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )?;
            Ok(IndexStats {
                words: i64_to_usize_saturating(words),
                postings: i64_to_usize_saturating(postings),
                documents: i64_to_usize_saturating(documents),
            })
        })
    }
}

fn select_word_id(conn: &Connection, value: &str) -> Result<Option<WordId>> {
    let id = conn
        .query_row(
            "SELECT id FROM words WHERE value = ?1",
            params![value],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id.map(WordId))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

fn i64_to_usize_saturating(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

#[cfg(unix)]
fn harden_sqlite_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for suffix in ["", "-wal", "-shm"] {
        let mut os = path.as_os_str().to_os_string();
        os.push(suffix);
        let candidate = PathBuf::from(os);
        if candidate.exists() {
            std::fs::set_permissions(candidate, std::fs::Permissions::from_mode(0o600))?;
        }
    }
    Ok(())
}
