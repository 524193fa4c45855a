use std::sync::Arc;

use tempfile::{TempDir, tempdir};

use crate::models::{DocumentId, WordId};

use super::*;

fn backends() -> Vec<(Option<TempDir>, Arc<dyn PostingStore>)> {
    let temp = tempdir().expect("tempdir");
    let sqlite = open_store(StoreBackend::Sqlite, temp.path()).expect("open sqlite");
    let memory = open_store(StoreBackend::Memory, temp.path()).expect("open memory");
    vec![(Some(temp), sqlite), (None, memory)]
}

#[test]
fn resolve_or_create_is_idempotent_per_value() {
    for (_guard, store) in backends() {
        assert_eq!(store.lookup_word("cat").expect("lookup"), None);
        let first = store.resolve_or_create_word("cat").expect("create");
        let second = store.resolve_or_create_word("cat").expect("resolve");
        let other = store.resolve_or_create_word("dog").expect("create dog");
        assert_eq!(first, second, "{:?}", store.backend());
        assert_ne!(first, other);
        assert_eq!(store.lookup_word("cat").expect("lookup"), Some(first));
        assert_eq!(store.words().expect("words").len(), 2);
    }
}

#[test]
fn posting_list_groups_positions_by_document_in_order() {
    for (_guard, store) in backends() {
        let cat = store.resolve_or_create_word("cat").expect("cat");
        let dog = store.resolve_or_create_word("dog").expect("dog");
        store
            .insert_postings(DocumentId(9), &[(cat, 4), (dog, 5), (cat, 1)])
            .expect("insert 9");
        store
            .insert_postings(DocumentId(2), &[(cat, 0)])
            .expect("insert 2");

        let list = store.posting_list(cat).expect("posting list");
        assert_eq!(
            list,
            vec![
                DocumentPositions {
                    document_id: DocumentId(2),
                    positions: vec![0],
                },
                DocumentPositions {
                    document_id: DocumentId(9),
                    positions: vec![1, 4],
                },
            ],
            "{:?}",
            store.backend()
        );
        assert!(store.posting_list(WordId(999)).expect("unknown").is_empty());
    }
}

#[test]
fn delete_postings_only_touches_one_document() {
    for (_guard, store) in backends() {
        let cat = store.resolve_or_create_word("cat").expect("cat");
        store
            .insert_postings(DocumentId(1), &[(cat, 0), (cat, 3)])
            .expect("insert 1");
        store
            .insert_postings(DocumentId(2), &[(cat, 0)])
            .expect("insert 2");

        assert!(store.has_postings(DocumentId(1)).expect("has 1"));
        assert_eq!(store.delete_postings(DocumentId(1)).expect("delete"), 2);
        assert!(!store.has_postings(DocumentId(1)).expect("has 1"));
        assert!(store.has_postings(DocumentId(2)).expect("has 2"));
        assert_eq!(store.delete_postings(DocumentId(1)).expect("delete again"), 0);
        assert_eq!(store.indexed_documents().expect("docs"), vec![DocumentId(2)]);
        assert_eq!(store.lookup_word("cat").expect("lookup"), Some(cat));
    }
}

#[test]
fn postings_for_document_are_ordered_by_position() {
    for (_guard, store) in backends() {
        let cat = store.resolve_or_create_word("cat").expect("cat");
        let sat = store.resolve_or_create_word("sat").expect("sat");
        store
            .insert_postings(DocumentId(5), &[(sat, 1), (cat, 0)])
            .expect("insert");
        let postings = store.postings_for_document(DocumentId(5)).expect("postings");
        let pairs = postings
            .iter()
            .map(|posting| (posting.word_id, posting.position))
            .collect::<Vec<_>>();
        assert_eq!(pairs, vec![(cat, 0), (sat, 1)]);
        assert!(postings.iter().all(|p| p.document_id == DocumentId(5)));
    }
}

#[test]
fn term_counts_report_occurrences_per_word() {
    for (_guard, store) in backends() {
        let cat = store.resolve_or_create_word("cat").expect("cat");
        let dog = store.resolve_or_create_word("dog").expect("dog");
        store
            .insert_postings(DocumentId(1), &[(cat, 0), (dog, 1), (cat, 2)])
            .expect("insert");
        let counts = store.term_counts(DocumentId(1)).expect("counts");
        assert_eq!(counts.get("cat"), Some(&2));
        assert_eq!(counts.get("dog"), Some(&1));
        assert!(store.term_counts(DocumentId(3)).expect("empty").is_empty());
    }
}

#[test]
fn prune_removes_only_orphaned_words() {
    for (_guard, store) in backends() {
        let cat = store.resolve_or_create_word("cat").expect("cat");
        let dog = store.resolve_or_create_word("dog").expect("dog");
        store
            .insert_postings(DocumentId(1), &[(cat, 0)])
            .expect("insert 1");
        store
            .insert_postings(DocumentId(2), &[(dog, 0)])
            .expect("insert 2");
        store.delete_postings(DocumentId(2)).expect("delete");

        assert_eq!(store.prune_orphan_words().expect("prune"), 1);
        assert_eq!(store.lookup_word("dog").expect("dog"), None);
        assert_eq!(store.lookup_word("cat").expect("cat"), Some(cat));
        assert_eq!(store.prune_orphan_words().expect("prune again"), 0);
    }
}

#[test]
fn clear_drops_words_postings_and_manifest() {
    for (_guard, store) in backends() {
        let cat = store.resolve_or_create_word("cat").expect("cat");
        store
            .insert_postings(DocumentId(1), &[(cat, 0)])
            .expect("insert");
        store.set_content_hash(DocumentId(1), "h1").expect("hash");

        store.clear().expect("clear");
        assert_eq!(store.stats().expect("stats"), IndexStats::default());
        assert!(store.tracked_documents().expect("tracked").is_empty());
        assert_eq!(store.lookup_word("cat").expect("lookup"), None);
    }
}

#[test]
fn manifest_hashes_upsert_and_remove() {
    for (_guard, store) in backends() {
        store.set_content_hash(DocumentId(4), "h1").expect("set");
        store.set_content_hash(DocumentId(4), "h2").expect("update");
        store.set_content_hash(DocumentId(1), "h3").expect("set other");
        assert_eq!(
            store.content_hash(DocumentId(4)).expect("get").as_deref(),
            Some("h2")
        );
        assert_eq!(
            store.tracked_documents().expect("tracked"),
            vec![DocumentId(1), DocumentId(4)]
        );
        store.remove_content_hash(DocumentId(4)).expect("remove");
        assert_eq!(store.content_hash(DocumentId(4)).expect("get"), None);
    }
}

#[test]
fn stats_count_words_postings_and_documents() {
    for (_guard, store) in backends() {
        let cat = store.resolve_or_create_word("cat").expect("cat");
        let dog = store.resolve_or_create_word("dog").expect("dog");
        store
            .insert_postings(DocumentId(1), &[(cat, 0), (dog, 1)])
            .expect("insert 1");
        store
            .insert_postings(DocumentId(2), &[(cat, 0)])
            .expect("insert 2");
        assert_eq!(
            store.stats().expect("stats"),
            IndexStats {
                words: 2,
                postings: 3,
                documents: 2,
            }
        );
    }
}

#[test]
fn sqlite_store_persists_across_reopen() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join(SQLITE_FILE_NAME);
    let cat = {
        let store = SqlitePostingStore::open(&path).expect("open");
        let cat = store.resolve_or_create_word("cat").expect("cat");
        store
            .insert_postings(DocumentId(3), &[(cat, 0)])
            .expect("insert");
        cat
    };

    let reopened = SqlitePostingStore::open(&path).expect("reopen");
    assert_eq!(reopened.lookup_word("cat").expect("lookup"), Some(cat));
    assert!(reopened.has_postings(DocumentId(3)).expect("has"));
}

#[test]
fn sqlite_connections_sharing_a_file_never_duplicate_words() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join(SQLITE_FILE_NAME);
    SqlitePostingStore::open(&path).expect("create schema");

    let handles = (0..4)
        .map(|_| {
            let path = path.clone();
            std::thread::spawn(move || {
                let store = SqlitePostingStore::open(&path).expect("open");
                ["alpha", "beta", "gamma"]
                    .iter()
                    .map(|value| store.resolve_or_create_word(value).expect("resolve"))
                    .collect::<Vec<_>>()
            })
        })
        .collect::<Vec<_>>();
    let resolved = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .collect::<Vec<_>>();

    assert!(resolved.windows(2).all(|pair| pair[0] == pair[1]));
    let store = SqlitePostingStore::open(&path).expect("open");
    assert_eq!(store.words().expect("words").len(), 3);
}

#[cfg(unix)]
#[test]
fn open_hardens_index_db_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().expect("tempdir");
    let db_path = temp.path().join(SQLITE_FILE_NAME);
    SqlitePostingStore::open(&db_path).expect("open failed");

    let mode = std::fs::metadata(&db_path)
        .expect("metadata")
        .permissions()
        .mode()
        & 0o777;
    assert_eq!(mode, 0o600);
}
