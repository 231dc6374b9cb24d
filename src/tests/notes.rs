use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use crate::eid::Eid;
use crate::notes::{
    BackendJson, Embedding, Note, NoteCreate, NoteManager, NoteNotFound, NoteUpdate, SearchQuery,
    SortMode,
};
use crate::storage::{BackendLocal, StorageManager};

fn create_backend() -> (BackendJson, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let backend = BackendJson::load(tmp.path()).expect("failed to load notes");
    (backend, tmp)
}

fn create(backend: &BackendJson, content: &str) -> Note {
    backend
        .create(NoteCreate {
            content: content.to_string(),
            embedding: Embedding::None,
        })
        .unwrap()
}

/// Notes one day apart, oldest first.
fn dated_notes(count: usize) -> Vec<Note> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    (0..count)
        .map(|i| Note {
            id: Eid::from(format!("n{i}")),
            content: format!("thought number {i}"),
            created_at: start + Duration::days(i as i64),
            embedding: Embedding::None,
            view_count: 0,
        })
        .collect()
}

#[test]
pub fn test_new_store_is_empty() {
    let (backend, tmp) = create_backend();
    assert!(backend.corpus().unwrap().is_empty());
    assert_eq!(std::fs::read_to_string(tmp.path().join("notes.json")).unwrap(), "[]");
}

#[test]
pub fn test_create_prepends_and_trims() {
    let (backend, _tmp) = create_backend();
    let first = create(&backend, "first");
    let second = create(&backend, "  second\n");

    assert_eq!(second.content, "second");
    let corpus = backend.corpus().unwrap();
    assert_eq!(corpus, vec![second.clone(), first.clone()]);
    assert_eq!(backend.get(&first.id).unwrap().unwrap().content, "first");
}

#[test]
pub fn test_create_rejects_empty_content() {
    let (backend, _tmp) = create_backend();
    let err = backend
        .create(NoteCreate {
            content: "  \n ".to_string(),
            ..Default::default()
        })
        .unwrap_err();

    assert!(err.is::<crate::notes::EmptyContent>());
    assert!(backend.corpus().unwrap().is_empty());
}

#[test]
pub fn test_update_fields() {
    let (backend, _tmp) = create_backend();
    let note = create(&backend, "draft");

    let updated = backend
        .update(
            &note.id,
            NoteUpdate {
                content: Some("final".to_string()),
                embedding: Some(Embedding::Vector(vec![0.5, 0.5])),
                view_count: Some(3),
            },
        )
        .unwrap();

    assert_eq!(updated.content, "final");
    assert_eq!(updated.embedding, Embedding::Vector(vec![0.5, 0.5]));
    assert_eq!(updated.view_count, 3);
    assert_eq!(updated.created_at, note.created_at);

    let untouched = backend.update(&note.id, NoteUpdate::default()).unwrap();
    assert_eq!(untouched.content, "final");
    assert_eq!(untouched.embedding, Embedding::Vector(vec![0.5, 0.5]));
}

#[test]
pub fn test_update_missing_note() {
    let (backend, _tmp) = create_backend();
    let err = backend
        .update(&Eid::from("nope"), NoteUpdate::default())
        .unwrap_err();

    assert!(err.is::<NoteNotFound>());
}

#[test]
pub fn test_delete() {
    let (backend, _tmp) = create_backend();
    let keep = create(&backend, "keep");
    let drop = create(&backend, "drop");

    assert!(backend.delete(&drop.id).unwrap());
    assert!(!backend.delete(&drop.id).unwrap());
    assert_eq!(backend.corpus().unwrap(), vec![keep]);
}

#[test]
pub fn test_changes_survive_reload() {
    let (backend, tmp) = create_backend();
    let note = create(&backend, "persist me");
    backend
        .update(
            &note.id,
            NoteUpdate {
                embedding: Some(Embedding::Vector(vec![1.0, 2.0])),
                ..Default::default()
            },
        )
        .unwrap();

    let reloaded = BackendJson::load(tmp.path()).unwrap();
    let stored = reloaded.get(&note.id).unwrap().unwrap();
    assert_eq!(stored.content, "persist me");
    assert_eq!(stored.embedding, Embedding::Vector(vec![1.0, 2.0]));
}

#[test]
pub fn test_loads_legacy_file() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(BackendLocal::new(tmp.path()).unwrap());
    storage
        .write(
            "notes.json",
            br#"[{"id": 1700000000000, "content": "old note", "created_at": "2023-11-14T22:13:20Z", "embedding": null}]"#,
        )
        .unwrap();

    let backend = BackendJson::with_storage(storage).unwrap();
    let corpus = backend.corpus().unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(*corpus[0].id, "1700000000000");
    assert_eq!(corpus[0].view_count, 0);
}

#[test]
pub fn test_search_keyword_is_case_insensitive() {
    let (backend, _tmp) = create_backend();
    create(&backend, "Rust ownership rules");
    create(&backend, "coffee brewing ratios");
    create(&backend, "the borrow checker in RUST");

    let found = backend
        .search(SearchQuery {
            keyword: Some("rust".to_string()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|n| n.content.to_lowercase().contains("rust")));

    let blank = backend
        .search(SearchQuery {
            keyword: Some("   ".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(blank.len(), 3);
}

#[test]
pub fn test_search_pages_newest_first() {
    let (backend, _tmp) = create_backend();
    assert_eq!(backend.insert_many(dated_notes(5)).unwrap(), 5);

    let page = |offset, limit| {
        backend
            .search(SearchQuery {
                offset,
                limit: Some(limit),
                ..Default::default()
            })
            .unwrap()
            .into_iter()
            .map(|n| n.id.to_string())
            .collect::<Vec<_>>()
    };

    assert_eq!(page(0, 2), vec!["n4", "n3"]);
    assert_eq!(page(2, 2), vec!["n2", "n1"]);
    assert_eq!(page(4, 2), vec!["n0"]);
    assert!(page(10, 2).is_empty());
}

#[test]
pub fn test_random_sort() {
    let (backend, _tmp) = create_backend();
    backend.insert_many(dated_notes(6)).unwrap();

    let shuffled = backend
        .search(SearchQuery {
            sort: SortMode::Random,
            ..Default::default()
        })
        .unwrap();
    let ids = shuffled.iter().map(|n| n.id.clone()).collect::<HashSet<_>>();
    assert_eq!(ids.len(), 6);

    // a keyword search always comes back in time order
    let searched = backend
        .search(SearchQuery {
            keyword: Some("thought".to_string()),
            sort: SortMode::Random,
            ..Default::default()
        })
        .unwrap();
    let order = searched.iter().map(|n| n.id.to_string()).collect::<Vec<_>>();
    assert_eq!(order, vec!["n5", "n4", "n3", "n2", "n1", "n0"]);
}

#[test]
pub fn test_insert_many_skips_known_ids() {
    let (backend, _tmp) = create_backend();
    let existing = create(&backend, "already here");

    let mut incoming = dated_notes(2);
    incoming.push(Note {
        content: "replacement that must be ignored".to_string(),
        ..existing.clone()
    });
    incoming.push(dated_notes(1).remove(0));

    assert_eq!(backend.insert_many(incoming).unwrap(), 2);

    let corpus = backend.corpus().unwrap();
    assert_eq!(corpus.len(), 3);
    assert_eq!(corpus[0].content, "already here");
}
