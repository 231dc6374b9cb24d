use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app::{AppError, AppLocal, BackfillOpts};
use crate::config::Config;
use crate::eid::Eid;
use crate::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::notes::{BackendJson, Embedding, NoteManager};

const KEYWORDS: [&str; 4] = ["rust", "coffee", "music", "garden"];

/// Counts keyword occurrences, one dimension per keyword.
///
/// Content containing "FAIL" makes the call error out.
#[derive(Default)]
struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for KeywordEmbedder {
    fn name(&self) -> &str {
        "keywords"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if text.contains("FAIL") {
            return Err(EmbeddingError::Api("provider is down".to_string()));
        }

        let text = text.to_lowercase();
        Ok(KEYWORDS
            .iter()
            .map(|k| text.matches(k).count() as f32)
            .collect())
    }
}

/// Creates an isolated AppLocal using a unique temp directory.
pub fn create_app(embedder: Option<Arc<dyn EmbeddingProvider>>) -> (AppLocal, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let app = open_app(tmp.path(), embedder);
    (app, tmp)
}

fn open_app(path: &std::path::Path, embedder: Option<Arc<dyn EmbeddingProvider>>) -> AppLocal {
    let config = Config::load_with(path).expect("failed to load config");
    let note_mgr = Arc::new(BackendJson::load(path).expect("failed to load notes"));
    AppLocal::new_with(note_mgr, embedder, config)
}

fn quiet_backfill() -> BackfillOpts {
    BackfillOpts {
        pause: Duration::ZERO,
        show_progress: false,
    }
}

#[test]
pub fn test_create_embeds_note() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let (app, _tmp) = create_app(Some(embedder.clone()));

    let note = app.create("Rust and coffee").unwrap();
    assert_eq!(note.embedding, Embedding::Vector(vec![1.0, 1.0, 0.0, 0.0]));
    assert_eq!(embedder.calls(), 1);
}

#[test]
pub fn test_create_without_provider() {
    let (app, _tmp) = create_app(None);

    let note = app.create("no provider configured").unwrap();
    assert_eq!(note.embedding, Embedding::None);
    assert_eq!(app.stats().unwrap().total, 1);
    assert!(app.related(&note.id).unwrap().is_empty());
}

#[test]
pub fn test_embedding_failure_still_saves() {
    let (app, _tmp) = create_app(Some(Arc::new(KeywordEmbedder::default())));

    let note = app.create("FAIL to embed this").unwrap();
    assert_eq!(note.embedding, Embedding::None);
    assert_eq!(app.get(&note.id).unwrap().content, "FAIL to embed this");
}

#[test]
pub fn test_create_rejects_blank_content() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let (app, _tmp) = create_app(Some(embedder.clone()));

    assert!(matches!(app.create("  \n"), Err(AppError::EmptyContent)));
    assert_eq!(embedder.calls(), 0);
    assert_eq!(app.stats().unwrap().total, 0);
}

#[test]
pub fn test_edit_reembeds() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let (app, _tmp) = create_app(Some(embedder.clone()));

    let note = app.create("rust").unwrap();
    let edited = app.update(&note.id, "music music").unwrap();

    assert_eq!(edited.content, "music music");
    assert_eq!(edited.embedding, Embedding::Vector(vec![0.0, 0.0, 2.0, 0.0]));
    assert_eq!(embedder.calls(), 2);
}

#[test]
pub fn test_edit_keeps_old_embedding_when_provider_fails() {
    let (app, _tmp) = create_app(Some(Arc::new(KeywordEmbedder::default())));

    let note = app.create("garden").unwrap();
    let edited = app.update(&note.id, "garden FAIL").unwrap();

    assert_eq!(edited.content, "garden FAIL");
    assert_eq!(edited.embedding, note.embedding);
}

#[test]
pub fn test_edit_missing_note() {
    let (app, _tmp) = create_app(None);
    let err = app.update(&Eid::from("missing"), "text").unwrap_err();
    assert!(matches!(err, AppError::NotFound(id) if *id == "missing"));
}

#[test]
pub fn test_delete() {
    let (app, _tmp) = create_app(None);
    let note = app.create("short lived").unwrap();

    app.delete(&note.id).unwrap();
    assert!(matches!(app.get(&note.id), Err(AppError::NotFound(_))));
    assert!(matches!(app.delete(&note.id), Err(AppError::NotFound(_))));
}

#[test]
pub fn test_show_counts_views_and_relates() {
    let (app, _tmp) = create_app(Some(Arc::new(KeywordEmbedder::default())));

    let rust = app.create("rust rust").unwrap();
    let also_rust = app.create("more rust").unwrap();
    app.create("coffee").unwrap();

    let view = app.show(&rust.id).unwrap();
    assert_eq!(view.note.view_count, 1);
    assert_eq!(view.related.len(), 1);
    assert_eq!(view.related[0].note.id, also_rust.id);
    assert!((view.related[0].similarity - 1.0).abs() < 1e-6);

    let view = app.show(&rust.id).unwrap();
    assert_eq!(view.note.view_count, 2);
    assert_eq!(app.get(&rust.id).unwrap().view_count, 2);
}

#[test]
pub fn test_related_for_unknown_note() {
    let (app, _tmp) = create_app(None);
    assert!(matches!(
        app.related(&Eid::from("ghost")),
        Err(AppError::NotFound(_))
    ));
}

#[test]
pub fn test_backfill() {
    let (app, tmp) = create_app(None);
    app.create("rust").unwrap();
    app.create("coffee FAIL").unwrap();
    app.create("garden").unwrap();

    let embedder = Arc::new(KeywordEmbedder::default());
    let app = open_app(tmp.path(), Some(embedder.clone()));
    app.create("music").unwrap();

    let report = app.backfill(quiet_backfill()).unwrap();
    assert_eq!(report.pending, 3);
    assert_eq!(report.embedded, 2);
    assert_eq!(report.failed, 1);
    // one call for the create, three for the backfill
    assert_eq!(embedder.calls(), 4);

    let stats = app.stats().unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.embedded, 3);

    let reloaded = BackendJson::load(tmp.path()).unwrap();
    let embedded = reloaded
        .corpus()
        .unwrap()
        .iter()
        .filter(|n| n.embedding.is_some())
        .count();
    assert_eq!(embedded, 3);

    let report = app.backfill(quiet_backfill()).unwrap();
    assert_eq!(report.pending, 1);
    assert_eq!(report.failed, 1);
}

#[test]
pub fn test_backfill_requires_provider() {
    let (app, _tmp) = create_app(None);
    app.create("waiting for a provider").unwrap();

    assert!(matches!(
        app.backfill(quiet_backfill()),
        Err(AppError::Embedding(EmbeddingError::NotConfigured(_)))
    ));
}

#[test]
pub fn test_probe_embedder() {
    let (app, _tmp) = create_app(Some(Arc::new(KeywordEmbedder::default())));
    assert_eq!(
        app.probe_embedder().unwrap(),
        ("keywords".to_string(), KEYWORDS.len())
    );

    let (app, _tmp) = create_app(None);
    assert!(app.probe_embedder().is_err());
}

#[test]
pub fn test_import_json() {
    let (app, _tmp) = create_app(None);
    let existing = app.create("already stored").unwrap();

    let data = format!(
        r#"[
            {{"id": "{}", "content": "a copy of the stored note", "created_at": "2024-01-01T00:00:00Z"}},
            {{"id": "fresh", "content": "brand new", "created_at": "2024-02-01T08:30:00Z", "embedding": [0.1, 0.2], "view_count": 4}},
            {{"id": "undated", "content": "no timestamp"}},
            {{"id": "blank", "content": "", "created_at": "2024-02-01T08:30:00Z"}}
        ]"#,
        existing.id
    );

    let report = app.import_json(data.as_bytes()).unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 3);

    assert_eq!(app.get(&existing.id).unwrap().content, "already stored");
    let fresh = app.get(&Eid::from("fresh")).unwrap();
    assert_eq!(fresh.embedding, Embedding::Vector(vec![0.1, 0.2]));
    assert_eq!(fresh.view_count, 4);

    assert!(app.import_json(br#"{"notes": []}"#).is_err());
}

#[test]
pub fn test_export_then_import_elsewhere() {
    let (app, _tmp) = create_app(Some(Arc::new(KeywordEmbedder::default())));
    app.create("rust").unwrap();
    app.create("coffee").unwrap();

    let exported = app.export_json().unwrap();

    let (other, _other_tmp) = create_app(None);
    let report = other.import_json(exported.as_bytes()).unwrap();
    assert_eq!(report.imported, 2);

    let source = app.note_mgr.corpus().unwrap();
    let copied = other.note_mgr.corpus().unwrap();
    assert_eq!(source, copied);
    assert!(copied.iter().all(|n| n.embedding.is_some()));

    // importing the same file twice adds nothing
    let report = other.import_json(exported.as_bytes()).unwrap();
    assert_eq!(report.imported, 0);
    assert_eq!(report.skipped, 2);
}

#[test]
pub fn test_export_markdown() {
    let (app, _tmp) = create_app(None);
    assert_eq!(app.export_markdown().unwrap(), "");

    let first = app.create("first thought").unwrap();
    let second = app.create("second\nthought").unwrap();

    let expected = format!(
        "## {}\n\nsecond\nthought\n\n---\n## {}\n\nfirst thought\n\n---",
        second.created_at.format("%Y-%m-%d"),
        first.created_at.format("%Y-%m-%d"),
    );
    assert_eq!(app.export_markdown().unwrap(), expected);
}

#[test]
pub fn test_import_markdown() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let (app, tmp) = create_app(Some(embedder.clone()));

    let idea = tmp.path().join("idea.md");
    let empty = tmp.path().join("empty.md");
    std::fs::write(&idea, "# Garden\n\nplant more garden herbs\n").unwrap();
    std::fs::write(&empty, " \n\n").unwrap();

    let report = app.import_markdown(&[idea, empty]).unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(embedder.calls(), 0);

    let notes = app.note_mgr.corpus().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "# Garden\n\nplant more garden herbs");
    assert_eq!(notes[0].embedding, Embedding::None);

    let missing = tmp.path().join("missing.md");
    assert!(matches!(
        app.import_markdown(&[missing]),
        Err(AppError::IO(_))
    ));
}
