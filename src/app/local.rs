use crate::{
    config::Config,
    eid::Eid,
    embeddings::{self, EmbeddingProvider},
    notes::{self, BackendJson, Embedding, Note, NoteCreate, NoteManager, NoteUpdate, SearchQuery},
    related::{Related, RelatednessEngine},
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use super::errors::AppError;

/// Pause between consecutive remote embedding calls during a backfill
pub const BACKFILL_PAUSE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub embedded: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Notes that had no embedding when the backfill started
    pub pending: usize,
    pub embedded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct BackfillOpts {
    pub pause: Duration,
    pub show_progress: bool,
}

impl Default for BackfillOpts {
    fn default() -> Self {
        Self {
            pause: BACKFILL_PAUSE,
            show_progress: true,
        }
    }
}

/// A note opened for reading, with the notes related to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteView {
    pub note: Note,
    pub related: Vec<Related>,
}

pub struct AppLocal {
    pub note_mgr: Arc<dyn NoteManager>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    engine: RelatednessEngine,
    config: Config,
}

impl AppLocal {
    /// Opens the notes stored under the config's base path.
    ///
    /// A provider that fails to initialize is logged and skipped: notes can
    /// still be written, they just won't get embeddings.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let note_mgr = Arc::new(BackendJson::load(config.base_path())?);

        let embedder = match embeddings::from_config(&config.embedding, config.base_path()) {
            Ok(embedder) => embedder,
            Err(err) => {
                log::warn!("embeddings disabled: {err}");
                None
            }
        };

        Ok(Self::new_with(note_mgr, embedder, config))
    }

    pub fn new_with(
        note_mgr: Arc<dyn NoteManager>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: Config,
    ) -> Self {
        Self {
            note_mgr,
            embedder,
            engine: RelatednessEngine::new(config.relatedness.clone()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    /// Embeds `content`, logging instead of failing when the provider errors.
    fn try_embed(&self, content: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;

        match embeddings::embed_content(embedder.as_ref(), content) {
            Ok(vector) => Some(vector),
            Err(err) => {
                log::error!("embedding failed with {}: {err}", embedder.name());
                None
            }
        }
    }

    pub fn create(&self, content: &str) -> Result<Note, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::EmptyContent);
        }

        let embedding = self.try_embed(content).into();
        let note = self.note_mgr.create(NoteCreate {
            content: content.to_string(),
            embedding,
        })?;

        log::info!("created note {} (embedded: {})", note.id, note.embedding.is_some());
        Ok(note)
    }

    /// Replaces a note's content and re-embeds it.
    ///
    /// If embedding is unavailable the previous vector is kept.
    pub fn update(&self, id: &Eid, content: &str) -> Result<Note, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::EmptyContent);
        }

        self.get(id)?;

        let update = NoteUpdate {
            content: Some(content.to_string()),
            embedding: self.try_embed(content).map(Embedding::Vector),
            ..Default::default()
        };

        Ok(self.note_mgr.update(id, update)?)
    }

    pub fn delete(&self, id: &Eid) -> Result<(), AppError> {
        if self.note_mgr.delete(id)? {
            Ok(())
        } else {
            Err(AppError::NotFound(id.clone()))
        }
    }

    pub fn get(&self, id: &Eid) -> Result<Note, AppError> {
        self.note_mgr
            .get(id)?
            .ok_or_else(|| AppError::NotFound(id.clone()))
    }

    pub fn search(&self, query: SearchQuery) -> Result<Vec<Note>, AppError> {
        Ok(self.note_mgr.search(query)?)
    }

    /// Notes related to the stored note `id`.
    pub fn related(&self, id: &Eid) -> Result<Vec<Related>, AppError> {
        let corpus = self.note_mgr.corpus()?;
        let target = corpus
            .iter()
            .find(|n| &n.id == id)
            .ok_or_else(|| AppError::NotFound(id.clone()))?;

        Ok(self.engine.compute_related(target, &corpus))
    }

    /// Opens a note: counts the view and computes its related notes.
    pub fn show(&self, id: &Eid) -> Result<NoteView, AppError> {
        let note = self.get(id)?;
        let note = self.note_mgr.update(
            id,
            NoteUpdate {
                view_count: Some(note.view_count + 1),
                ..Default::default()
            },
        )?;

        let related = self.related(id)?;
        Ok(NoteView { note, related })
    }

    pub fn stats(&self) -> Result<Stats, AppError> {
        let corpus = self.note_mgr.corpus()?;
        Ok(Stats {
            total: corpus.len(),
            embedded: corpus.iter().filter(|n| n.embedding.is_some()).count(),
        })
    }

    /// Checks the configured provider and returns its name and vector size.
    pub fn probe_embedder(&self) -> Result<(String, usize), AppError> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            embeddings::EmbeddingError::NotConfigured(
                "set embedding.api_key in config.yaml or SPARK_API_KEY".to_string(),
            )
        })?;

        let dimensions = embeddings::probe(embedder.as_ref())?;
        Ok((embedder.name().to_string(), dimensions))
    }

    /// Generates embeddings for every note that has none.
    ///
    /// Each success is saved right away; failures are counted and skipped.
    pub fn backfill(&self, opts: BackfillOpts) -> Result<BackfillReport, AppError> {
        let Some(embedder) = self.embedder.as_ref() else {
            return Err(embeddings::EmbeddingError::NotConfigured(
                "set embedding.api_key in config.yaml or SPARK_API_KEY".to_string(),
            )
            .into());
        };

        let pending = self
            .note_mgr
            .corpus()?
            .into_iter()
            .filter(|n| !n.embedding.is_some())
            .collect::<Vec<_>>();

        let mut report = BackfillReport {
            pending: pending.len(),
            ..Default::default()
        };

        log::info!("embedding {} notes with {}", pending.len(), embedder.name());

        let bar = if opts.show_progress {
            ProgressBar::new(pending.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for (idx, note) in pending.iter().enumerate() {
            if idx > 0 && !opts.pause.is_zero() {
                std::thread::sleep(opts.pause);
            }

            match embeddings::embed_content(embedder.as_ref(), &note.content) {
                Ok(vector) => {
                    let update = NoteUpdate {
                        embedding: Some(Embedding::Vector(vector)),
                        ..Default::default()
                    };
                    match self.note_mgr.update(&note.id, update) {
                        Ok(_) => report.embedded += 1,
                        // deleted in the meantime
                        Err(err) if err.is::<notes::NoteNotFound>() => report.failed += 1,
                        Err(err) => return Err(err.into()),
                    }
                }
                Err(err) => {
                    log::warn!("couldnt embed note {}: {err}", note.id);
                    report.failed += 1;
                    bar.set_message("(errors, continuing)");
                }
            }

            bar.inc(1);
        }

        bar.finish_and_clear();
        log::info!(
            "backfill done: {} embedded, {} failed",
            report.embedded,
            report.failed
        );

        Ok(report)
    }
}
