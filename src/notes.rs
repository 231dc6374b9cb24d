use crate::{
    eid::Eid,
    storage::{BackendLocal, StorageManager},
};
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashSet,
    path::Path,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Instant,
};

const NOTES_FILE: &str = "notes.json";

/// Page size used by listings when no explicit limit is given.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Embedding vector attached to a note, if one has been generated.
///
/// Stored as `null` or a plain array of numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<f32>>", into = "Option<Vec<f32>>")]
pub enum Embedding {
    #[default]
    None,
    Vector(Vec<f32>),
}

impl Embedding {
    pub fn as_slice(&self) -> Option<&[f32]> {
        match self {
            Embedding::None => None,
            Embedding::Vector(v) => Some(v),
        }
    }

    pub fn is_some(&self) -> bool {
        matches!(self, Embedding::Vector(_))
    }

    pub fn dimensions(&self) -> usize {
        self.as_slice().map(<[f32]>::len).unwrap_or(0)
    }
}

impl From<Option<Vec<f32>>> for Embedding {
    fn from(value: Option<Vec<f32>>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Embedding::Vector(v),
            _ => Embedding::None,
        }
    }
}

impl From<Embedding> for Option<Vec<f32>> {
    fn from(value: Embedding) -> Self {
        match value {
            Embedding::None => None,
            Embedding::Vector(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Eid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub embedding: Embedding,
    #[serde(default)]
    pub view_count: u64,
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Note {
    pub fn new(content: impl Into<String>, embedding: Embedding) -> Self {
        Note {
            id: Eid::new(),
            content: content.into(),
            created_at: Utc::now(),
            embedding,
            view_count: 0,
        }
    }
}

/// Loosely-typed note as found in stored or imported JSON.
///
/// Older files carry numeric ids, missing timestamps or garbage in the
/// embedding field; [`NoteRecord::into_note`] repairs what it can and drops
/// records without usable content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub embedding: Option<Value>,
    #[serde(default)]
    pub view_count: Option<Value>,
}

impl NoteRecord {
    pub fn has_timestamp(&self) -> bool {
        matches!(&self.created_at, Some(v) if !v.is_null())
    }

    pub fn into_note(self) -> Option<Note> {
        let content = match self.content {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => return None,
        };

        let id = match self.id {
            Some(Value::String(s)) if !s.is_empty() => Eid::from(s),
            Some(Value::Number(n)) => Eid::from(n.to_string()),
            _ => Eid::new(),
        };

        let created_at = self
            .created_at
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let embedding: Embedding = match self.embedding {
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect::<Option<Vec<f32>>>()
                .into(),
            _ => Embedding::None,
        };

        let view_count = self.view_count.as_ref().and_then(Value::as_u64).unwrap_or(0);

        Some(Note {
            id,
            content,
            created_at,
            embedding,
            view_count,
        })
    }
}

/// Parses a JSON document holding an array of note records.
pub fn parse_records(data: &[u8]) -> anyhow::Result<Vec<NoteRecord>> {
    let value: Value = serde_json::from_slice(data).context("notes file is not valid json")?;
    let Value::Array(items) = value else {
        return Err(anyhow!("notes file must contain a json array"));
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<NoteRecord>(item).ok())
        .collect())
}

/// Parses and normalizes stored notes, dropping unusable records.
pub fn normalize_notes(data: &[u8]) -> anyhow::Result<Vec<Note>> {
    Ok(parse_records(data)?
        .into_iter()
        .filter_map(NoteRecord::into_note)
        .collect())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NoteCreate {
    pub content: String,
    #[serde(default)]
    pub embedding: Embedding,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Time,
    Random,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against note content
    #[serde(default)]
    pub keyword: Option<String>,

    #[serde(default)]
    pub sort: SortMode,

    #[serde(default)]
    pub offset: usize,

    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
#[error("note {0} not found")]
pub struct NoteNotFound(pub Eid);

#[derive(Debug, thiserror::Error)]
#[error("note content is empty")]
pub struct EmptyContent;

pub trait NoteManager: Send + Sync {
    /// Snapshot of every stored note in stable storage order (newest first).
    fn corpus(&self) -> anyhow::Result<Vec<Note>>;
    fn get(&self, id: &Eid) -> anyhow::Result<Option<Note>>;
    fn search(&self, query: SearchQuery) -> anyhow::Result<Vec<Note>>;
    fn create(&self, note: NoteCreate) -> anyhow::Result<Note>;
    fn update(&self, id: &Eid, update: NoteUpdate) -> anyhow::Result<Note>;
    fn delete(&self, id: &Eid) -> anyhow::Result<bool>;
    /// Appends notes whose ids are not stored yet. Returns how many were added.
    fn insert_many(&self, notes: Vec<Note>) -> anyhow::Result<usize>;
}

/// Notes kept in memory and mirrored to a single `notes.json` file.
#[derive(Clone)]
pub struct BackendJson {
    list: Arc<RwLock<Vec<Note>>>,
    storage: Arc<dyn StorageManager>,
}

impl BackendJson {
    pub fn load(base_path: &Path) -> anyhow::Result<Self> {
        let storage = BackendLocal::new(base_path)
            .with_context(|| format!("couldnt create {}", base_path.display()))?;
        Self::with_storage(Arc::new(storage))
    }

    pub fn with_storage(storage: Arc<dyn StorageManager>) -> anyhow::Result<Self> {
        if !storage.exists(NOTES_FILE) {
            log::info!(
                "Creating new notes file at {}",
                storage.base_dir().join(NOTES_FILE).display()
            );
            storage.write(NOTES_FILE, b"[]")?;
        }

        let now = Instant::now();
        let data = storage.read(NOTES_FILE)?;
        let notes = normalize_notes(&data)?;

        log::debug!(
            "took {}ms to read {} notes",
            now.elapsed().as_micros() as f64 / 1000.0,
            notes.len()
        );

        Ok(BackendJson {
            list: Arc::new(RwLock::new(notes)),
            storage,
        })
    }

    fn read_list(&self) -> anyhow::Result<RwLockReadGuard<'_, Vec<Note>>> {
        self.list
            .read()
            .map_err(|_| anyhow!("notes lock poisoned"))
    }

    fn write_list(&self) -> anyhow::Result<RwLockWriteGuard<'_, Vec<Note>>> {
        self.list
            .write()
            .map_err(|_| anyhow!("notes lock poisoned"))
    }

    fn save(&self, notes: &[Note]) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(notes)?;
        self.storage
            .write(NOTES_FILE, &data)
            .context("couldnt write notes file")
    }
}

impl NoteManager for BackendJson {
    fn corpus(&self) -> anyhow::Result<Vec<Note>> {
        Ok(self.read_list()?.clone())
    }

    fn get(&self, id: &Eid) -> anyhow::Result<Option<Note>> {
        Ok(self.read_list()?.iter().find(|n| &n.id == id).cloned())
    }

    fn search(&self, query: SearchQuery) -> anyhow::Result<Vec<Note>> {
        let notes = self.read_list()?;

        let keyword = query
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);

        let mut output = notes
            .iter()
            .filter(|n| match &keyword {
                Some(keyword) => n.content.to_lowercase().contains(keyword),
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();
        drop(notes);

        // random order only makes sense when browsing, not when searching
        if query.sort == SortMode::Random && keyword.is_none() {
            output.shuffle(&mut rand::rng());
        } else {
            output.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(output.into_iter().skip(query.offset).take(limit).collect())
    }

    fn create(&self, note: NoteCreate) -> anyhow::Result<Note> {
        let content = note.content.trim();
        if content.is_empty() {
            return Err(EmptyContent.into());
        }

        let note = Note::new(content, note.embedding);

        let mut notes = self.write_list()?;
        notes.insert(0, note.clone());
        self.save(&notes)?;

        Ok(note)
    }

    fn update(&self, id: &Eid, update: NoteUpdate) -> anyhow::Result<Note> {
        let mut notes = self.write_list()?;

        let note = notes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| NoteNotFound(id.clone()))?;

        if let Some(content) = update.content {
            let content = content.trim();
            if content.is_empty() {
                return Err(EmptyContent.into());
            }
            note.content = content.to_string();
        }

        if let Some(embedding) = update.embedding {
            note.embedding = embedding;
        }

        if let Some(view_count) = update.view_count {
            note.view_count = view_count;
        }

        let result = note.clone();
        self.save(&notes)?;

        Ok(result)
    }

    fn delete(&self, id: &Eid) -> anyhow::Result<bool> {
        let mut notes = self.write_list()?;
        let Some(idx) = notes.iter().position(|n| &n.id == id) else {
            return Ok(false);
        };

        notes.remove(idx);
        self.save(&notes)?;

        Ok(true)
    }

    fn insert_many(&self, new_notes: Vec<Note>) -> anyhow::Result<usize> {
        let mut notes = self.write_list()?;
        let mut existing = notes.iter().map(|n| n.id.clone()).collect::<HashSet<_>>();

        let mut count = 0;
        for note in new_notes {
            if existing.insert(note.id.clone()) {
                notes.push(note);
                count += 1;
            }
        }

        if count > 0 {
            self.save(&notes)?;
        }

        Ok(count)
    }
}
