use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{errors::AppError, local::AppLocal};
use crate::notes::{self, Embedding, NoteCreate, NoteRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

impl AppLocal {
    /// Every note, pretty-printed in the same format as the notes file.
    pub fn export_json(&self) -> Result<String, AppError> {
        let notes = self.note_mgr.corpus()?;
        Ok(serde_json::to_string_pretty(&notes)?)
    }

    /// Every note as a dated markdown section, newest first.
    pub fn export_markdown(&self) -> Result<String, AppError> {
        let notes = self.note_mgr.corpus()?;

        Ok(notes
            .iter()
            .map(|note| {
                format!(
                    "## {}\n\n{}\n\n---",
                    note.created_at.format("%Y-%m-%d"),
                    note.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Merges a JSON array of notes into the store.
    ///
    /// Records need content and a timestamp; ids that are already stored are
    /// left untouched. Embeddings are kept as exported.
    pub fn import_json(&self, data: &[u8]) -> Result<ImportReport, AppError> {
        let records = notes::parse_records(data)?;
        let total = records.len();

        let candidates = records
            .into_iter()
            .filter(NoteRecord::has_timestamp)
            .filter_map(NoteRecord::into_note)
            .collect::<Vec<_>>();

        let imported = self.note_mgr.insert_many(candidates)?;
        log::info!("imported {imported} of {total} notes");

        Ok(ImportReport {
            imported,
            skipped: total - imported,
        })
    }

    /// Creates one note per non-empty markdown file, without embeddings.
    ///
    /// Run a backfill afterwards to make them take part in relatedness.
    pub fn import_markdown<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ImportReport, AppError> {
        let mut report = ImportReport::default();

        for path in paths {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path)?;

            if content.trim().is_empty() {
                log::debug!("skipping empty file {}", path.display());
                report.skipped += 1;
                continue;
            }

            self.note_mgr.create(NoteCreate {
                content,
                embedding: Embedding::None,
            })?;
            report.imported += 1;
        }

        log::info!("imported {} markdown files", report.imported);
        Ok(report)
    }
}
