use serde::{Deserialize, Serialize};

use crate::config::RelatednessConfig;
use crate::notes::Note;

use super::candidates::select_candidates;
use super::threshold::select_related;

/// A note judged related to the target, with its similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Related {
    pub note: Note,
    pub similarity: f32,
}

/// Decides which notes of a corpus are related to a target note.
///
/// Holds nothing but its tunables: every call works on the snapshot it is
/// given and never mutates it.
#[derive(Debug, Clone, Default)]
pub struct RelatednessEngine {
    config: RelatednessConfig,
}

impl RelatednessEngine {
    pub fn new(config: RelatednessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RelatednessConfig {
        &self.config
    }

    /// Related notes for `target`, most similar first. Empty when the target
    /// has no embedding or nothing is convincing enough.
    pub fn compute_related(&self, target: &Note, corpus: &[Note]) -> Vec<Related> {
        if !target.embedding.is_some() {
            return vec![];
        }

        let candidates = select_candidates(target, corpus, self.config.noise_floor);
        let considered = candidates.len();
        let (decision, selected) = select_related(candidates, &self.config);

        log::debug!(
            "related notes for {}: {considered} candidates above floor, decision={decision:?}",
            target.id
        );

        selected
            .into_iter()
            .map(|c| Related {
                note: c.note.clone(),
                similarity: c.similarity,
            })
            .collect()
    }
}
