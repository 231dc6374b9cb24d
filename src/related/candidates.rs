use crate::notes::Note;

use super::math::cosine_similarity;

/// A note scored against one target. Only valid for the query that built it.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub note: &'a Note,
    pub similarity: f32,
}

/// Scores every other embedded note against `target` and keeps those above
/// `noise_floor`, most similar first.
///
/// Ties keep corpus order, so a fixed corpus snapshot always yields the same
/// ranking.
pub fn select_candidates<'a>(target: &Note, corpus: &'a [Note], noise_floor: f32) -> Vec<Candidate<'a>> {
    let Some(query) = target.embedding.as_slice() else {
        return vec![];
    };

    let mut candidates = corpus
        .iter()
        .filter(|note| note.id != target.id)
        .filter_map(|note| {
            let embedding = note.embedding.as_slice()?;
            let similarity = cosine_similarity(query, embedding);
            (similarity > noise_floor).then_some(Candidate { note, similarity })
        })
        .collect::<Vec<_>>();

    // sort_by is stable
    candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

    candidates
}
