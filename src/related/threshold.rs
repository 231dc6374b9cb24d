//! Adaptive cut-off for the ranked candidate list.
//!
//! A single static threshold can't tell apart "one note clearly stands out",
//! "several notes are all strongly related" and "nothing here is really
//! related, it just cleared the noise floor". The rules below look at the
//! head of the list only and are evaluated in order:
//!
//! 1. one candidate above `lone_match` is shown alone
//! 2. a top candidate leading the runner-up by more than `standout_gap` is shown alone
//! 3. a head whose average is above `cluster_average` is shown together
//! 4. anything else shows nothing

use crate::config::RelatednessConfig;

use super::candidates::Candidate;

/// Which rule decided the related set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing cleared the noise floor
    Empty,
    /// Single candidate, strong on its own
    LoneMatch,
    /// Top candidate is well ahead of the rest
    Standout,
    /// Top candidates are jointly strong; holds how many are shown
    Cluster(usize),
    /// Candidates exist but none is convincing enough
    NotConfident,
}

impl Decision {
    /// Number of leading candidates to keep.
    pub fn count(&self) -> usize {
        match self {
            Decision::Empty | Decision::NotConfident => 0,
            Decision::LoneMatch | Decision::Standout => 1,
            Decision::Cluster(n) => *n,
        }
    }
}

/// Decides how many of the descending `similarities` to show.
pub fn decide(similarities: &[f32], config: &RelatednessConfig) -> Decision {
    let n = similarities.len();
    if n == 0 {
        return Decision::Empty;
    }

    let top = similarities[0];
    let second = similarities.get(1).copied().unwrap_or(0.0);

    let head = &similarities[..n.min(config.max_results)];
    let avg_head = head.iter().sum::<f32>() / head.len() as f32;

    if n == 1 && top > config.lone_match {
        Decision::LoneMatch
    } else if top - second > config.standout_gap {
        Decision::Standout
    } else if avg_head > config.cluster_average {
        Decision::Cluster(head.len())
    } else {
        Decision::NotConfident
    }
}

/// Applies [`decide`] to a candidate list sorted by descending similarity.
pub fn select_related<'a>(
    mut candidates: Vec<Candidate<'a>>,
    config: &RelatednessConfig,
) -> (Decision, Vec<Candidate<'a>>) {
    let similarities = candidates.iter().map(|c| c.similarity).collect::<Vec<_>>();
    let decision = decide(&similarities, config);

    candidates.truncate(decision.count());
    (decision, candidates)
}
