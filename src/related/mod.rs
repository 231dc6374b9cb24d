//! Related-note detection over stored note embeddings.
//!
//! # Architecture
//!
//! - `math`: cosine similarity
//! - `candidates`: scores the corpus against a target and drops noise
//! - `threshold`: decides how many of the ranked candidates to show
//! - `engine`: ties the above together for one target note
//!
//! Embeddings are produced elsewhere (see [`crate::embeddings`]); nothing in
//! here performs I/O or touches configuration beyond the tunables it is given.

mod candidates;
mod engine;
mod math;
mod threshold;

pub use candidates::{select_candidates, Candidate};
pub use engine::{Related, RelatednessEngine};
pub use math::cosine_similarity;
pub use threshold::{decide, select_related, Decision};
