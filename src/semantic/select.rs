//! Top-k relevance selection over a similarity backend.
//!
//! Applies the score floor, the result cap, and a duplicate guard on top of
//! whatever backend produced the ranking, so these semantics stay identical
//! across backends.

use std::collections::HashSet;

use serde::Serialize;

use crate::course::VideoRecord;
use crate::semantic::index::{IndexError, SimilarityBackend};

/// One query result: a video and its similarity to the query.
/// Ephemeral, produced per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    #[serde(flatten)]
    pub record: VideoRecord,
    pub score: f32,
}

/// Select the best matches for a query vector.
///
/// Ranks `records` via the backend, keeps at most `k` hits, and drops any
/// hit whose score does not exceed `floor`. If even the best hit is at or
/// below the floor the result is empty; callers present that as "no close
/// matches", distinct from an empty course.
///
/// Deterministic: identical (query, corpus) input yields identical output.
pub fn select_matches(
    backend: &dyn SimilarityBackend,
    records: &[VideoRecord],
    query: &[f32],
    k: usize,
    floor: f32,
) -> Result<Vec<Match>, IndexError> {
    let hits = backend.top_k(query, k)?;

    let mut seen = HashSet::new();
    let mut matches = Vec::with_capacity(hits.len());

    for hit in hits {
        if hit.score <= floor {
            continue;
        }

        // A backend must not report a position twice, but the guard keeps
        // that guarantee local to this function.
        if !seen.insert(hit.position) {
            continue;
        }

        if let Some(record) = records.get(hit.position) {
            matches.push(Match {
                record: record.clone(),
                score: hit.score,
            });
        }
    }

    Ok(matches)
}
