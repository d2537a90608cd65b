//! Course indexing: turn a playlist's raw video entries into an embedded,
//! searchable course.

use serde::Serialize;

use crate::scrape::RawVideoEntry;
use crate::semantic::{EmbeddingError, EmbeddingModel};

/// Placeholder titles YouTube reports for inaccessible playlist items.
const UNUSABLE_TITLES: [&str; 2] = ["[Private video]", "[Deleted video]"];

/// One usable video of a course.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
}

impl VideoRecord {
    /// The watch link shown to the user.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

/// A loaded course: records and their embeddings, zipped by position.
///
/// `vectors[i]` embeds `records[i].title`. Nothing may filter one sequence
/// without the other; the positional correspondence is what makes search
/// results point at the right videos.
pub struct IndexedCourse {
    pub name: String,
    pub records: Vec<VideoRecord>,
    pub vectors: Vec<Vec<f32>>,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexCourseError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("embedder returned {got} vectors for {expected} titles")]
    LengthMismatch { expected: usize, got: usize },
}

/// Drop unusable entries, preserving input order.
///
/// An entry is unusable if it lacks an id or title, or its title is a
/// private/deleted placeholder.
pub fn usable_records(raw: &[RawVideoEntry]) -> Vec<VideoRecord> {
    raw.iter()
        .filter_map(|entry| {
            let (Some(id), Some(title)) = (&entry.id, &entry.title) else {
                return None;
            };

            if title.is_empty() || UNUSABLE_TITLES.contains(&title.as_str()) {
                return None;
            }

            Some(VideoRecord {
                id: id.clone(),
                title: title.clone(),
            })
        })
        .collect()
}

/// Build an [`IndexedCourse`] from raw playlist entries.
///
/// Titles are embedded in a single batch call. Returns `Ok(None)` when no
/// entry survives filtering; callers render that as "no videos found"
/// instead of searching.
pub fn index_course(
    model: &EmbeddingModel,
    name: &str,
    raw: &[RawVideoEntry],
) -> Result<Option<IndexedCourse>, IndexCourseError> {
    let records = usable_records(raw);
    if records.is_empty() {
        log::info!("course '{name}': no usable videos among {} entries", raw.len());
        return Ok(None);
    }

    let titles: Vec<String> = records.iter().map(|r| r.title.clone()).collect();
    let vectors = model.embed_batch(&titles)?;

    if vectors.len() != records.len() {
        return Err(IndexCourseError::LengthMismatch {
            expected: records.len(),
            got: vectors.len(),
        });
    }

    log::info!("course '{name}': indexed {} videos", records.len());

    Ok(Some(IndexedCourse {
        name: name.to_string(),
        records,
        vectors,
    }))
}
