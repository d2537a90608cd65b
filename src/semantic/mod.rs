//! Semantic search over course video titles.
//!
//! - `embeddings`: wraps fastembed for embedding generation
//! - `index`: similarity backends (exact in-memory cosine search)
//! - `select`: top-k relevance selection with score floor

pub mod embeddings;
mod index;
mod select;

pub use embeddings::{EmbeddingError, EmbeddingModel};
pub use index::{ExactIndex, IndexError, ScoredHit, SimilarityBackend};
pub use select::{select_matches, Match};

/// Default embedding model (quantized bge-small: small download, low RAM)
pub const DEFAULT_MODEL: &str = "bge-small-en-v1.5-q";

/// Minimum cosine similarity for a result to count as a match
pub const DEFAULT_SCORE_FLOOR: f32 = 0.4;

/// Results per query
pub const DEFAULT_TOP_K: usize = 10;
