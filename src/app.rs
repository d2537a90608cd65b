//! Application core: owns the embedding model, the catalog cache, and the
//! single active course.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::catalog::CatalogService;
use crate::config::Config;
use crate::course::{self, VideoRecord};
use crate::scrape;
use crate::semantic::{
    select_matches, EmbeddingError, EmbeddingModel, ExactIndex, IndexError, Match,
};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unknown course '{0}'")]
    UnknownCourse(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("indexing error: {0}")]
    IndexCourse(#[from] course::IndexCourseError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

/// Outcome of loading a course. "No videos" is a state, not an error.
#[derive(Debug)]
pub enum LoadOutcome {
    Indexed { name: String, count: usize },
    NoVideos,
}

/// Outcome of a query. The three non-match cases are distinct states the
/// presenter must render differently.
#[derive(Debug)]
pub enum SearchOutcome {
    NoCourseLoaded,
    NoCloseMatches { course: String },
    Matches { course: String, matches: Vec<Match> },
}

/// The active search corpus: one indexed course.
struct ActiveCourse {
    name: String,
    records: Vec<VideoRecord>,
    index: ExactIndex,
}

pub struct App {
    config: Config,
    model: Arc<EmbeddingModel>,
    catalog: CatalogService,
    /// Replaced wholesale on load; never mutated in place.
    active: RwLock<Option<ActiveCourse>>,
}

impl App {
    /// Initialize the application.
    ///
    /// Creates the embedding model eagerly: without an embedder nothing
    /// downstream can function, so a failure here is fatal and is surfaced
    /// to the caller.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        log::info!("initializing embedding model '{}'", config.semantic.model);
        let model = EmbeddingModel::new(&config.semantic.model, config.base_path().clone())?;
        log::info!(
            "model ready ({} dimensions)",
            model.dimensions()
        );

        let catalog = CatalogService::new(
            config.catalog.channel_url.clone(),
            config.catalog.max_playlists,
            Duration::from_secs(config.catalog.ttl_secs),
        );

        Ok(Self {
            config,
            model: Arc::new(model),
            catalog,
            active: RwLock::new(None),
        })
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// The filtered catalog, sorted by title. Empty on fetch failure.
    pub fn catalog(&self) -> BTreeMap<String, String> {
        self.catalog.courses()
    }

    /// Fetch, filter, and embed the named course, replacing the active one.
    ///
    /// A scrape failure degrades to an empty video list; only an unknown
    /// title or an embedding problem is an error.
    pub fn load_course(&self, title: &str) -> Result<LoadOutcome, AppError> {
        let courses = self.catalog.courses();
        let url = courses
            .get(title)
            .ok_or_else(|| AppError::UnknownCourse(title.to_string()))?;

        let raw = match scrape::fetch_playlist_videos(url) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("course '{title}': scrape failed: {err}");
                Vec::new()
            }
        };

        let Some(indexed) = course::index_course(&self.model, title, &raw)? else {
            return Ok(LoadOutcome::NoVideos);
        };

        let count = indexed.records.len();
        let index = ExactIndex::build(indexed.vectors)?;
        log::debug!(
            "course '{title}': {count} vectors, {} dimensions",
            index.dimensions()
        );

        let active = ActiveCourse {
            name: indexed.name,
            records: indexed.records,
            index,
        };

        let mut guard = self
            .active
            .write()
            .map_err(|e| AppError::Internal(format!("lock poisoned: {e}")))?;
        *guard = Some(active);

        Ok(LoadOutcome::Indexed {
            name: title.to_string(),
            count,
        })
    }

    /// Run a query against the active course.
    pub fn search(&self, query: &str, top_k: Option<usize>) -> Result<SearchOutcome, AppError> {
        let guard = self
            .active
            .read()
            .map_err(|e| AppError::Internal(format!("lock poisoned: {e}")))?;

        let Some(active) = guard.as_ref() else {
            return Ok(SearchOutcome::NoCourseLoaded);
        };

        let query_vec = self.model.embed(query)?;

        let matches = select_matches(
            &active.index,
            &active.records,
            &query_vec,
            top_k.unwrap_or(self.config.semantic.top_k),
            self.config.semantic.score_floor,
        )?;

        if matches.is_empty() {
            return Ok(SearchOutcome::NoCloseMatches {
                course: active.name.clone(),
            });
        }

        Ok(SearchOutcome::Matches {
            course: active.name.clone(),
            matches,
        })
    }

    /// Name and size of the active course, if any.
    pub fn active_course(&self) -> Option<(String, usize)> {
        self.active
            .read()
            .ok()
            .and_then(|guard| {
                guard
                    .as_ref()
                    .map(|active| (active.name.clone(), active.records.len()))
            })
    }

    pub fn listen_addr(&self) -> &str {
        &self.config.listen_addr
    }
}
