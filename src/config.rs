use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::semantic;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Playlists tab of the channel being searched
const DEFAULT_CHANNEL_URL: &str =
    "https://www.youtube.com/@IITMadrasBSDegreeProgramme/playlists";

/// How long a fetched catalog stays valid before re-scraping
const DEFAULT_CATALOG_TTL_SECS: u64 = 3600;

/// Upper bound on playlist entries taken from the channel page
const DEFAULT_MAX_PLAYLISTS: usize = 500;

/// Configuration for the course catalog
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Channel playlists-tab URL to scrape
    #[serde(default = "default_channel_url")]
    pub channel_url: String,

    /// Catalog snapshot lifetime in seconds
    #[serde(default = "default_catalog_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum playlist entries to consider
    #[serde(default = "default_max_playlists")]
    pub max_playlists: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            channel_url: DEFAULT_CHANNEL_URL.to_string(),
            ttl_secs: DEFAULT_CATALOG_TTL_SECS,
            max_playlists: DEFAULT_MAX_PLAYLISTS,
        }
    }
}

/// Configuration for embedding and relevance selection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Model name for embeddings (e.g., "bge-small-en-v1.5-q")
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Minimum cosine similarity [-1.0, 1.0] for a match to be shown
    #[serde(default = "default_score_floor")]
    pub score_floor: f32,

    /// Results per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            model: semantic::DEFAULT_MODEL.to_string(),
            score_floor: semantic::DEFAULT_SCORE_FLOOR,
            top_k: semantic::DEFAULT_TOP_K,
        }
    }
}

fn default_channel_url() -> String {
    DEFAULT_CHANNEL_URL.to_string()
}

fn default_catalog_ttl_secs() -> u64 {
    DEFAULT_CATALOG_TTL_SECS
}

fn default_max_playlists() -> usize {
    DEFAULT_MAX_PLAYLISTS
}

fn default_semantic_model() -> String {
    semantic::DEFAULT_MODEL.to_string()
}

fn default_score_floor() -> f32 {
    semantic::DEFAULT_SCORE_FLOOR
}

fn default_top_k() -> usize {
    semantic::DEFAULT_TOP_K
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            catalog: CatalogConfig::default(),
            semantic: SemanticConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

impl Config {
    fn validate(&mut self) {
        if url::Url::parse(&self.catalog.channel_url).is_err() {
            panic!(
                "catalog.channel_url is not a valid URL: '{}'",
                self.catalog.channel_url
            );
        }

        if self.catalog.max_playlists == 0 {
            panic!("catalog.max_playlists must be greater than 0");
        }

        if !(-1.0..=1.0).contains(&self.semantic.score_floor) {
            panic!(
                "semantic.score_floor must be between -1.0 and 1.0, got {}",
                self.semantic.score_floor
            );
        }

        if self.semantic.top_k == 0 {
            panic!("semantic.top_k must be greater than 0");
        }
    }

    pub fn load() -> Self {
        Self::load_with(&resolve_base_path())
    }

    pub fn load_with(base_path: &std::path::Path) -> Self {
        std::fs::create_dir_all(base_path).expect("cannot create data directory");

        let config_path = base_path.join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
            )
            .expect("cannot write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not readable");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_path_buf();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = self.base_path.join("config.yaml");
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(config_path, config_str.as_bytes()).expect("cannot write config");
    }

    /// Data directory (config, downloaded models).
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

fn resolve_base_path() -> PathBuf {
    if let Ok(path) = std::env::var("LECTERN_PATH") {
        return PathBuf::from(path);
    }

    homedir::my_home()
        .ok()
        .flatten()
        .map(|home| home.join(".local").join("share").join("lectern"))
        .unwrap_or_else(|| PathBuf::from(".lectern"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.semantic.top_k, 10);
        assert!((config.semantic.score_floor - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.catalog.ttl_secs, 3600);
        assert_eq!(config.catalog.max_playlists, 500);
    }

    #[test]
    #[should_panic(expected = "score_floor")]
    fn test_validate_rejects_bad_floor() {
        let mut config = Config::default();
        config.semantic.score_floor = 1.5;
        config.validate();
    }

    #[test]
    #[should_panic(expected = "top_k")]
    fn test_validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.semantic.top_k = 0;
        config.validate();
    }

    #[test]
    #[should_panic(expected = "channel_url")]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        config.catalog.channel_url = "not a url".to_string();
        config.validate();
    }
}
