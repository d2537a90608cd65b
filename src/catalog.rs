//! Course catalog: the channel's playlists, filtered and cached.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::scrape::{self, RawPlaylistEntry};

/// Substrings (matched case-insensitively) that mark a playlist as not being
/// course content.
const JUNK_TERMS: [&str; 8] = [
    "shorts",
    "testimonial",
    "webinar",
    "event",
    "hackathon",
    "promo",
    "teaser",
    "live session",
];

/// Turn raw playlist entries into a clean title -> url mapping.
///
/// Entries missing a title or url are dropped, as is anything whose
/// lowercased title contains a junk term. Duplicate titles keep the
/// first-seen entry. The BTreeMap keeps the catalog sorted by title.
///
/// Pure filtering over already-fetched data; no network or embedding work.
pub fn build_catalog(entries: &[RawPlaylistEntry]) -> BTreeMap<String, String> {
    let mut catalog = BTreeMap::new();

    for entry in entries {
        let (Some(title), Some(url)) = (&entry.title, &entry.url) else {
            continue;
        };

        let lowered = title.to_lowercase();
        if JUNK_TERMS.iter().any(|term| lowered.contains(term)) {
            continue;
        }

        if !catalog.contains_key(title) {
            catalog.insert(title.clone(), url.clone());
        }
    }

    catalog
}

/// One fetched catalog, valid for a bounded time window.
struct CatalogSnapshot {
    courses: BTreeMap<String, String>,
    fetched_at: Instant,
}

impl CatalogSnapshot {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }
}

/// Fetches and caches the course catalog.
///
/// The snapshot is re-derived after `ttl` elapses. A failed fetch degrades
/// to an empty catalog at this boundary: "zero courses" is a displayable
/// state, not a crash. The failure itself is logged with its reason.
pub struct CatalogService {
    channel_url: String,
    max_playlists: usize,
    ttl: Duration,
    snapshot: Mutex<Option<CatalogSnapshot>>,
}

impl CatalogService {
    pub fn new(channel_url: String, max_playlists: usize, ttl: Duration) -> Self {
        Self {
            channel_url,
            max_playlists,
            ttl,
            snapshot: Mutex::new(None),
        }
    }

    /// Get the current catalog, re-fetching if the snapshot expired.
    pub fn courses(&self) -> BTreeMap<String, String> {
        let mut guard = match self.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let needs_fetch = match guard.as_ref() {
            Some(snapshot) => snapshot.is_stale(self.ttl),
            None => true,
        };

        if needs_fetch {
            let courses = self.fetch_catalog();
            *guard = Some(CatalogSnapshot {
                courses,
                fetched_at: Instant::now(),
            });
        }

        guard
            .as_ref()
            .map(|snapshot| snapshot.courses.clone())
            .unwrap_or_default()
    }

    fn fetch_catalog(&self) -> BTreeMap<String, String> {
        match scrape::fetch_channel_playlists(&self.channel_url, self.max_playlists) {
            Ok(entries) => {
                let catalog = build_catalog(&entries);
                log::info!(
                    "catalog: {} courses ({} raw entries)",
                    catalog.len(),
                    entries.len()
                );
                catalog
            }
            Err(err) => {
                log::warn!("catalog fetch failed, serving empty catalog: {err}");
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, url: &str) -> RawPlaylistEntry {
        RawPlaylistEntry {
            title: Some(title.to_string()),
            url: Some(url.to_string()),
        }
    }

    #[test]
    fn test_junk_terms_excluded_case_insensitive() {
        let entries = vec![
            entry("Week 3 Lecture", "https://example.com/1"),
            entry("Week 3 Webinar", "https://example.com/2"),
            entry("SHORTS: recap", "https://example.com/3"),
            entry("Orientation Event 2024", "https://example.com/4"),
            entry("Live Session with TAs", "https://example.com/5"),
        ];

        let catalog = build_catalog(&entries);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains_key("Week 3 Lecture"));
    }

    #[test]
    fn test_missing_fields_dropped() {
        let entries = vec![
            RawPlaylistEntry {
                title: Some("No url".to_string()),
                url: None,
            },
            RawPlaylistEntry {
                title: None,
                url: Some("https://example.com/1".to_string()),
            },
            entry("Complete", "https://example.com/2"),
        ];

        let catalog = build_catalog(&entries);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains_key("Complete"));
    }

    #[test]
    fn test_sorted_regardless_of_input_order() {
        let forward = vec![
            entry("Algebra", "https://example.com/a"),
            entry("Calculus", "https://example.com/b"),
            entry("Zoology", "https://example.com/c"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = build_catalog(&forward);
        let b = build_catalog(&reversed);

        assert_eq!(a, b);
        let titles: Vec<_> = a.keys().collect();
        assert_eq!(titles, vec!["Algebra", "Calculus", "Zoology"]);
    }

    #[test]
    fn test_duplicate_title_keeps_first() {
        let entries = vec![
            entry("Maths 1", "https://example.com/first"),
            entry("Maths 1", "https://example.com/second"),
        ];

        let catalog = build_catalog(&entries);
        assert_eq!(
            catalog.get("Maths 1").map(String::as_str),
            Some("https://example.com/first")
        );
    }

    #[test]
    fn test_empty_input_is_valid() {
        let catalog = build_catalog(&[]);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_snapshot_staleness() {
        let snapshot = CatalogSnapshot {
            courses: BTreeMap::new(),
            fetched_at: Instant::now(),
        };
        assert!(!snapshot.is_stale(Duration::from_secs(3600)));
        assert!(snapshot.is_stale(Duration::ZERO));
    }
}
