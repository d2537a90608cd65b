//! Scraping of YouTube channel/playlist pages.
//!
//! Both page kinds embed a `ytInitialData` JSON blob in the HTML. We fetch
//! the page with a retrying blocking client, cut the blob out by brace
//! matching, and walk the JSON for the renderer nodes we care about.
//! Individual malformed entries degrade to `None` fields and never abort
//! the batch; the caller filters them out.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::{thread::sleep, time::Duration};

const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

const MAX_ATTEMPTS: u64 = 4;

static INITIAL_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"ytInitialData\s*=\s*"#).expect("Failed to compile ytInitialData regex")
});

/// A playlist entry as scraped, before catalog filtering.
#[derive(Debug, Clone, Default)]
pub struct RawPlaylistEntry {
    pub title: Option<String>,
    pub url: Option<String>,
}

/// A video entry as scraped, before usability filtering.
#[derive(Debug, Clone, Default)]
pub struct RawVideoEntry {
    pub id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed after {0} attempts")]
    Unreachable(u64),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("page carries no ytInitialData blob")]
    MissingInitialData,

    #[error("ytInitialData is not valid json: {0}")]
    MalformedInitialData(#[from] serde_json::Error),
}

/// Fetch the playlists tab of a channel.
///
/// `cap` bounds the number of returned entries (the page can list hundreds
/// of playlists for large channels).
pub fn fetch_channel_playlists(
    channel_url: &str,
    cap: usize,
) -> Result<Vec<RawPlaylistEntry>, ScrapeError> {
    let html = fetch_page(channel_url)?;
    let data = extract_initial_data(&html)?;

    let mut entries = collect_playlist_entries(&data);
    log::debug!("{channel_url}: {} raw playlist entries", entries.len());
    entries.truncate(cap);

    Ok(entries)
}

/// Fetch the video listing of a single playlist.
pub fn fetch_playlist_videos(playlist_url: &str) -> Result<Vec<RawVideoEntry>, ScrapeError> {
    let html = fetch_page(playlist_url)?;
    let data = extract_initial_data(&html)?;

    let entries = collect_video_entries(&data);
    log::debug!("{playlist_url}: {} raw video entries", entries.len());

    Ok(entries)
}

fn fetch_page(url: &str) -> Result<String, ScrapeError> {
    let url_parsed = reqwest::Url::parse(url).map_err(|e| ScrapeError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let host = url_parsed.host_str().unwrap_or_default();
    let path = url_parsed.path();
    let iden = format!("{host}{path}");

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT_DEFAULT)
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let mut r = 0;
    loop {
        if r >= MAX_ATTEMPTS {
            return Err(ScrapeError::Unreachable(MAX_ATTEMPTS));
        }

        if r > 0 {
            log::debug!("{iden}: retrying");
        }

        r += 1;

        let resp = match client.get(url_parsed.clone()).send() {
            Ok(resp) => resp,
            Err(err) => {
                log::warn!("{iden}: {err}");
                continue;
            }
        };

        let status = resp.status();

        if status.is_success() {
            match resp.text() {
                Ok(text) => return Ok(text),
                Err(err) => {
                    log::warn!("{iden}: failed to read body: {err}");
                    continue;
                }
            }
        }

        log::debug!("{iden}: {}", status);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            sleep(Duration::from_secs(r * 4));
            continue;
        }

        if status.is_client_error() {
            // no point retrying a 4xx
            return Err(ScrapeError::Status(status));
        }
    }
}

/// Cut the `ytInitialData` JSON object out of a page and parse it.
pub fn extract_initial_data(html: &str) -> Result<Value, ScrapeError> {
    let m = INITIAL_DATA_RE
        .find(html)
        .ok_or(ScrapeError::MissingInitialData)?;

    let rest = &html[m.end()..];
    let start = rest.find('{').ok_or(ScrapeError::MissingInitialData)?;
    let blob = &rest[start..];

    let end = matching_brace(blob).ok_or(ScrapeError::MissingInitialData)?;

    Ok(serde_json::from_str(&blob[..=end])?)
}

/// Index of the brace closing the object opened at byte 0, honoring string
/// literals and escapes.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Collect playlist entries from a channel's playlists-tab data.
///
/// YouTube has shipped several renderer shapes for this tab; we recognize
/// the grid and list variants and read title + playlistId from either.
pub fn collect_playlist_entries(data: &Value) -> Vec<RawPlaylistEntry> {
    let mut entries = Vec::new();
    walk(data, &mut |obj| {
        for key in ["gridPlaylistRenderer", "playlistRenderer"] {
            if let Some(renderer) = obj.get(key) {
                entries.push(RawPlaylistEntry {
                    title: renderer_title(renderer),
                    url: renderer
                        .get("playlistId")
                        .and_then(Value::as_str)
                        .map(|id| format!("https://www.youtube.com/playlist?list={id}")),
                });
            }
        }
    });
    entries
}

/// Collect video entries from a playlist page's data.
pub fn collect_video_entries(data: &Value) -> Vec<RawVideoEntry> {
    let mut entries = Vec::new();
    walk(data, &mut |obj| {
        if let Some(renderer) = obj.get("playlistVideoRenderer") {
            entries.push(RawVideoEntry {
                id: renderer
                    .get("videoId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                title: renderer_title(renderer),
            });
        }
    });
    entries
}

/// Depth-first walk over every JSON object, preserving document order.
fn walk<'a>(value: &'a Value, visit: &mut impl FnMut(&'a serde_json::Map<String, Value>)) {
    match value {
        Value::Object(obj) => {
            visit(obj);
            for v in obj.values() {
                walk(v, visit);
            }
        }
        Value::Array(arr) => {
            for v in arr {
                walk(v, visit);
            }
        }
        _ => {}
    }
}

/// Titles come as either `{"runs": [{"text": ...}]}` or `{"simpleText": ...}`.
fn renderer_title(renderer: &Value) -> Option<String> {
    let title = renderer.get("title")?;

    if let Some(text) = title
        .get("runs")
        .and_then(|runs| runs.get(0))
        .and_then(|run| run.get("text"))
        .and_then(Value::as_str)
    {
        return Some(text.to_string());
    }

    title
        .get("simpleText")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_initial_data() {
        let html = r#"<html><script>var ytInitialData = {"a": {"b": "with } brace and \" quote"}, "c": [1, 2]};</script></html>"#;
        let data = extract_initial_data(html).unwrap();
        assert_eq!(data["c"][1], 2);
        assert_eq!(data["a"]["b"], "with } brace and \" quote");
    }

    #[test]
    fn test_extract_initial_data_missing() {
        let result = extract_initial_data("<html><body>nothing here</body></html>");
        assert!(matches!(result, Err(ScrapeError::MissingInitialData)));
    }

    #[test]
    fn test_extract_initial_data_malformed() {
        let result = extract_initial_data(r#"ytInitialData = {"bad": }"#);
        assert!(matches!(result, Err(ScrapeError::MalformedInitialData(_))));
    }

    #[test]
    fn test_collect_playlists_grid_renderer() {
        let data = json!({
            "contents": [
                {"gridPlaylistRenderer": {
                    "playlistId": "PL123",
                    "title": {"runs": [{"text": "Maths 1"}]}
                }},
                {"gridPlaylistRenderer": {
                    "playlistId": "PL456",
                    "title": {"simpleText": "Stats 1"}
                }}
            ]
        });

        let entries = collect_playlist_entries(&data);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title.as_deref(), Some("Maths 1"));
        assert_eq!(
            entries[0].url.as_deref(),
            Some("https://www.youtube.com/playlist?list=PL123")
        );
        assert_eq!(entries[1].title.as_deref(), Some("Stats 1"));
    }

    #[test]
    fn test_collect_playlists_entry_missing_fields() {
        // Broken entries still come through, with None fields
        let data = json!({
            "items": [
                {"playlistRenderer": {"title": {"runs": [{"text": "No id"}]}}},
                {"playlistRenderer": {"playlistId": "PL789"}}
            ]
        });

        let entries = collect_playlist_entries(&data);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].url.is_none());
        assert!(entries[1].title.is_none());
    }

    #[test]
    fn test_collect_videos_preserves_document_order() {
        let data = json!({
            "playlist": {"contents": [
                {"playlistVideoRenderer": {
                    "videoId": "abc",
                    "title": {"runs": [{"text": "Week 1"}]}
                }},
                {"playlistVideoRenderer": {
                    "videoId": "def",
                    "title": {"runs": [{"text": "Week 2"}]}
                }},
                {"playlistVideoRenderer": {
                    "videoId": "ghi",
                    "title": {"simpleText": "Week 3"}
                }}
            ]}
        });

        let entries = collect_video_entries(&data);
        let ids: Vec<_> = entries.iter().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, vec!["abc", "def", "ghi"]);
    }

    #[test]
    fn test_collect_videos_ignores_other_renderers() {
        let data = json!({
            "contents": [
                {"continuationItemRenderer": {"token": "xyz"}},
                {"playlistVideoRenderer": {"videoId": "abc", "title": {"simpleText": "Week 1"}}}
            ]
        });

        let entries = collect_video_entries(&data);
        assert_eq!(entries.len(), 1);
    }
}
