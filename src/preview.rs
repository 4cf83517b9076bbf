use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Finds a short preview-audio URL for a track. Lookups are best-effort:
/// any failure is reported as "no preview".
pub trait PreviewLookup {
    fn preview_url(&self, title: &str, artist: Option<&str>) -> Option<String>;
}

impl<F> PreviewLookup for F
where
    F: Fn(&str, Option<&str>) -> Option<String>,
{
    fn preview_url(&self, title: &str, artist: Option<&str>) -> Option<String> {
        self(title, artist)
    }
}

/// Lookup that never finds anything (previews disabled).
pub struct NoPreview;

impl PreviewLookup for NoPreview {
    fn preview_url(&self, _title: &str, _artist: Option<&str>) -> Option<String> {
        None
    }
}

/// Deezer search API response (partial — we only need `data`).
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchTrack>,
}

#[derive(Debug, Deserialize)]
struct SearchTrack {
    preview: Option<String>,
    artist: Option<SearchArtist>,
}

#[derive(Debug, Deserialize)]
struct SearchArtist {
    name: Option<String>,
}

/// Public catalog search client (api.deezer.com compatible).
pub struct DeezerClient {
    agent: ureq::Agent,
    base_url: String,
}

impl DeezerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search(&self, query: &str) -> Result<Vec<SearchTrack>> {
        let url = format!("{}/search", self.base_url);
        log::debug!("Searching {url} for {query:?}");

        let response: SearchResponse = self
            .agent
            .get(&url)
            .query("q", query)
            .call()
            .with_context(|| format!("HTTP request failed for {query:?}"))?
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse search JSON for {query:?}"))?;

        Ok(response.data)
    }
}

impl PreviewLookup for DeezerClient {
    fn preview_url(&self, title: &str, artist: Option<&str>) -> Option<String> {
        let query = match artist {
            Some(a) => format!("{title} {a}"),
            None => title.to_string(),
        };
        match self.search(&query) {
            Ok(results) => pick_preview(&results, artist),
            Err(e) => {
                log::warn!("Preview lookup failed for {title:?}: {e:#}");
                None
            }
        }
    }
}

/// Prefer the first result whose artist contains `artist` (case-insensitive),
/// otherwise the first result. `None` when there are no results.
fn pick_preview(results: &[SearchTrack], artist: Option<&str>) -> Option<String> {
    let first = results.first()?;

    let matched = artist.map(str::to_lowercase).and_then(|wanted| {
        results.iter().find(|t| {
            t.artist
                .as_ref()
                .and_then(|a| a.name.as_deref())
                .is_some_and(|name| name.to_lowercase().contains(&wanted))
        })
    });

    matched
        .unwrap_or(first)
        .preview
        .clone()
        .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<SearchTrack> {
        serde_json::from_str::<SearchResponse>(json).unwrap().data
    }

    const RESULTS: &str = r#"{"data": [
        {"title": "Yesterday", "preview": "https://cdn/covers.mp3", "artist": {"name": "Cover Band"}},
        {"title": "Yesterday", "preview": "https://cdn/beatles.mp3", "artist": {"name": "The Beatles"}}
    ], "total": 2}"#;

    #[test]
    fn test_prefers_matching_artist() {
        let results = parse(RESULTS);
        assert_eq!(
            pick_preview(&results, Some("beatles")).as_deref(),
            Some("https://cdn/beatles.mp3")
        );
    }

    #[test]
    fn test_falls_back_to_first_result() {
        let results = parse(RESULTS);
        assert_eq!(
            pick_preview(&results, Some("Nobody")).as_deref(),
            Some("https://cdn/covers.mp3")
        );
        assert_eq!(
            pick_preview(&results, None).as_deref(),
            Some("https://cdn/covers.mp3")
        );
    }

    #[test]
    fn test_empty_results() {
        assert!(pick_preview(&parse(r#"{"data": []}"#), Some("x")).is_none());
        // Error payloads carry no `data` key
        assert!(pick_preview(&parse(r#"{"error": {"code": 800}}"#), None).is_none());
    }

    #[test]
    fn test_missing_fields_tolerated() {
        let results = parse(r#"{"data": [{"title": "X"}, {"preview": "", "artist": {}}]}"#);
        assert!(pick_preview(&results, Some("a")).is_none());
    }

    #[test]
    fn test_closure_lookup() {
        let lookup = |title: &str, _artist: Option<&str>| Some(format!("https://p/{title}"));
        assert_eq!(lookup.preview_url("Song", None).as_deref(), Some("https://p/Song"));
        assert!(NoPreview.preview_url("Song", Some("A")).is_none());
    }
}
