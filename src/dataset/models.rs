use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::mood::Mood;
use crate::NUM_FEATURES;

/// Quoted entries of a Python-style list literal: `['A', "B's"]`.
static ARTIST_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'([^']*)'|"([^"]*)""#).unwrap()
});

/// A cleaned, mood-labeled track. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub name: String,
    /// Raw artists column, usually a list literal like `['Artist A', 'Artist B']`.
    pub artists: String,
    pub popularity: u32,
    pub valence: f64,
    pub energy: f64,
    pub danceability: f64,
    pub acousticness: f64,
    pub tempo: f64,
    pub mood: Mood,
}

impl Track {
    /// Build a track and derive its mood from valence/energy.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        artists: impl Into<String>,
        popularity: u32,
        valence: f64,
        energy: f64,
        danceability: f64,
        acousticness: f64,
        tempo: f64,
    ) -> Self {
        Self {
            name: name.into(),
            artists: artists.into(),
            popularity,
            valence,
            energy,
            danceability,
            acousticness,
            tempo,
            mood: Mood::classify(valence, energy),
        }
    }

    /// Audio features in `FEATURE_COLUMNS` order.
    pub fn features(&self) -> [f64; NUM_FEATURES] {
        [
            self.valence,
            self.energy,
            self.danceability,
            self.acousticness,
            self.tempo,
        ]
    }

    /// Artist names from the artists column. A value that isn't a list
    /// literal counts as a single artist.
    pub fn artist_names(&self) -> Vec<&str> {
        let names: Vec<&str> = ARTIST_ENTRY_RE
            .captures_iter(&self.artists)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            vec![self.artists.trim()]
        } else {
            names
        }
    }

    /// First artist named in the artists column.
    pub fn primary_artist(&self) -> &str {
        self.artist_names()[0]
    }
}

/// One CSV row as read from disk. Any `None` means the row is dropped.
///
/// Unparsable cells become `None` too, so a malformed number is treated the
/// same as a missing one.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRow {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub artists: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub popularity: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub valence: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub energy: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub danceability: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub acousticness: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub tempo: Option<f64>,
}

impl RawRow {
    /// Convert to a `Track` if every required field is present and finite.
    pub fn into_track(self) -> Option<Track> {
        let name = self.name?;
        let artists = self.artists?;
        let features = [
            self.valence?,
            self.energy?,
            self.danceability?,
            self.acousticness?,
            self.tempo?,
        ];
        if features.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let [valence, energy, danceability, acousticness, tempo] = features;
        Some(Track::new(
            name,
            artists,
            self.popularity?,
            valence,
            energy,
            danceability,
            acousticness,
            tempo,
        ))
    }
}
