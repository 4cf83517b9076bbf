//! Catalog views that don't need the embedding model: top tracks by artist,
//! random picks by mood, overall most popular, and per-mood statistics.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::dataset::models::Track;
use crate::dataset::Dataset;
use crate::mood::Mood;

/// Per-mood aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodStats {
    pub mood: Mood,
    pub tracks: usize,
    pub mean_popularity: f64,
}

/// Keep the first track of each name, preserving order.
fn distinct_names<'a>(tracks: impl IntoIterator<Item = &'a Track>) -> Vec<&'a Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|&t| seen.insert(t.name.as_str()))
        .collect()
}

/// Sort by popularity descending; ties keep dataset order.
fn by_popularity<'a>(mut tracks: Vec<&'a Track>) -> Vec<&'a Track> {
    tracks.sort_by(|a, b| b.popularity.cmp(&a.popularity));
    tracks
}

/// Whether `artist` names this track's artists column, either the raw value or
/// any single listed artist (case-insensitive).
fn credits_artist(track: &Track, artist: &str) -> bool {
    let wanted = artist.trim().to_lowercase();
    track.artists.trim().to_lowercase() == wanted
        || track
            .artist_names()
            .iter()
            .any(|name| name.to_lowercase() == wanted)
}

/// Most popular distinct songs credited to `artist`.
pub fn top_by_artist<'a>(dataset: &'a Dataset, artist: &str, limit: usize) -> Vec<&'a Track> {
    let credited: Vec<&Track> = dataset
        .tracks()
        .iter()
        .filter(|t| credits_artist(t, artist))
        .collect();
    let mut top = distinct_names(by_popularity(credited));
    top.truncate(limit);
    top
}

/// Up to `limit` distinct songs of the given mood, sampled uniformly.
pub fn random_by_mood<'a, R: Rng + ?Sized>(
    dataset: &'a Dataset,
    mood: Mood,
    limit: usize,
    rng: &mut R,
) -> Vec<&'a Track> {
    let pool = distinct_names(dataset.tracks().iter().filter(|t| t.mood == mood));
    pool.choose_multiple(rng, limit).copied().collect()
}

/// Most popular distinct songs overall.
pub fn most_popular(dataset: &Dataset, limit: usize) -> Vec<&Track> {
    let mut top = distinct_names(by_popularity(dataset.tracks().iter().collect()));
    top.truncate(limit);
    top
}

/// Track count and mean popularity per mood, for moods that occur.
pub fn mood_stats(dataset: &Dataset) -> Vec<MoodStats> {
    Mood::ALL
        .iter()
        .filter_map(|&mood| {
            let pops: Vec<u32> = dataset
                .tracks()
                .iter()
                .filter(|t| t.mood == mood)
                .map(|t| t.popularity)
                .collect();
            if pops.is_empty() {
                return None;
            }
            let mean = pops.iter().map(|&p| p as f64).sum::<f64>() / pops.len() as f64;
            Some(MoodStats {
                mood,
                tracks: pops.len(),
                mean_popularity: mean,
            })
        })
        .collect()
}
