use rayon::prelude::*;
use std::collections::HashSet;

use crate::dataset::models::Track;

/// A corpus entry ranked against a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    /// Index into the dataset.
    pub index: usize,
    /// Cosine similarity to the query, in [-1, 1].
    pub similarity: f64,
}

/// Rank every track against `tracks[query]` by cosine similarity of their
/// vectors, then drop the query itself and keep only the best track per artist.
///
/// The query's own artist counts as already seen, so other tracks by the same
/// artist never appear. Equal similarities keep dataset order. Returns at most
/// `top_n` entries; fewer if the distinct-artist pool runs out.
pub fn rank_similar(
    tracks: &[Track],
    vectors: &[Vec<f32>],
    query: usize,
    top_n: usize,
) -> Vec<Ranked> {
    debug_assert_eq!(tracks.len(), vectors.len());
    let Some(query_vec) = vectors.get(query) else {
        return Vec::new();
    };

    let mut ranked: Vec<Ranked> = vectors
        .par_iter()
        .enumerate()
        .map(|(index, v)| Ranked {
            index,
            similarity: cosine_similarity(query_vec, v),
        })
        .collect();

    // Stable sort: ties stay in dataset order
    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut seen_artists: HashSet<&str> = HashSet::new();
    seen_artists.insert(tracks[query].artists.as_str());

    ranked
        .into_iter()
        .filter(|r| r.index != query)
        .filter(|r| seen_artists.insert(tracks[r.index].artists.as_str()))
        .take(top_n)
        .collect()
}

/// Cosine similarity between two vectors. A zero vector scores 0 against any
/// non-zero vector and 1 against another zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let (norm_a, norm_b) = (norm_a.sqrt(), norm_b.sqrt());
    match (norm_a < 1e-10, norm_b < 1e-10) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => (dot / (norm_a * norm_b)).clamp(-1.0, 1.0),
    }
}
