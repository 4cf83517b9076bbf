//! Recommendation pipeline: dataset snapshot → scaled features → latent
//! vectors → similarity ranking.
//!
//! `Recommender` is the application state. It fits the scaler once per
//! snapshot and lazily obtains the embedding model on the first query that
//! names an existing track. Both are reused for every later query.
//!
//! A model's latent space is only meaningful under the fit it was trained
//! with, so the corpus is always encoded with the fit stored in the model's
//! metadata. The snapshot's own fit is used to train a new model.

use std::cell::OnceCell;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::dataset::models::Track;
use crate::dataset::{self, Dataset};
use crate::embedding::train::TrainingParams;
use crate::embedding::{EmbeddingModel, ModelError};
use crate::mood::Mood;
use crate::preview::PreviewLookup;
use crate::scaler::MinMaxScaler;
use crate::similarity::{rank_similar, Ranked};
use crate::NUM_FEATURES;

/// Tolerance when comparing a persisted scaler fit to the current one.
const SCALER_TOLERANCE: f64 = 1e-9;

/// What to do when no persisted model exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPolicy {
    /// Train and persist a model on first use.
    LoadOrTrain,
    /// Require an existing model; a missing one is `ModelError::NotTrained`.
    LoadOnly,
}

/// One ranked recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub track: Track,
    pub similarity: f64,
    pub preview_url: Option<String>,
}

/// Output CSV row.
#[derive(Serialize)]
struct RecommendationRow<'a> {
    name: &'a str,
    artists: &'a str,
    popularity: u32,
    mood: Mood,
    preview_url: Option<&'a str>,
}

pub struct Recommender {
    dataset: Dataset,
    scaler: MinMaxScaler,
    scaled: Vec<[f64; NUM_FEATURES]>,
    model_dir: PathBuf,
    training: TrainingParams,
    policy: ModelPolicy,
    model: OnceCell<EmbeddingModel>,
    latent: OnceCell<Vec<Vec<f32>>>,
}

impl Recommender {
    pub fn new(
        dataset: Dataset,
        model_dir: &Path,
        training: TrainingParams,
        policy: ModelPolicy,
    ) -> Self {
        let features = dataset.feature_matrix();
        let scaler = MinMaxScaler::fit(&features);
        let scaled = scaler.transform(&features);
        Self {
            dataset,
            scaler,
            scaled,
            model_dir: model_dir.to_path_buf(),
            training,
            policy,
            model: OnceCell::new(),
            latent: OnceCell::new(),
        }
    }

    /// Min/max fit of the current snapshot.
    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    /// Whether the embedding model has been obtained in this process.
    pub fn has_model(&self) -> bool {
        self.model.get().is_some()
    }

    /// Obtain the embedding model, loading or training it on first call.
    pub fn model(&self) -> Result<&EmbeddingModel, ModelError> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let model = match self.policy {
            ModelPolicy::LoadOrTrain => EmbeddingModel::load_or_train(
                &self.model_dir,
                &self.scaled,
                &self.scaler,
                &self.training,
            )?,
            ModelPolicy::LoadOnly => EmbeddingModel::load(&self.model_dir)?,
        };

        if !model.metadata().scaler.approx_eq(&self.scaler, SCALER_TOLERANCE) {
            log::warn!(
                "Dataset feature ranges differ from the ones the model was trained on; \
                 scaling with the model's ranges (retrain with `moodrec train --force`)"
            );
        }
        Ok(self.model.get_or_init(|| model))
    }

    /// Train a fresh model on the current snapshot and persist it, replacing
    /// any model already in `model_dir`.
    pub fn train(&self) -> Result<EmbeddingModel, ModelError> {
        EmbeddingModel::train(&self.model_dir, &self.scaled, &self.scaler, &self.training)
    }

    /// Latent vectors of the whole snapshot, encoded once under the model's fit.
    fn latent(&self) -> Result<&Vec<Vec<f32>>, ModelError> {
        if let Some(latent) = self.latent.get() {
            return Ok(latent);
        }
        let model = self.model()?;
        let fit = &model.metadata().scaler;
        let latent = if fit.approx_eq(&self.scaler, SCALER_TOLERANCE) {
            model.encode(&self.scaled)?
        } else {
            model.encode(&fit.transform(&self.dataset.feature_matrix()))?
        };
        log::debug!("Encoded {} tracks", latent.len());
        Ok(self.latent.get_or_init(|| latent))
    }

    /// Recommend up to `top_n` tracks similar to the track named `name`
    /// (case-insensitive exact match, first occurrence).
    ///
    /// Returns `Ok(None)` when no track has that name; the model is not
    /// touched in that case.
    pub fn recommend(
        &self,
        name: &str,
        top_n: usize,
    ) -> Result<Option<Vec<Recommendation>>, ModelError> {
        let Some(query) = self.dataset.find_by_name(name) else {
            log::info!("No track named {name:?}");
            return Ok(None);
        };
        let latent = self.latent()?;
        let ranked = rank_similar(self.dataset.tracks(), latent, query, top_n);
        Ok(Some(self.materialize(&ranked)))
    }

    /// Same ranking, but over the scaled audio features directly instead of the
    /// autoencoder's latent space. Needs no model.
    pub fn recommend_by_features(&self, name: &str, top_n: usize) -> Option<Vec<Recommendation>> {
        let query = self.dataset.find_by_name(name)?;
        let vectors: Vec<Vec<f32>> = self
            .scaled
            .iter()
            .map(|row| row.iter().map(|&v| v as f32).collect())
            .collect();
        let ranked = rank_similar(self.dataset.tracks(), &vectors, query, top_n);
        Some(self.materialize(&ranked))
    }

    /// Swap in a new dataset snapshot. The latent matrix is always dropped;
    /// the model handle is dropped too when the feature ranges changed, so the
    /// next query picks up whatever model is persisted by then.
    /// Returns whether the model handle was invalidated.
    pub fn replace_dataset(&mut self, dataset: Dataset) -> bool {
        let features = dataset.feature_matrix();
        let scaler = MinMaxScaler::fit(&features);
        let changed = !scaler.approx_eq(&self.scaler, SCALER_TOLERANCE);

        self.scaled = scaler.transform(&features);
        self.scaler = scaler;
        self.dataset = dataset;
        self.latent = OnceCell::new();
        if changed {
            self.model = OnceCell::new();
        }
        changed
    }

    fn materialize(&self, ranked: &[Ranked]) -> Vec<Recommendation> {
        ranked
            .iter()
            .map(|r| Recommendation {
                track: self.dataset.tracks()[r.index].clone(),
                similarity: r.similarity,
                preview_url: None,
            })
            .collect()
    }
}

/// Attach a preview URL to each recommendation. Failed lookups leave `None`.
pub fn enrich_previews<L: PreviewLookup + ?Sized>(recs: &mut [Recommendation], lookup: &L) {
    for rec in recs.iter_mut() {
        rec.preview_url = lookup.preview_url(&rec.track.name, Some(rec.track.primary_artist()));
    }
    let found = recs.iter().filter(|r| r.preview_url.is_some()).count();
    log::info!("Found previews for {}/{} tracks", found, recs.len());
}

/// Write recommendations as CSV: name, artists, popularity, mood, preview_url.
pub fn write_recommendations(path: &Path, recs: &[Recommendation]) -> dataset::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for rec in recs {
        wtr.serialize(RecommendationRow {
            name: &rec.track.name,
            artists: &rec.track.artists,
            popularity: rec.track.popularity,
            mood: rec.track.mood,
            preview_url: rec.preview_url.as_deref(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Index ranges of consecutive pages of `page_size` items.
pub fn page_ranges(len: usize, page_size: usize) -> impl Iterator<Item = Range<usize>> {
    let size = page_size.max(1);
    (0..len)
        .step_by(size)
        .map(move |start| start..(start + size).min(len))
}
