//! Autoencoder embedding model.
//!
//! A model is either absent on disk (untrained) or present (trained). Training
//! happens once and is persisted; later runs load the weights verbatim. The
//! encoder is rebuilt from the weights stored under the `encoder` prefix, so
//! inference never depends on a layer's position in the network.

pub mod network;
pub mod train;

use candle_core::{DType, Device, Module};
use candle_nn::VarBuilder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::scaler::MinMaxScaler;
use crate::{FEATURE_COLUMNS, NUM_FEATURES};
use network::{decoder_dims, encoder_dims, Encoder, ENCODER_PREFIX, LATENT_DIM};
use train::{rows_to_tensor, train_autoencoder, TrainingParams};

/// Safetensors file holding both halves of the autoencoder.
pub const WEIGHTS_FILE: &str = "autoencoder.safetensors";
/// JSON sidecar describing how the weights were produced.
pub const METADATA_FILE: &str = "autoencoder.json";

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),
    #[error("Model metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("No trained model at {}. Run `moodrec train` first.", .path.display())]
    NotTrained { path: PathBuf },
    #[error("Persisted model does not match this build: {0}. Retrain with `moodrec train --force`.")]
    Incompatible(String),
    #[error("Cannot train on an empty dataset")]
    EmptyDataset,
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Everything needed to check a persisted model against the current build and data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub feature_columns: Vec<String>,
    pub encoder_dims: Vec<usize>,
    pub decoder_dims: Vec<usize>,
    /// Scaler fit of the snapshot the model was trained on.
    pub scaler: MinMaxScaler,
    pub training: TrainingParams,
    pub final_loss: Option<f32>,
    pub trained_rows: usize,
    pub trained_at: DateTime<Utc>,
}

impl ModelMetadata {
    fn check_compatible(&self) -> Result<()> {
        if self.feature_columns != FEATURE_COLUMNS {
            return Err(ModelError::Incompatible(format!(
                "feature columns {:?}, expected {:?}",
                self.feature_columns, FEATURE_COLUMNS
            )));
        }
        if self.encoder_dims != encoder_dims(NUM_FEATURES)
            || self.decoder_dims != decoder_dims(NUM_FEATURES)
        {
            return Err(ModelError::Incompatible(format!(
                "layer widths {:?}/{:?}, expected {:?}/{:?}",
                self.encoder_dims,
                self.decoder_dims,
                encoder_dims(NUM_FEATURES),
                decoder_dims(NUM_FEATURES)
            )));
        }
        Ok(())
    }
}

/// A trained model, ready for inference. Read-only after construction.
pub struct EmbeddingModel {
    encoder: Encoder,
    metadata: ModelMetadata,
    device: Device,
}

impl EmbeddingModel {
    /// Whether a persisted model exists in `model_dir`.
    pub fn exists(model_dir: &Path) -> bool {
        model_dir.join(WEIGHTS_FILE).is_file() && model_dir.join(METADATA_FILE).is_file()
    }

    /// Load a persisted model. Fails with `NotTrained` if none exists.
    pub fn load(model_dir: &Path) -> Result<Self> {
        if !Self::exists(model_dir) {
            return Err(ModelError::NotTrained {
                path: model_dir.to_path_buf(),
            });
        }

        let meta_text = std::fs::read_to_string(model_dir.join(METADATA_FILE))?;
        let metadata: ModelMetadata = serde_json::from_str(&meta_text)?;
        metadata.check_compatible()?;

        let device = Device::Cpu;
        let weights = candle_core::safetensors::load(model_dir.join(WEIGHTS_FILE), &device)?;
        log::debug!("Model tensors: {:?}", weights.keys());
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let encoder = Encoder::new(NUM_FEATURES, vb.pp(ENCODER_PREFIX))?;

        log::info!(
            "Loaded model from {} (trained {} on {} rows)",
            model_dir.display(),
            metadata.trained_at.format("%Y-%m-%d %H:%M"),
            metadata.trained_rows
        );
        Ok(Self {
            encoder,
            metadata,
            device,
        })
    }

    /// Train a fresh model on already-scaled rows and persist it to `model_dir`.
    pub fn train(
        model_dir: &Path,
        scaled: &[[f64; NUM_FEATURES]],
        scaler: &MinMaxScaler,
        params: &TrainingParams,
    ) -> Result<Self> {
        if scaled.is_empty() {
            return Err(ModelError::EmptyDataset);
        }

        let device = Device::Cpu;
        log::info!(
            "Training autoencoder on {} rows ({} epochs, batch {})",
            scaled.len(),
            params.epochs,
            params.batch_size
        );
        let trained = train_autoencoder(scaled, params, &device)?;

        let metadata = ModelMetadata {
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            encoder_dims: encoder_dims(NUM_FEATURES),
            decoder_dims: decoder_dims(NUM_FEATURES),
            scaler: scaler.clone(),
            training: params.clone(),
            final_loss: trained.epoch_losses.last().copied(),
            trained_rows: scaled.len(),
            trained_at: Utc::now(),
        };

        std::fs::create_dir_all(model_dir)?;
        trained.varmap.save(model_dir.join(WEIGHTS_FILE))?;
        std::fs::write(
            model_dir.join(METADATA_FILE),
            serde_json::to_string_pretty(&metadata)?,
        )?;
        log::info!("Saved model to {}", model_dir.display());

        Ok(Self {
            encoder: trained.model.into_encoder(),
            metadata,
            device,
        })
    }

    /// Reuse the persisted model if present, otherwise train and persist one.
    pub fn load_or_train(
        model_dir: &Path,
        scaled: &[[f64; NUM_FEATURES]],
        scaler: &MinMaxScaler,
        params: &TrainingParams,
    ) -> Result<Self> {
        if Self::exists(model_dir) {
            Self::load(model_dir)
        } else {
            Self::train(model_dir, scaled, scaler, params)
        }
    }

    /// Delete a persisted model, if any.
    pub fn remove(model_dir: &Path) -> Result<()> {
        for file in [WEIGHTS_FILE, METADATA_FILE] {
            let path = model_dir.join(file);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Encode scaled rows into latent vectors, one per row.
    pub fn encode(&self, scaled: &[[f64; NUM_FEATURES]]) -> Result<Vec<Vec<f32>>> {
        if scaled.is_empty() {
            return Ok(Vec::new());
        }
        let xs = rows_to_tensor(scaled, &self.device)?;
        let latent = self.encoder.forward(&xs)?.to_vec2::<f32>()?;
        debug_assert!(latent.iter().all(|v| v.len() == LATENT_DIM));
        Ok(latent)
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_rows() -> Vec<[f64; NUM_FEATURES]> {
        (0..24)
            .map(|i| {
                let t = i as f64 / 23.0;
                [t, 1.0 - t, 0.5, t * t, (1.0 - t) * 0.5]
            })
            .collect()
    }

    fn quick_params() -> TrainingParams {
        TrainingParams {
            epochs: 2,
            batch_size: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_load_without_model_is_not_trained() {
        let dir = tempfile::tempdir().unwrap();
        match EmbeddingModel::load(dir.path()) {
            Err(ModelError::NotTrained { path }) => assert_eq!(path, dir.path()),
            Err(e) => panic!("expected NotTrained, got {e}"),
            Ok(_) => panic!("expected NotTrained, got a model"),
        }
    }

    #[test]
    fn test_train_persists_and_reload_matches() {
        let dir = tempfile::tempdir().unwrap();
        let rows = toy_rows();
        let scaler = MinMaxScaler::fit(&rows);

        let trained = EmbeddingModel::train(dir.path(), &rows, &scaler, &quick_params()).unwrap();
        assert!(EmbeddingModel::exists(dir.path()));

        let loaded = EmbeddingModel::load(dir.path()).unwrap();
        let a = trained.encode(&rows).unwrap();
        let b = loaded.encode(&rows).unwrap();
        assert_eq!(a.len(), rows.len());
        assert_eq!(a[0].len(), LATENT_DIM);
        for (x, y) in a.iter().flatten().zip(b.iter().flatten()) {
            assert!((x - y).abs() < 1e-6);
        }
        assert_eq!(loaded.metadata().trained_rows, rows.len());
        assert_eq!(loaded.metadata().scaler, scaler);
    }

    #[test]
    fn test_load_or_train_reuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        let rows = toy_rows();
        let scaler = MinMaxScaler::fit(&rows);

        let first = EmbeddingModel::load_or_train(dir.path(), &rows, &scaler, &quick_params()).unwrap();
        // Different params would change the weights if training ran again
        let other = TrainingParams {
            seed: 999,
            ..quick_params()
        };
        let second = EmbeddingModel::load_or_train(dir.path(), &rows, &scaler, &other).unwrap();
        assert_eq!(second.metadata().training, first.metadata().training);
        assert_eq!(first.encode(&rows).unwrap(), second.encode(&rows).unwrap());
    }

    #[test]
    fn test_incompatible_metadata_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let rows = toy_rows();
        let scaler = MinMaxScaler::fit(&rows);
        EmbeddingModel::train(dir.path(), &rows, &scaler, &quick_params()).unwrap();

        let meta_path = dir.path().join(METADATA_FILE);
        let mut meta: ModelMetadata =
            serde_json::from_str(&std::fs::read_to_string(&meta_path).unwrap()).unwrap();
        meta.encoder_dims = vec![5, 128, 32, 16];
        std::fs::write(&meta_path, serde_json::to_string(&meta).unwrap()).unwrap();

        assert!(matches!(
            EmbeddingModel::load(dir.path()),
            Err(ModelError::Incompatible(_))
        ));
    }

    #[test]
    fn test_remove_then_retrain() {
        let dir = tempfile::tempdir().unwrap();
        let rows = toy_rows();
        let scaler = MinMaxScaler::fit(&rows);
        EmbeddingModel::train(dir.path(), &rows, &scaler, &quick_params()).unwrap();
        EmbeddingModel::remove(dir.path()).unwrap();
        assert!(!EmbeddingModel::exists(dir.path()));
        assert!(EmbeddingModel::train(dir.path(), &[], &scaler, &quick_params()).is_err());
    }
}
