use candle_core::{Device, Module, Result, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::network::{build_seeded, Autoencoder};
use crate::NUM_FEATURES;

/// Fixed training budget for the autoencoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Seeds weight init and per-epoch shuffling.
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 256,
            learning_rate: 1e-3,
            seed: 42,
        }
    }
}

pub struct Trained {
    pub varmap: VarMap,
    pub model: Autoencoder,
    /// Mean reconstruction MSE per epoch.
    pub epoch_losses: Vec<f32>,
}

/// Pack scaled rows into an `(n, NUM_FEATURES)` f32 tensor.
pub fn rows_to_tensor(rows: &[[f64; NUM_FEATURES]], device: &Device) -> Result<Tensor> {
    let flat: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
    Tensor::from_vec(flat, (rows.len(), NUM_FEATURES), device)
}

/// Fit the autoencoder on (scaled, scaled) pairs with Adam and an MSE objective.
pub fn train_autoencoder(
    scaled: &[[f64; NUM_FEATURES]],
    params: &TrainingParams,
    device: &Device,
) -> Result<Trained> {
    let (varmap, model) = build_seeded(NUM_FEATURES, params.seed, device)?;
    let data = rows_to_tensor(scaled, device)?;

    let adam = ParamsAdamW {
        lr: params.learning_rate,
        weight_decay: 0.0,
        ..Default::default()
    };
    let mut opt = AdamW::new(varmap.all_vars(), adam)?;

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut order: Vec<u32> = (0..scaled.len() as u32).collect();
    let batch_size = params.batch_size.max(1);

    let pb = ProgressBar::new(params.epochs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] epoch {pos}/{len} ({eta} remaining) {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut epoch_losses = Vec::with_capacity(params.epochs);
    for epoch in 0..params.epochs {
        order.shuffle(&mut rng);

        let mut total = 0.0_f32;
        for batch in order.chunks(batch_size) {
            let idx = Tensor::from_slice(batch, batch.len(), device)?;
            let xb = data.index_select(&idx, 0)?;
            let recon = model.forward(&xb)?;
            let loss = candle_nn::loss::mse(&recon, &xb)?;
            opt.backward_step(&loss)?;
            total += loss.to_scalar::<f32>()? * batch.len() as f32;
        }

        let mean = total / scaled.len().max(1) as f32;
        log::debug!("epoch {}: loss {:.6}", epoch + 1, mean);
        pb.set_message(format!("loss {mean:.5}"));
        pb.inc(1);
        epoch_losses.push(mean);
    }
    pb.finish_with_message("done");

    Ok(Trained {
        varmap,
        model,
        epoch_losses,
    })
}
