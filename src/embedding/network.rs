use candle_core::{DType, Device, Module, Result, Tensor};
use candle_nn::{linear, Linear, VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Hidden layer widths, mirrored between encoder and decoder.
pub const HIDDEN_DIMS: [usize; 2] = [64, 32];
/// Width of the latent embedding.
pub const LATENT_DIM: usize = 16;

/// Weight-name prefix of the encoder half. Inference binds to this name only.
pub const ENCODER_PREFIX: &str = "encoder";
/// Weight-name prefix of the decoder half.
pub const DECODER_PREFIX: &str = "decoder";

/// Layer widths of the encoder: input → 64 → 32 → 16.
pub fn encoder_dims(input_dim: usize) -> Vec<usize> {
    let mut dims = vec![input_dim];
    dims.extend(HIDDEN_DIMS);
    dims.push(LATENT_DIM);
    dims
}

/// Layer widths of the decoder: 16 → 32 → 64 → input.
pub fn decoder_dims(input_dim: usize) -> Vec<usize> {
    let mut dims = encoder_dims(input_dim);
    dims.reverse();
    dims
}

/// Dense stack named `<prefix>.l<i>.{weight,bias}`.
fn dense_stack(dims: &[usize], vb: &VarBuilder) -> Result<Vec<Linear>> {
    dims.windows(2)
        .enumerate()
        .map(|(i, w)| linear(w[0], w[1], vb.pp(format!("l{i}"))))
        .collect()
}

/// Feature vector → latent vector. ReLU after every layer.
pub struct Encoder {
    layers: Vec<Linear>,
}

impl Encoder {
    pub fn new(input_dim: usize, vb: VarBuilder) -> Result<Self> {
        let layers = dense_stack(&encoder_dims(input_dim), &vb)?;
        Ok(Self { layers })
    }
}

impl Module for Encoder {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut h = xs.clone();
        for layer in &self.layers {
            h = layer.forward(&h)?.relu()?;
        }
        Ok(h)
    }
}

/// Latent vector → reconstructed feature vector. ReLU on hidden layers,
/// sigmoid on the output so reconstructions stay in the scaled [0, 1] range.
pub struct Decoder {
    layers: Vec<Linear>,
}

impl Decoder {
    pub fn new(input_dim: usize, vb: VarBuilder) -> Result<Self> {
        let layers = dense_stack(&decoder_dims(input_dim), &vb)?;
        Ok(Self { layers })
    }
}

impl Module for Decoder {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut h = xs.clone();
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h)?;
            h = if i == last {
                candle_nn::ops::sigmoid(&h)?
            } else {
                h.relu()?
            };
        }
        Ok(h)
    }
}

pub struct Autoencoder {
    encoder: Encoder,
    decoder: Decoder,
}

impl Autoencoder {
    pub fn new(input_dim: usize, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            encoder: Encoder::new(input_dim, vb.pp(ENCODER_PREFIX))?,
            decoder: Decoder::new(input_dim, vb.pp(DECODER_PREFIX))?,
        })
    }

    pub fn into_encoder(self) -> Encoder {
        self.encoder
    }
}

impl Module for Autoencoder {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.decoder.forward(&self.encoder.forward(xs)?)
    }
}

/// Build a fresh autoencoder whose weights are Glorot-uniform initialised from
/// `seed` (biases zero), so two builds with the same seed are identical.
pub fn build_seeded(input_dim: usize, seed: u64, device: &Device) -> Result<(VarMap, Autoencoder)> {
    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = Autoencoder::new(input_dim, vb)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let halves = [
        (ENCODER_PREFIX, encoder_dims(input_dim)),
        (DECODER_PREFIX, decoder_dims(input_dim)),
    ];
    for (prefix, dims) in &halves {
        for (i, w) in dims.windows(2).enumerate() {
            let (fan_in, fan_out) = (w[0], w[1]);
            let limit = (6.0 / (fan_in + fan_out) as f64).sqrt() as f32;
            let weights: Vec<f32> = (0..fan_in * fan_out)
                .map(|_| rng.gen_range(-limit..limit))
                .collect();
            let weight = Tensor::from_vec(weights, (fan_out, fan_in), device)?;
            let bias = Tensor::zeros(fan_out, DType::F32, device)?;
            varmap.set_one(format!("{prefix}.l{i}.weight"), &weight)?;
            varmap.set_one(format!("{prefix}.l{i}.bias"), &bias)?;
        }
    }

    Ok((varmap, model))
}
