pub mod browse;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod mood;
pub mod preview;
pub mod recommend;
pub mod scaler;
pub mod similarity;

/// Audio feature columns fed to the scaler and the autoencoder, in order.
pub const FEATURE_COLUMNS: [&str; NUM_FEATURES] =
    ["valence", "energy", "danceability", "acousticness", "tempo"];

pub const NUM_FEATURES: usize = 5;

/// Application name for XDG paths
pub const APP_NAME: &str = "moodrec";
