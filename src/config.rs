use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::embedding::train::TrainingParams;

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Song dataset CSV.
    pub dataset_path: PathBuf,
    /// Directory holding the persisted autoencoder.
    pub model_dir: PathBuf,
    /// Directory for cleaned-data and recommendation CSVs.
    pub output_dir: PathBuf,
    /// How many recommendations to compute per query.
    pub top_n: usize,
    /// Rows per page in the console pager.
    pub page_size: usize,
    /// Autoencoder training budget.
    pub training: TrainingParams,
    /// Preview-audio lookup settings.
    pub preview: PreviewConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("dataset/spotify_dataset.csv"),
            model_dir: PathBuf::from("model"),
            output_dir: PathBuf::from("output"),
            top_n: 100,
            page_size: 5,
            training: TrainingParams::default(),
            preview: PreviewConfig::default(),
        }
    }
}

/// Preview lookup API configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Set to false to skip all network lookups.
    pub enabled: bool,
    /// Search API base URL.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.deezer.com".to_string(),
            timeout_secs: 10,
        }
    }
}

impl PreviewConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl AppConfig {
    /// Load config from `~/.config/moodrec/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn cleaned_data_path(&self) -> PathBuf {
        self.output_dir.join("cleaned_data.csv")
    }

    pub fn recommendations_path(&self) -> PathBuf {
        self.output_dir.join("recommendations.csv")
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.top_n, 100);
        assert_eq!(config.page_size, 5);
        assert_eq!(config.training, TrainingParams::default());
        assert!(config.preview.enabled);
        assert_eq!(config.recommendations_path(), PathBuf::from("output/recommendations.csv"));
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config = AppConfig::parse(
            r#"
            model_dir = "/tmp/models"
            page_size = 10

            [training]
            epochs = 25

            [preview]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.training.epochs, 25);
        assert_eq!(config.training.batch_size, 256);
        assert!(!config.preview.enabled);
        assert_eq!(config.preview.base_url, "https://api.deezer.com");
    }

    #[test]
    fn test_bad_type_is_an_error() {
        assert!(AppConfig::parse("top_n = \"many\"").is_err());
    }
}
