//! Configuration management
//!
//! Provides unified configuration for the entire WGAN-GP pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WganError};
use crate::evaluation::{C2st, C2stConfig};
use crate::model::MIN_INPUT_DIM;
use crate::training::TrainingConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingConfig,
    /// Convergence test configuration
    pub evaluation: C2stConfig,
    /// Output locations
    pub output: OutputConfig,
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Latent dimension size
    pub latent_dim: i64,
    /// Enable batch normalization in hidden stages
    pub normalize: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            latent_dim: 32,
            normalize: false,
        }
    }
}

/// Where training artifacts are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for generator checkpoints
    pub generator_dir: PathBuf,
    /// Directory for critic checkpoints
    pub critic_dir: PathBuf,
    /// Loss curve chart, overwritten every run
    pub loss_plot: PathBuf,
    /// Optional per-epoch CSV export of the loss history
    pub loss_csv: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            generator_dir: PathBuf::from("checkpoints/generator"),
            critic_dir: PathBuf::from("checkpoints/critic"),
            loss_plot: PathBuf::from("train_loss.svg"),
            loss_csv: None,
        }
    }
}

impl OutputConfig {
    /// Outputs rooted in a single directory
    pub fn under<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            generator_dir: root.join("generator"),
            critic_dir: root.join("critic"),
            loss_plot: root.join("train_loss.svg"),
            loss_csv: Some(root.join("train_loss.csv")),
        }
    }
}

impl Config {
    /// Load configuration from a TOML or JSON file, chosen by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if is_toml(path) {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Save configuration to a TOML or JSON file, chosen by extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if is_toml(path) {
            self.save_toml(path)
        } else {
            self.save_json(path)
        }
    }

    /// Load configuration from TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        self.training.device()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.latent_dim <= 0 {
            return Err(WganError::InvalidConfig("Latent dimension must be > 0".to_string()));
        }
        self.training.validate()?;
        C2st::new(self.evaluation.clone())?;
        Ok(())
    }

    /// Validate the configuration against a training table of the given shape
    pub fn validate_for_table(&self, num_samples: usize, num_features: usize) -> Result<()> {
        self.validate()?;
        if (num_features as i64) < MIN_INPUT_DIM {
            return Err(WganError::InvalidConfig(format!(
                "training table needs at least {} columns, got {}",
                MIN_INPUT_DIM, num_features
            )));
        }
        if self.training.batch_size > num_samples {
            return Err(WganError::EmptyBatches {
                batch_size: self.training.batch_size,
                num_samples,
            });
        }
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Gamma;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.model.latent_dim, 32);
        assert_eq!(config.training.n_critic, 5);
        assert_eq!(config.training.report_every, 5);
        assert_eq!(config.evaluation.folds, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let loaded: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.model.latent_dim, loaded.model.latent_dim);
        assert_eq!(config.training.batch_size, loaded.training.batch_size);
    }

    #[test]
    fn test_config_toml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.evaluation.gamma = Gamma::Fixed(0.5);
        config.evaluation.seed = Some(9);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.evaluation.gamma, Gamma::Fixed(0.5));
        assert_eq!(loaded.evaluation.seed, Some(9));
    }

    #[test]
    fn test_config_json_file_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.training.n_epochs = 7;
        config.output = OutputConfig::under(dir.path());
        config.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.trim_start().starts_with('{'));

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.training.n_epochs, 7);
        assert_eq!(loaded.output.generator_dir, dir.path().join("generator"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.model.latent_dim = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.n_critic = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.stop_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_for_table() {
        let mut config = Config::default();
        config.training.batch_size = 20;

        assert!(config.validate_for_table(200, 10).is_ok());
        assert!(config.validate_for_table(10, 10).is_err());
        assert!(config.validate_for_table(200, 4).is_err());
    }
}
