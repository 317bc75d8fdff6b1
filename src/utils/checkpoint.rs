//! Checkpoint save/discovery utilities
//!
//! A checkpoint is a pair of parameter snapshots (generator and critic)
//! named after the epoch and the C2ST accuracy that triggered it, plus a
//! JSON sidecar next to the generator snapshot.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::config::OutputConfig;
use crate::error::{Result, WganError};
use crate::model::Wgan;
use crate::training::EpochStats;

const GENERATOR_PREFIX: &str = "generator";
const CRITIC_PREFIX: &str = "critic";

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epoch (1-based) that produced the snapshot
    pub epoch: usize,
    /// C2ST accuracy at that epoch
    pub accuracy: f64,
    /// C2ST precision at that epoch
    pub precision: f64,
    /// Epoch-mean critic loss
    pub critic_loss: f64,
    /// Epoch-mean generator loss
    pub gen_loss: f64,
    /// Epoch-mean gradient penalty
    pub gradient_penalty: f64,
    /// Latent dimension of the generator
    pub latent_dim: i64,
    /// Number of table columns
    pub num_features: i64,
    /// Whether hidden stages use batch normalization
    pub normalize: bool,
    /// Timestamp of checkpoint
    pub timestamp: String,
}

/// Paths written for one checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// Epoch (1-based)
    pub epoch: usize,
    /// C2ST accuracy that triggered the save
    pub accuracy: f64,
    /// Generator parameter snapshot
    pub generator_path: PathBuf,
    /// Critic parameter snapshot
    pub critic_path: PathBuf,
}

/// File name of a snapshot, e.g. `generator_n_12_acc_0.487.pt`
pub fn checkpoint_file_name(prefix: &str, epoch: usize, accuracy: f64) -> String {
    format!("{}_n_{}_acc_{:.3}.pt", prefix, epoch, accuracy)
}

/// Path of the metadata sidecar belonging to a generator snapshot
pub fn meta_path(generator_path: &Path) -> PathBuf {
    generator_path.with_extension("json")
}

/// Save both networks and the metadata sidecar
///
/// # Arguments
///
/// * `model` - Model to snapshot
/// * `stats` - Summary of the epoch that triggered the save
/// * `epoch` - Epoch number (1-based)
/// * `output` - Target directories
pub fn save_checkpoint(model: &Wgan, stats: &EpochStats, epoch: usize, output: &OutputConfig) -> Result<Checkpoint> {
    std::fs::create_dir_all(&output.generator_dir)?;
    std::fs::create_dir_all(&output.critic_dir)?;

    let generator_path = output
        .generator_dir
        .join(checkpoint_file_name(GENERATOR_PREFIX, epoch, stats.accuracy));
    let critic_path = output
        .critic_dir
        .join(checkpoint_file_name(CRITIC_PREFIX, epoch, stats.accuracy));

    model.save_generator(&generator_path)?;
    model.save_critic(&critic_path)?;

    let meta = CheckpointMeta {
        epoch,
        accuracy: stats.accuracy,
        precision: stats.precision,
        critic_loss: stats.critic_loss,
        gen_loss: stats.gen_loss,
        gradient_penalty: stats.gradient_penalty,
        latent_dim: model.latent_dim(),
        num_features: model.num_features(),
        normalize: model.generator.config().normalize,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    std::fs::write(meta_path(&generator_path), serde_json::to_string_pretty(&meta)?)?;

    tracing::info!("Saved checkpoint to {}", generator_path.display());
    Ok(Checkpoint {
        epoch,
        accuracy: stats.accuracy,
        generator_path,
        critic_path,
    })
}

/// Load the metadata sidecar of a generator snapshot
pub fn load_checkpoint_meta<P: AsRef<Path>>(generator_path: P) -> Result<CheckpointMeta> {
    let path = meta_path(generator_path.as_ref());
    let content = std::fs::read_to_string(&path)
        .map_err(|e| WganError::Checkpoint(format!("cannot read {}: {}", path.display(), e)))?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// List all generator checkpoints in a directory, ordered by epoch
pub fn list_checkpoints<P: AsRef<Path>>(dir: P) -> Vec<(PathBuf, CheckpointMeta)> {
    let path = dir.as_ref();
    if !path.exists() {
        return vec![];
    }

    let mut checkpoints: Vec<_> = std::fs::read_dir(path)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "pt").unwrap_or(false))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("generator_n_"))
                .unwrap_or(false)
        })
        .filter_map(|p| load_checkpoint_meta(&p).ok().map(|meta| (p, meta)))
        .collect();

    checkpoints.sort_by_key(|(_, meta)| meta.epoch);
    checkpoints
}

/// Checkpoint whose accuracy is closest to chance level; later epochs win ties
pub fn best_checkpoint<P: AsRef<Path>>(dir: P) -> Option<(PathBuf, CheckpointMeta)> {
    list_checkpoints(dir).into_iter().min_by(|(_, a), (_, b)| {
        let da = (a.accuracy - 0.5).abs();
        let db = (b.accuracy - 0.5).abs();
        da.total_cmp(&db).then(b.epoch.cmp(&a.epoch))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;
    use tempfile::tempdir;

    fn stats(accuracy: f64) -> EpochStats {
        EpochStats {
            critic_loss: -1.5,
            gen_loss: 0.25,
            gradient_penalty: 0.05,
            accuracy,
            precision: 0.5,
        }
    }

    #[test]
    fn test_checkpoint_file_name() {
        assert_eq!(checkpoint_file_name("generator", 12, 0.4873), "generator_n_12_acc_0.487.pt");
        assert_eq!(checkpoint_file_name("critic", 3, 0.5), "critic_n_3_acc_0.500.pt");
    }

    #[test]
    fn test_save_and_list_checkpoints() {
        let dir = tempdir().unwrap();
        let output = OutputConfig::under(dir.path());
        let model = Wgan::for_table(8, 3, false, Device::Cpu).unwrap();

        let first = save_checkpoint(&model, &stats(0.62), 4, &output).unwrap();
        let second = save_checkpoint(&model, &stats(0.51), 9, &output).unwrap();

        assert!(first.generator_path.exists());
        assert!(first.critic_path.exists());
        assert!(meta_path(&second.generator_path).exists());

        let listed = list_checkpoints(&output.generator_dir);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].1.epoch, 4);
        assert_eq!(listed[1].1.num_features, 8);

        let (best, meta) = best_checkpoint(&output.generator_dir).unwrap();
        assert_eq!(best, second.generator_path);
        assert_eq!(meta.epoch, 9);
    }

    #[test]
    fn test_list_checkpoints_missing_dir() {
        let dir = tempdir().unwrap();
        assert!(list_checkpoints(dir.path().join("absent")).is_empty());
        assert!(best_checkpoint(dir.path().join("absent")).is_none());
    }

    #[test]
    fn test_checkpoint_meta_serialization() {
        let meta = CheckpointMeta {
            epoch: 10,
            accuracy: 0.5,
            precision: 0.4,
            critic_loss: -0.6,
            gen_loss: 0.5,
            gradient_penalty: 0.01,
            latent_dim: 5,
            num_features: 10,
            normalize: false,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&meta).unwrap();
        let loaded: CheckpointMeta = serde_json::from_str(&json).unwrap();

        assert_eq!(meta.epoch, loaded.epoch);
        assert_eq!(meta.num_features, loaded.num_features);
    }
}
