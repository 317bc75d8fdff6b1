//! Utility modules
//!
//! - Configuration management
//! - Checkpoint saving and discovery
//! - Loss curve chart

mod checkpoint;
mod config;
mod plot;

pub use checkpoint::{
    best_checkpoint, checkpoint_file_name, list_checkpoints, load_checkpoint_meta, meta_path, save_checkpoint,
    Checkpoint, CheckpointMeta,
};
pub use config::{Config, ModelConfig, OutputConfig};
pub use plot::plot_losses;
