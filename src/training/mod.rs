//! Training module for WGAN-GP
//!
//! This module provides:
//! - Training loop implementation with C2ST-gated checkpoints
//! - Wasserstein losses and the gradient penalty
//! - Training configuration and loss history

mod history;
mod losses;
mod penalty;
mod trainer;

pub use history::{EpochStats, LossHistory, RunningMean};
pub use losses::{critic_loss, generator_loss, wasserstein_estimate};
pub use penalty::gradient_penalty;
pub use trainer::{checkpoint_due, meets_stopping_criterion, status_line, Trainer, TrainingConfig, TrainingReport};
