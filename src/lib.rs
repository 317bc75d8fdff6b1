//! # WGAN-GP for Tabular Data
//!
//! This crate provides a modular implementation of a Wasserstein GAN with
//! gradient penalty for generating synthetic rows of a numeric table.
//! Convergence is judged by a classifier two-sample test (C2ST): an RBF
//! support vector classifier that should not be able to tell generated rows
//! from real ones.
//!
//! ## Modules
//!
//! - `data`: Batch enumeration and preprocessing
//! - `model`: Generator, Critic and the combined WGAN-GP model
//! - `training`: Training loop, losses and gradient penalty
//! - `evaluation`: Classifier two-sample test
//! - `utils`: Configuration, checkpoints and loss chart

pub mod data;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{denormalize_data, normalize_data, BatchEnumerator, NormalizationParams};
pub use error::{Result, WganError};
pub use evaluation::{C2st, C2stConfig, C2stScore};
pub use model::{Critic, Generator, Wgan};
pub use training::{gradient_penalty, LossHistory, Trainer, TrainingConfig, TrainingReport};
pub use utils::{best_checkpoint, list_checkpoints, save_checkpoint, Config};
