//! Model module containing the WGAN-GP networks
//!
//! This module provides:
//! - The `Approximator` capability (train/eval switch + forward pass)
//! - Generator network mapping latent noise to table rows
//! - Critic network scoring rows with an unbounded real value
//! - `Wgan` wrapper owning both networks and their variable stores

mod approximator;
mod critic;
mod generator;
mod wgan;

pub use approximator::{leaky_relu, Approximator, Mode};
pub use critic::{Critic, CriticConfig, LEAKY_SLOPE, MIN_INPUT_DIM};
pub use generator::{Generator, GeneratorConfig, NUM_STAGES};
pub use wgan::{AdamParams, Wgan};
