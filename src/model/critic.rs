//! Critic network for WGAN-GP
//!
//! The Critic scores how real a table row looks. Its output is an unbounded
//! scalar (no sigmoid) so that the mean score difference estimates the
//! Wasserstein distance.

use serde::{Deserialize, Serialize};
use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::approximator::{leaky_relu, Approximator, Mode};
use super::generator::{kaiming_linear, stage_norm, NUM_STAGES};

/// Negative slope of the critic activations
pub const LEAKY_SLOPE: f64 = 0.2;

/// Smallest feature count for which every critic stage keeps a non-zero width
pub const MIN_INPUT_DIM: i64 = 8;

/// Critic network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticConfig {
    /// Number of input features (column count of the training table)
    pub input_dim: i64,
    /// Insert batch normalization after each hidden stage
    pub normalize: bool,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            input_dim: 16,
            normalize: false,
        }
    }
}

impl CriticConfig {
    /// Widths of every stage boundary: D, D/2, D/4, D/8, 1
    pub fn widths(&self) -> Vec<i64> {
        let mut widths: Vec<i64> = (0..NUM_STAGES as u32 - 1)
            .map(|i| self.input_dim / 2i64.pow(i))
            .collect();
        widths.push(self.input_dim / 8);
        widths.push(1);
        widths
    }
}

#[derive(Debug)]
struct Stage {
    linear: nn::Linear,
    norm: Option<nn::BatchNorm>,
}

/// Critic network
///
/// Architecture:
/// 1. Three linear stages D -> D/2 -> D/4 -> D/8, each followed by LeakyReLU(0.2)
/// 2. Final linear stage D/8 -> 1 with no output activation
#[derive(Debug)]
pub struct Critic {
    config: CriticConfig,
    hidden: Vec<Stage>,
    head: nn::Linear,
    mode: Mode,
}

impl Critic {
    /// Create a new Critic network under `vs`
    pub fn new(vs: &nn::Path, config: CriticConfig) -> Self {
        let widths = config.widths();
        let (head_in, hidden_bounds) = (widths[NUM_STAGES - 1], &widths[..NUM_STAGES]);

        let hidden = hidden_bounds
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Stage {
                linear: kaiming_linear(vs / format!("fc{}", i + 1), pair[0], pair[1]),
                norm: config
                    .normalize
                    .then(|| stage_norm(vs / format!("bn{}", i + 1), pair[1])),
            })
            .collect();

        let head = kaiming_linear(vs / "head", head_in, 1);

        Self {
            config,
            hidden,
            head,
            mode: Mode::Train,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape (batch_size, input_dim)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1) with raw scores
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        let mut x = input.shallow_clone();
        for stage in &self.hidden {
            x = stage.linear.forward(&x);
            if let Some(norm) = &stage.norm {
                x = norm.forward_t(&x, train);
            }
            x = leaky_relu(&x, LEAKY_SLOPE);
        }
        self.head.forward(&x)
    }

    /// Get configuration
    pub fn config(&self) -> &CriticConfig {
        &self.config
    }
}

impl Approximator for Critic {
    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn forward(&self, xs: &Tensor) -> Tensor {
        self.forward_t(xs, self.mode.is_train())
    }

    fn input_dim(&self) -> i64 {
        self.config.input_dim
    }

    fn output_dim(&self) -> i64 {
        1
    }
}

impl ModuleT for Critic {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Critic::forward_t(self, xs, train)
    }
}
