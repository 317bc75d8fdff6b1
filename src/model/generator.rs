//! Generator network for WGAN-GP
//!
//! The Generator maps uniform latent noise to synthetic table rows.
//! Hidden stages double in width and stay linear; the last stage is squashed
//! with tanh so every generated coordinate lies in [-1, 1].

use serde::{Deserialize, Serialize};
use tch::{nn, nn::Module, nn::ModuleT, Device, Kind, Tensor};

use super::approximator::{Approximator, Mode};

/// Number of linear stages in each network
pub const NUM_STAGES: usize = 4;

/// Epsilon used by the optional batch normalization layers
pub const BATCH_NORM_EPS: f64 = 0.8;

/// Generator network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector
    pub latent_dim: i64,
    /// Number of generated features (column count of the training table)
    pub output_dim: i64,
    /// Insert batch normalization after each hidden stage
    pub normalize: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 32,
            output_dim: 16,
            normalize: false,
        }
    }
}

impl GeneratorConfig {
    /// Widths of every stage boundary: L, 2L, 4L, 8L, D
    pub fn widths(&self) -> Vec<i64> {
        let mut widths: Vec<i64> = (0..NUM_STAGES as u32)
            .map(|i| self.latent_dim * 2i64.pow(i))
            .collect();
        widths.push(self.output_dim);
        widths
    }
}

/// Linear layer with Kaiming-normal weights and zero bias
pub(crate) fn kaiming_linear<'a>(vs: nn::Path<'a>, in_dim: i64, out_dim: i64) -> nn::Linear {
    let config = nn::LinearConfig {
        ws_init: nn::Init::Kaiming {
            dist: nn::init::NormalOrUniform::Normal,
            fan: nn::init::FanInOut::FanIn,
            non_linearity: nn::init::NonLinearity::ReLU,
        },
        bs_init: Some(nn::Init::Const(0.0)),
        bias: true,
    };
    nn::linear(vs, in_dim, out_dim, config)
}

/// Batch normalization layer matching the generator/critic convention
pub(crate) fn stage_norm<'a>(vs: nn::Path<'a>, dim: i64) -> nn::BatchNorm {
    nn::batch_norm1d(
        vs,
        dim,
        nn::BatchNormConfig {
            eps: BATCH_NORM_EPS,
            ..Default::default()
        },
    )
}

#[derive(Debug)]
struct Stage {
    linear: nn::Linear,
    norm: Option<nn::BatchNorm>,
}

/// Generator network
///
/// Architecture:
/// 1. Three linear stages L -> 2L -> 4L -> 8L (optional batch norm, no activation)
/// 2. Final linear stage 8L -> D followed by tanh
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    stages: Vec<Stage>,
    mode: Mode,
    device: Device,
}

impl Generator {
    /// Create a new Generator network under `vs`
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Self {
        let widths = config.widths();

        let stages = widths
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let is_last = i + 1 == NUM_STAGES;
                let linear = kaiming_linear(vs / format!("fc{}", i + 1), pair[0], pair[1]);
                let norm = (config.normalize && !is_last)
                    .then(|| stage_norm(vs / format!("bn{}", i + 1), pair[1]));
                Stage { linear, norm }
            })
            .collect();

        Self {
            config,
            stages,
            mode: Mode::Train,
            device: vs.device(),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, output_dim) with values in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, train: bool) -> Tensor {
        let mut x = noise.shallow_clone();
        for stage in &self.stages {
            x = stage.linear.forward(&x);
            if let Some(norm) = &stage.norm {
                x = norm.forward_t(&x, train);
            }
        }
        x.tanh()
    }

    /// Draw a batch of latent vectors uniformly from [0, 1)
    pub fn sample_noise(&self, num_samples: i64) -> Tensor {
        Tensor::rand([num_samples, self.config.latent_dim], (Kind::Float, self.device))
    }

    /// Generate `num_samples` rows without tracking gradients
    pub fn generate(&self, num_samples: i64) -> Tensor {
        let noise = self.sample_noise(num_samples);
        tch::no_grad(|| self.forward(&noise))
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Device holding the parameters
    pub fn device(&self) -> Device {
        self.device
    }
}

impl Approximator for Generator {
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
        self.config.latent_dim
    }

    fn output_dim(&self) -> i64 {
        self.config.output_dim
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}
