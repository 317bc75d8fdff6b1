//! WGAN-GP wrapper combining Generator and Critic
//!
//! Owns one variable store per network so each can be optimized and
//! checkpointed on its own.

use std::path::Path;

use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Tensor};

use super::approximator::{Approximator, Mode};
use super::critic::{Critic, CriticConfig, MIN_INPUT_DIM};
use super::generator::{Generator, GeneratorConfig};
use crate::error::{Result, WganError};

/// Adam hyperparameters for one of the two networks
#[derive(Debug, Clone, Copy)]
pub struct AdamParams {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
}

/// Complete WGAN-GP model
pub struct Wgan {
    /// Generator network
    pub generator: Generator,
    /// Critic network
    pub critic: Critic,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for critic
    pub critic_vs: VarStore,
    /// Device (CPU/GPU), fixed for the lifetime of the model
    pub device: Device,
}

impl Wgan {
    /// Create a new WGAN-GP model
    ///
    /// Fails when the generator output width differs from the critic input
    /// width, or when the critic would collapse a stage to zero width.
    pub fn new(gen_config: GeneratorConfig, critic_config: CriticConfig, device: Device) -> Result<Self> {
        if gen_config.latent_dim <= 0 {
            return Err(WganError::InvalidConfig(format!(
                "latent_dim must be > 0, got {}",
                gen_config.latent_dim
            )));
        }
        if gen_config.output_dim != critic_config.input_dim {
            return Err(WganError::DimensionMismatch {
                expected: critic_config.input_dim,
                actual: gen_config.output_dim,
                context: "generator output vs critic input",
            });
        }
        if critic_config.input_dim < MIN_INPUT_DIM {
            return Err(WganError::InvalidConfig(format!(
                "critic needs at least {} input features, got {}",
                MIN_INPUT_DIM, critic_config.input_dim
            )));
        }

        let gen_vs = VarStore::new(device);
        let critic_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), gen_config);
        let critic = Critic::new(&critic_vs.root(), critic_config);

        Ok(Self {
            generator,
            critic,
            gen_vs,
            critic_vs,
            device,
        })
    }

    /// Create a model for a table with `num_features` columns
    pub fn for_table(num_features: i64, latent_dim: i64, normalize: bool, device: Device) -> Result<Self> {
        let gen_config = GeneratorConfig {
            latent_dim,
            output_dim: num_features,
            normalize,
        };
        let critic_config = CriticConfig {
            input_dim: num_features,
            normalize,
        };
        Self::new(gen_config, critic_config, device)
    }

    /// Generate `num_samples` synthetic rows
    pub fn generate(&self, num_samples: i64) -> Tensor {
        self.generator.generate(num_samples)
    }

    /// Build the generator optimizer
    pub fn gen_optimizer(&self, params: AdamParams) -> Result<nn::Optimizer> {
        build_adam(&self.gen_vs, params)
    }

    /// Build the critic optimizer
    pub fn critic_optimizer(&self, params: AdamParams) -> Result<nn::Optimizer> {
        build_adam(&self.critic_vs, params)
    }

    /// Put both networks in the same mode
    pub fn set_mode(&mut self, mode: Mode) {
        self.generator.set_mode(mode);
        self.critic.set_mode(mode);
    }

    /// Save a snapshot of the generator parameters
    pub fn save_generator<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.gen_vs.save(path)?;
        Ok(())
    }

    /// Save a snapshot of the critic parameters
    pub fn save_critic<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.critic_vs.save(path)?;
        Ok(())
    }

    /// Restore generator parameters from a snapshot
    pub fn load_generator<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.gen_vs.load(path)?;
        Ok(())
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.generator.config().latent_dim
    }

    /// Get number of features
    pub fn num_features(&self) -> i64 {
        self.generator.config().output_dim
    }
}

fn build_adam(vs: &VarStore, params: AdamParams) -> Result<nn::Optimizer> {
    let adam = nn::Adam {
        beta1: params.beta1,
        beta2: params.beta2,
        ..Default::default()
    };
    Ok(adam.build(vs, params.lr)?)
}
