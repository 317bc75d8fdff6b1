//! Training loop implementation for WGAN-GP
//!
//! Every batch runs `n_critic` critic updates followed by one generator
//! update. After each epoch a fresh classifier two-sample test decides
//! whether the generator is good enough to snapshot.

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tch::{nn, Device, Tensor};
use tracing::{debug, info, warn};

use super::history::{EpochStats, LossHistory, RunningMean};
use super::losses::{critic_loss, generator_loss};
use super::penalty::gradient_penalty;
use crate::data::{tensor_to_rows, BatchEnumerator};
use crate::error::{Result, WganError};
use crate::evaluation::{C2st, C2stScore};
use crate::model::{AdamParams, Approximator, Mode, Wgan};
use crate::utils::{plot_losses, save_checkpoint, Checkpoint, OutputConfig};

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Rows per batch
    pub batch_size: usize,
    /// Number of training epochs
    pub n_epochs: usize,
    /// Critic updates per batch
    pub n_critic: usize,
    /// Learning rate for generator
    pub lr_g: f64,
    /// Learning rate for critic
    pub lr_d: f64,
    /// Adam first moment decay (both networks)
    pub beta1: f64,
    /// Adam second moment decay (both networks)
    pub beta2: f64,
    /// Gradient penalty weight
    pub gp_weight: f64,
    /// Snapshot when |C2ST accuracy - 0.5| is at most this value
    pub stop_threshold: f64,
    /// Print a status line every N epochs
    pub report_every: usize,
    /// "cpu" or "cuda"
    pub device: String,
    /// Seed for libtorch; random when absent
    pub seed: Option<i64>,
    /// Show the epoch progress bar
    pub progress: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            n_epochs: 200,
            n_critic: 5,
            lr_g: 1e-4,
            lr_d: 1e-4,
            beta1: 0.5,
            beta2: 0.999,
            gp_weight: 10.0,
            stop_threshold: 0.05,
            report_every: 5,
            device: "cpu".to_string(),
            seed: None,
            progress: true,
        }
    }
}

impl TrainingConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(WganError::InvalidConfig(msg));

        if self.batch_size == 0 {
            return fail("Batch size must be > 0".to_string());
        }
        if self.n_epochs == 0 {
            return fail("n_epochs must be > 0".to_string());
        }
        if self.n_critic == 0 {
            return fail("n_critic must be > 0".to_string());
        }
        if self.report_every == 0 {
            return fail("report_every must be > 0".to_string());
        }
        if !(self.lr_g > 0.0 && self.lr_d > 0.0) {
            return fail(format!("Learning rates must be > 0, got {} / {}", self.lr_g, self.lr_d));
        }
        if !(0.0..1.0).contains(&self.beta1) || !(0.0..1.0).contains(&self.beta2) {
            return fail(format!("Adam betas must be in [0, 1), got {} / {}", self.beta1, self.beta2));
        }
        if !(self.gp_weight >= 0.0) {
            return fail(format!("gp_weight must be >= 0, got {}", self.gp_weight));
        }
        if !(self.stop_threshold >= 0.0 && self.stop_threshold.is_finite()) {
            return fail(format!("stop_threshold must be >= 0, got {}", self.stop_threshold));
        }
        Ok(())
    }

    /// Resolve the device string, falling back to CPU when CUDA is absent
    pub fn device(&self) -> Device {
        match self.device.as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    Device::Cuda(0)
                } else {
                    warn!("CUDA requested but not available, falling back to CPU");
                    Device::Cpu
                }
            }
            _ => Device::Cpu,
        }
    }

    fn gen_adam(&self) -> AdamParams {
        AdamParams {
            lr: self.lr_g,
            beta1: self.beta1,
            beta2: self.beta2,
        }
    }

    fn critic_adam(&self) -> AdamParams {
        AdamParams {
            lr: self.lr_d,
            beta1: self.beta1,
            beta2: self.beta2,
        }
    }
}

/// Whether an epoch's C2ST accuracy is close enough to chance level
pub fn meets_stopping_criterion(accuracy: f64, threshold: f64) -> bool {
    (accuracy - 0.5).abs() <= threshold
}

/// Whether the epoch earns a checkpoint
///
/// Non-finite epoch losses are always reported with a warning and never
/// checkpointed, whatever the C2ST accuracy.
pub fn checkpoint_due(epoch: usize, stats: &EpochStats, threshold: f64) -> bool {
    if !stats.losses_finite() {
        warn!(
            "Epoch {} has non-finite losses (D: {}, G: {}), C2ST accuracy {:.3}; no checkpoint",
            epoch, stats.critic_loss, stats.gen_loss, stats.accuracy
        );
        return false;
    }
    meets_stopping_criterion(stats.accuracy, threshold)
}

/// One status line, e.g. `[Epoch 5/200] [D loss: ...] ...`
pub fn status_line(epoch: usize, n_epochs: usize, stats: &EpochStats) -> String {
    format!(
        "[Epoch {}/{}] [D loss: {:.6}] [G loss: {:.6}] [GP: {:.6}] [C2ST: {:.6}]",
        epoch, n_epochs, stats.critic_loss, stats.gen_loss, stats.gradient_penalty, stats.accuracy
    )
}

/// Result of a finished training run
#[derive(Debug)]
pub struct TrainingReport {
    /// Per-epoch losses and accuracies
    pub history: LossHistory,
    /// Snapshots written during the run, in epoch order
    pub checkpoints: Vec<Checkpoint>,
}

/// WGAN-GP Trainer
pub struct Trainer {
    config: TrainingConfig,
    output: OutputConfig,
    evaluator: C2st,
    history: LossHistory,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig, output: OutputConfig, evaluator: C2st) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            output,
            evaluator,
            history: LossHistory::new(),
        })
    }

    /// Train the model on every full batch of `data`
    ///
    /// # Arguments
    ///
    /// * `model` - WGAN-GP model to train
    /// * `data` - Batch enumerator over the (already normalized) training table
    ///
    /// # Returns
    ///
    /// The loss history and the checkpoints written
    pub fn train(&mut self, model: &mut Wgan, data: &BatchEnumerator) -> Result<TrainingReport> {
        if data.num_features() != model.num_features() {
            return Err(WganError::DimensionMismatch {
                expected: model.num_features(),
                actual: data.num_features(),
                context: "training table vs generator output",
            });
        }
        if data.device() != model.device {
            return Err(WganError::InvalidConfig(format!(
                "training data on {:?} but model on {:?}",
                data.device(),
                model.device
            )));
        }

        let mut gen_opt = model.gen_optimizer(self.config.gen_adam())?;
        let mut critic_opt = model.critic_optimizer(self.config.critic_adam())?;

        // The C2ST compares against the whole training table every epoch
        let real_rows = tensor_to_rows(data.data())?;
        let n_epochs = self.config.n_epochs;

        info!(
            "Starting training for {} epochs, {} batches per epoch, {} critic steps per batch",
            n_epochs,
            data.num_batches(),
            self.config.n_critic
        );

        let pb = if self.config.progress {
            ProgressBar::new(n_epochs as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .map_err(|e| WganError::InvalidConfig(e.to_string()))?
                .progress_chars("##-"),
        );

        let mut checkpoints = Vec::new();

        for epoch in 1..=n_epochs {
            let (critic_mean, gen_mean, gp_mean) = self.run_epoch(model, data, &mut critic_opt, &mut gen_opt)?;

            let score = self.evaluate(model, &real_rows)?;
            model.set_mode(Mode::Train);

            let stats = EpochStats {
                critic_loss: critic_mean,
                gen_loss: gen_mean,
                gradient_penalty: gp_mean,
                accuracy: score.accuracy,
                precision: score.precision,
            };
            self.history.record_epoch(&stats);

            debug!(
                "Epoch {}/{}: D_loss={:.4}, G_loss={:.4}, GP={:.4}, C2ST acc={:.4}, prec={:.4}",
                epoch, n_epochs, stats.critic_loss, stats.gen_loss, stats.gradient_penalty, stats.accuracy, stats.precision
            );

            let saved = checkpoint_due(epoch, &stats, self.config.stop_threshold);
            if saved {
                checkpoints.push(save_checkpoint(model, &stats, epoch, &self.output)?);
            }

            // One line per epoch, even when a checkpoint lands on a report epoch
            if saved || epoch % self.config.report_every == 0 {
                pb.suspend(|| println!("{}", status_line(epoch, n_epochs, &stats)));
            }

            pb.set_message(format!("D: {:.4}, G: {:.4}, C2ST: {:.3}", stats.critic_loss, stats.gen_loss, stats.accuracy));
            pb.inc(1);
        }

        pb.finish_with_message("done");
        info!("Training finished, {} checkpoints written", checkpoints.len());

        plot_losses(&self.history, &self.output.loss_plot)?;
        if let Some(csv_path) = &self.output.loss_csv {
            self.history.save_csv(csv_path)?;
        }

        Ok(TrainingReport {
            history: self.history.clone(),
            checkpoints,
        })
    }

    /// One pass over all full batches; returns mean critic loss, generator loss and penalty
    fn run_epoch(
        &self,
        model: &mut Wgan,
        data: &BatchEnumerator,
        critic_opt: &mut nn::Optimizer,
        gen_opt: &mut nn::Optimizer,
    ) -> Result<(f64, f64, f64)> {
        model.set_mode(Mode::Train);

        let mut critic_losses = RunningMean::new();
        let mut gen_losses = RunningMean::new();
        let mut penalties = RunningMean::new();

        for (_, real) in data.iter() {
            let batch_size = real.size()[0];

            for _ in 0..self.config.n_critic {
                let (loss, penalty) = critic_step(model, &real, batch_size, self.config.gp_weight)?;
                critic_opt.zero_grad();
                loss.backward();
                critic_opt.step();

                critic_losses.push(loss.double_value(&[]));
                penalties.push(penalty);
            }

            let noise = model.generator.sample_noise(batch_size);
            let fake = model.generator.forward(&noise);
            let g_loss = generator_loss(&model.critic.forward(&fake));

            gen_opt.zero_grad();
            g_loss.backward();
            gen_opt.step();

            gen_losses.push(g_loss.double_value(&[]));
        }

        Ok((critic_losses.mean(), gen_losses.mean(), penalties.mean()))
    }

    /// C2ST of N fresh generated rows against the N training rows
    fn evaluate(&self, model: &mut Wgan, real_rows: &[Vec<f64>]) -> Result<C2stScore> {
        model.set_mode(Mode::Eval);
        let fake = model.generate(real_rows.len() as i64);
        let fake_rows = tensor_to_rows(&fake)?;
        self.evaluator.evaluate(&fake_rows, real_rows)
    }

}

/// Critic loss on one real batch; also returns the penalty value
fn critic_step(model: &Wgan, real: &Tensor, batch_size: i64, gp_weight: f64) -> Result<(Tensor, f64)> {
    let noise = model.generator.sample_noise(batch_size);
    let fake = tch::no_grad(|| model.generator.forward(&noise));

    let real_scores = model.critic.forward(real);
    let fake_scores = model.critic.forward(&fake);
    let penalty = gradient_penalty(&model.critic, real, &fake)?;

    let loss = critic_loss(&real_scores, &fake_scores, &penalty, gp_weight);
    Ok((loss, penalty.double_value(&[])))
}
