//! Loss history for monitoring WGAN-GP progress
//!
//! Provides per-epoch records plus the running accumulators used inside one
//! epoch.

use std::path::Path;

use crate::error::Result;

/// Per-epoch losses collected during training
///
/// All sequences are appended together, so they always have the same length.
#[derive(Debug, Clone, Default)]
pub struct LossHistory {
    /// Mean critic loss per epoch
    pub critic_losses: Vec<f64>,
    /// Mean generator loss per epoch
    pub gen_losses: Vec<f64>,
    /// Mean gradient penalty per epoch
    pub gradient_penalties: Vec<f64>,
    /// C2ST accuracy per epoch
    pub c2st_accuracies: Vec<f64>,
}

impl LossHistory {
    /// Create new empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record epoch metrics
    pub fn record_epoch(&mut self, stats: &EpochStats) {
        self.critic_losses.push(stats.critic_loss);
        self.gen_losses.push(stats.gen_loss);
        self.gradient_penalties.push(stats.gradient_penalty);
        self.c2st_accuracies.push(stats.accuracy);
    }

    /// Get number of recorded epochs
    pub fn num_epochs(&self) -> usize {
        self.critic_losses.len()
    }

    /// Get latest generator loss
    pub fn latest_gen_loss(&self) -> Option<f64> {
        self.gen_losses.last().copied()
    }

    /// Get latest critic loss
    pub fn latest_critic_loss(&self) -> Option<f64> {
        self.critic_losses.last().copied()
    }

    /// Save history to CSV file
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record([
            "epoch",
            "critic_loss",
            "generator_loss",
            "gradient_penalty",
            "c2st_accuracy",
        ])?;

        for i in 0..self.num_epochs() {
            writer.write_record([
                (i + 1).to_string(),
                self.critic_losses[i].to_string(),
                self.gen_losses[i].to_string(),
                self.gradient_penalties[i].to_string(),
                self.c2st_accuracies[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Summary of one finished epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    /// Mean critic loss over every critic update
    pub critic_loss: f64,
    /// Mean generator loss over every generator update
    pub gen_loss: f64,
    /// Mean gradient penalty over every critic update
    pub gradient_penalty: f64,
    /// C2ST accuracy at the end of the epoch
    pub accuracy: f64,
    /// C2ST precision at the end of the epoch
    pub precision: f64,
}

impl EpochStats {
    /// Whether both losses are finite numbers
    pub fn losses_finite(&self) -> bool {
        self.critic_loss.is_finite() && self.gen_loss.is_finite()
    }
}

/// Running mean of scalar losses inside one epoch
#[derive(Debug, Default)]
pub struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Mean of the values pushed so far (NaN when empty)
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }

    /// Number of values pushed
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
