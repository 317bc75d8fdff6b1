//! Capability shared by the generator and the critic
//!
//! The two networks have nothing in common beyond a train/eval switch and a
//! forward pass, so the orchestrator drives them through this trait instead
//! of a shared base type.

use serde::{Deserialize, Serialize};
use tch::Tensor;

/// Execution mode of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Training-only behaviour enabled (batch norm statistics updates)
    Train,
    /// Inference behaviour
    Eval,
}

impl Mode {
    /// Value passed to `ModuleT::forward_t`
    pub fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }
}

/// Differentiable function approximator with a train/eval switch
pub trait Approximator {
    /// Switch between training and inference behaviour
    fn set_mode(&mut self, mode: Mode);

    /// Current mode
    fn mode(&self) -> Mode;

    /// Forward pass honouring the current mode
    fn forward(&self, xs: &Tensor) -> Tensor;

    /// Width of the expected input
    fn input_dim(&self) -> i64;

    /// Width of the produced output
    fn output_dim(&self) -> i64;
}

/// Leaky rectifier with an explicit negative slope
///
/// Built from `maximum` so it stays twice differentiable through the
/// gradient penalty.
pub fn leaky_relu(xs: &Tensor, slope: f64) -> Tensor {
    xs.maximum(&(xs * slope))
}
