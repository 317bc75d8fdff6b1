//! Gradient penalty for the Wasserstein critic
//!
//! Penalizes the critic whenever the norm of its input gradient drifts from
//! 1 on points interpolated between real and generated rows. The returned
//! scalar keeps its graph (`create_graph = true`) so the critic optimizer can
//! backpropagate through the gradient itself.

use tch::{Kind, Tensor};

use crate::error::{Result, WganError};
use crate::model::Approximator;

/// Compute the WGAN-GP gradient penalty
///
/// # Arguments
///
/// * `critic` - Network whose input gradients are constrained
/// * `real` - Real batch of shape (batch_size, num_features)
/// * `fake` - Generated batch with the same shape as `real`
///
/// # Returns
///
/// Scalar tensor: mean over the batch of (||grad||_2 - 1)^2
pub fn gradient_penalty<C>(critic: &C, real: &Tensor, fake: &Tensor) -> Result<Tensor>
where
    C: Approximator + ?Sized,
{
    let (real_size, fake_size) = (real.size(), fake.size());
    if real_size.len() != 2 {
        return Err(WganError::InvalidConfig(format!(
            "gradient penalty expects 2D batches, got shape {:?}",
            real_size
        )));
    }
    if real_size != fake_size {
        return Err(WganError::DimensionMismatch {
            expected: real_size.iter().product(),
            actual: fake_size.iter().product(),
            context: "real vs fake batch in gradient penalty",
        });
    }

    let alpha = random_alpha(real_size[0], real);
    interpolated_penalty(critic, real, fake, &alpha)
}

/// One interpolation coefficient per row, broadcast across the row
fn random_alpha(batch_size: i64, like: &Tensor) -> Tensor {
    Tensor::rand([batch_size, 1], (Kind::Float, like.device())).expand_as(like)
}

/// Penalty for a fixed set of interpolation coefficients
pub(crate) fn interpolated_penalty<C>(critic: &C, real: &Tensor, fake: &Tensor, alpha: &Tensor) -> Result<Tensor>
where
    C: Approximator + ?Sized,
{
    // alpha * real + (1 - alpha) * fake
    let interpolates = (fake + alpha * (real - fake))
        .detach()
        .set_requires_grad(true);

    let scores = critic.forward(&interpolates);
    let summed = scores.sum(Kind::Float);

    let mut gradients = Tensor::run_backward(&[&summed], &[&interpolates], true, true);
    let gradients = gradients.pop().ok_or_else(|| {
        WganError::InvalidConfig("critic produced no gradient for its input".to_string())
    })?;

    let norms = gradients.norm_scalaropt_dim(2.0, [1i64], false);
    Ok((norms - 1.0).square().mean(Kind::Float))
}
