//! Loss functions for WGAN-GP training

use tch::{Kind, Tensor};

/// Critic loss: E[C(G(z))] - E[C(x)] + lambda * GP
///
/// Minimizing it pushes real scores up and fake scores down while the
/// penalty term keeps the critic close to 1-Lipschitz.
///
/// # Arguments
///
/// * `real_scores` - Critic output on real rows
/// * `fake_scores` - Critic output on generated rows
/// * `penalty` - Gradient penalty for the same batch
/// * `gp_weight` - Penalty coefficient (lambda)
pub fn critic_loss(real_scores: &Tensor, fake_scores: &Tensor, penalty: &Tensor, gp_weight: f64) -> Tensor {
    wasserstein_estimate(real_scores, fake_scores).neg() + penalty * gp_weight
}

/// Generator loss: -E[C(G(z))]
pub fn generator_loss(fake_scores: &Tensor) -> Tensor {
    -fake_scores.mean(Kind::Float)
}

/// Estimated Wasserstein distance: E[C(x)] - E[C(G(z))]
pub fn wasserstein_estimate(real_scores: &Tensor, fake_scores: &Tensor) -> Tensor {
    real_scores.mean(Kind::Float) - fake_scores.mean(Kind::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    fn column(values: &[f32]) -> Tensor {
        Tensor::from_slice(values).view([-1, 1]).to_device(Device::Cpu)
    }

    #[test]
    fn test_critic_loss() {
        let real = column(&[1.0, 3.0]); // mean 2
        let fake = column(&[-1.0, 0.0]); // mean -0.5
        let penalty = Tensor::from(0.25f32);

        // -2 + (-0.5) + 10 * 0.25
        let loss = critic_loss(&real, &fake, &penalty, 10.0);
        assert_eq!(loss.size(), Vec::<i64>::new());
        assert!((loss.double_value(&[]) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_generator_loss() {
        let fake = column(&[2.0, 4.0]);
        let loss = generator_loss(&fake);

        assert!((loss.double_value(&[]) + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_wasserstein_estimate_sign() {
        let real = column(&[5.0, 5.0]);
        let fake = column(&[1.0, 1.0]);

        assert!(wasserstein_estimate(&real, &fake).double_value(&[]) > 0.0);
    }
}
