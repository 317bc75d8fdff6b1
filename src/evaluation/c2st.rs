//! Classifier two-sample test (C2ST)
//!
//! Trains a fresh RBF support vector classifier to tell generated rows
//! (class 0) from real rows (class 1) under stratified k-fold
//! cross-validation.
//! Mean accuracy near 0.5 means the classifier is at chance level, i.e. the
//! generator's samples are indistinguishable from the training table.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::{accuracy, precision};
use smartcore::svm::svc::{SVCParameters, SVC};
use smartcore::svm::Kernels;
use tracing::debug;

use crate::error::{Result, WganError};

/// Label of generated rows
pub const FAKE_LABEL: i32 = 0;
/// Label of real rows
pub const REAL_LABEL: i32 = 1;

/// RBF kernel width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamma {
    /// 1 / (num_features * variance of the pooled rows)
    Scale,
    /// Fixed value
    Fixed(f64),
}

/// C2ST configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct C2stConfig {
    /// Number of cross-validation folds
    pub folds: usize,
    /// SVM soft-margin penalty
    pub c: f64,
    /// RBF kernel width
    pub gamma: Gamma,
    /// Seed for the pool shuffle and the SVM solver; random when absent
    pub seed: Option<u64>,
}

impl Default for C2stConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            c: 1.0,
            gamma: Gamma::Scale,
            seed: None,
        }
    }
}

/// Cross-validated scores of one C2ST run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct C2stScore {
    /// Mean accuracy across folds
    pub accuracy: f64,
    /// Mean precision (real class) across folds
    pub precision: f64,
}

/// Classifier two-sample test evaluator
#[derive(Debug, Clone, Default)]
pub struct C2st {
    config: C2stConfig,
}

impl C2st {
    /// Create a new evaluator
    pub fn new(config: C2stConfig) -> Result<Self> {
        if config.folds < 2 {
            return Err(WganError::InvalidConfig(format!(
                "C2ST needs at least 2 folds, got {}",
                config.folds
            )));
        }
        if !(config.c > 0.0 && config.c.is_finite()) {
            return Err(WganError::InvalidConfig(format!("SVM C must be > 0, got {}", config.c)));
        }
        if let Gamma::Fixed(gamma) = config.gamma {
            if !(gamma > 0.0 && gamma.is_finite()) {
                return Err(WganError::InvalidConfig(format!("RBF gamma must be > 0, got {}", gamma)));
            }
        }
        Ok(Self { config })
    }

    /// Get configuration
    pub fn config(&self) -> &C2stConfig {
        &self.config
    }

    /// Score how well a classifier separates `fake` from `real`
    ///
    /// # Arguments
    ///
    /// * `fake` - Generated rows (class 0)
    /// * `real` - Real rows (class 1)
    pub fn evaluate(&self, fake: &[Vec<f64>], real: &[Vec<f64>]) -> Result<C2stScore> {
        let num_features = real.first().map(Vec::len).unwrap_or(0);
        if num_features == 0 {
            return Err(WganError::Evaluation("real sample set is empty".to_string()));
        }
        if let Some(row) = fake.iter().chain(real.iter()).find(|row| row.len() != num_features) {
            return Err(WganError::DimensionMismatch {
                expected: num_features as i64,
                actual: row.len() as i64,
                context: "C2ST pool row width",
            });
        }

        let (pool, labels) = self.shuffled_pool(fake, real);
        if pool.len() < self.config.folds {
            return Err(WganError::Evaluation(format!(
                "{} pooled rows cannot be split into {} folds",
                pool.len(),
                self.config.folds
            )));
        }

        let gamma = match self.config.gamma {
            Gamma::Scale => scale_gamma(&pool),
            Gamma::Fixed(gamma) => gamma,
        };

        let mut accuracies = Vec::with_capacity(self.config.folds);
        let mut precisions = Vec::with_capacity(self.config.folds);

        for (train_idx, test_idx) in stratified_folds(&labels, self.config.folds) {
            let (fold_accuracy, fold_precision) =
                self.score_fold(&pool, &labels, &train_idx, &test_idx, gamma)?;
            accuracies.push(fold_accuracy);
            precisions.push(fold_precision);
        }

        let score = C2stScore {
            accuracy: mean(&accuracies),
            precision: mean(&precisions),
        };
        debug!(
            "C2ST over {} rows (gamma={:.4}): accuracy={:.4}, precision={:.4}",
            pool.len(),
            gamma,
            score.accuracy,
            score.precision
        );
        Ok(score)
    }

    /// Concatenate fake and real rows, label them and shuffle jointly
    fn shuffled_pool(&self, fake: &[Vec<f64>], real: &[Vec<f64>]) -> (Vec<Vec<f64>>, Vec<i32>) {
        let labelled: Vec<(&Vec<f64>, i32)> = fake
            .iter()
            .map(|row| (row, FAKE_LABEL))
            .chain(real.iter().map(|row| (row, REAL_LABEL)))
            .collect();

        let mut order: Vec<usize> = (0..labelled.len()).collect();
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        order.shuffle(&mut rng);

        order
            .into_iter()
            .map(|i| (labelled[i].0.clone(), labelled[i].1))
            .unzip()
    }

    /// Fit a fresh classifier on one fold and score it on the held-out rows
    fn score_fold(
        &self,
        pool: &[Vec<f64>],
        labels: &[i32],
        train_idx: &[usize],
        test_idx: &[usize],
        gamma: f64,
    ) -> Result<(f64, f64)> {
        let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| pool[i].clone()).collect();
        let test_rows: Vec<Vec<f64>> = test_idx.iter().map(|&i| pool[i].clone()).collect();

        // The SVM works on -1 / +1 targets
        let train_targets: Vec<i32> = train_idx.iter().map(|&i| svm_target(labels[i])).collect();
        if train_targets.iter().all(|&t| t == train_targets[0]) {
            return Err(WganError::Evaluation(
                "training fold contains a single class".to_string(),
            ));
        }

        let x_train = DenseMatrix::from_2d_vec(&train_rows)
            .map_err(|e| WganError::Evaluation(format!("Failed to create feature matrix: {:?}", e)))?;
        let x_test = DenseMatrix::from_2d_vec(&test_rows)
            .map_err(|e| WganError::Evaluation(format!("Failed to create feature matrix: {:?}", e)))?;

        let params: SVCParameters<f64, i32, DenseMatrix<f64>, Vec<i32>> = SVCParameters::default()
            .with_c(self.config.c)
            .with_kernel(Kernels::rbf().with_gamma(gamma))
            .with_seed(self.config.seed);

        let model = SVC::fit(&x_train, &train_targets, &params)
            .map_err(|e| WganError::Evaluation(format!("{:?}", e)))?;
        let decisions = model
            .predict(&x_test)
            .map_err(|e| WganError::Evaluation(format!("{:?}", e)))?;

        let y_true: Vec<i32> = test_idx.iter().map(|&i| labels[i]).collect();
        let y_pred: Vec<i32> = decisions
            .iter()
            .map(|&d| if d > 0.0 { REAL_LABEL } else { FAKE_LABEL })
            .collect();

        let fold_accuracy = accuracy(&y_true, &y_pred);
        // No predicted positives: precision is reported as 0
        let fold_precision = if y_pred.contains(&REAL_LABEL) {
            let true_real: Vec<f64> = y_true.iter().map(|&l| l as f64).collect();
            let pred_real: Vec<f64> = y_pred.iter().map(|&l| l as f64).collect();
            precision(&true_real, &pred_real)
        } else {
            0.0
        };

        Ok((fold_accuracy, fold_precision))
    }
}

/// Stratified k-fold split: every test fold gets a near-equal share of each class
///
/// Members of each class are dealt round-robin over the folds, continuing
/// where the previous class stopped, so fold sizes differ by at most one.
fn stratified_folds(labels: &[i32], k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let mut test_folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut dealt = 0;
    for class in [FAKE_LABEL, REAL_LABEL] {
        for i in (0..labels.len()).filter(|&i| labels[i] == class) {
            test_folds[dealt % k].push(i);
            dealt += 1;
        }
    }

    test_folds
        .into_iter()
        .map(|mut test_idx| {
            test_idx.sort_unstable();
            let train_idx = (0..labels.len())
                .filter(|i| test_idx.binary_search(i).is_err())
                .collect();
            (train_idx, test_idx)
        })
        .collect()
}

fn svm_target(label: i32) -> i32 {
    if label == REAL_LABEL {
        1
    } else {
        -1
    }
}

/// Kernel width 1 / (num_features * Var(X)), falling back to 1 for constant pools
fn scale_gamma(pool: &[Vec<f64>]) -> f64 {
    let num_features = pool.first().map(Vec::len).unwrap_or(0);
    let count = (pool.len() * num_features) as f64;
    if count == 0.0 {
        return 1.0;
    }

    let mean = pool.iter().flatten().sum::<f64>() / count;
    let variance = pool.iter().flatten().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    if variance > 0.0 {
        1.0 / (num_features as f64 * variance)
    } else {
        1.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn cloud(rng: &mut StdRng, rows: usize, cols: usize, center: f64, spread: f64) -> Vec<Vec<f64>> {
        (0..rows)
            .map(|_| (0..cols).map(|_| center + spread * (rng.gen::<f64>() - 0.5)).collect())
            .collect()
    }

    fn seeded(seed: u64) -> C2st {
        C2st::new(C2stConfig {
            seed: Some(seed),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_c2st_separable_clouds() {
        let mut rng = StdRng::seed_from_u64(1);
        let fake = cloud(&mut rng, 40, 4, -0.8, 0.2);
        let real = cloud(&mut rng, 40, 4, 0.8, 0.2);

        let score = seeded(7).evaluate(&fake, &real).unwrap();
        assert!(score.accuracy > 0.9);
        assert!(score.precision > 0.9);
    }

    #[test]
    fn test_c2st_scores_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(2);
        let fake = cloud(&mut rng, 30, 3, 0.0, 1.0);
        let real = cloud(&mut rng, 30, 3, 0.0, 1.0);

        let score = seeded(3).evaluate(&fake, &real).unwrap();
        assert!((0.0..=1.0).contains(&score.accuracy));
        assert!((0.0..=1.0).contains(&score.precision));
    }

    #[test]
    fn test_c2st_deterministic_with_seed() {
        let mut rng = StdRng::seed_from_u64(4);
        let fake = cloud(&mut rng, 25, 3, -0.2, 1.0);
        let real = cloud(&mut rng, 25, 3, 0.2, 1.0);

        let evaluator = seeded(11);
        let first = evaluator.evaluate(&fake, &real).unwrap();
        let second = evaluator.evaluate(&fake, &real).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_shuffle_keeps_pairs() {
        let fake = vec![vec![-1.0, -1.0]; 6];
        let real = vec![vec![1.0, 1.0]; 6];

        let (pool, labels) = seeded(5).shuffled_pool(&fake, &real);
        assert_eq!(pool.len(), 12);
        for (row, label) in pool.iter().zip(labels.iter()) {
            let expected = if *label == REAL_LABEL { 1.0 } else { -1.0 };
            assert_eq!(row[0], expected);
        }
        assert_eq!(labels.iter().filter(|&&l| l == REAL_LABEL).count(), 6);
    }

    #[test]
    fn test_scale_gamma() {
        let pool = vec![vec![0.0, 2.0], vec![2.0, 0.0]];
        // mean 1, variance 1, two features
        assert!((scale_gamma(&pool) - 0.5).abs() < 1e-12);

        let constant = vec![vec![3.0, 3.0]; 4];
        assert_eq!(scale_gamma(&constant), 1.0);
    }

    #[test]
    fn test_c2st_rejects_tiny_pool() {
        let fake = vec![vec![0.0, 1.0]];
        let real = vec![vec![1.0, 0.0]];

        let result = seeded(1).evaluate(&fake, &real);
        assert!(matches!(result, Err(WganError::Evaluation(_))));
    }

    #[test]
    fn test_c2st_rejects_ragged_rows() {
        let fake = vec![vec![0.0, 1.0, 2.0]; 5];
        let real = vec![vec![1.0, 0.0]; 5];

        let result = seeded(1).evaluate(&fake, &real);
        assert!(matches!(result, Err(WganError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_c2st_config_validation() {
        let config = C2stConfig {
            folds: 1,
            ..Default::default()
        };
        assert!(C2st::new(config).is_err());

        let config = C2stConfig {
            gamma: Gamma::Fixed(-1.0),
            ..Default::default()
        };
        assert!(C2st::new(config).is_err());
    }

    #[test]
    fn test_stratified_folds_balance_classes() {
        // 13 fake and 9 real rows in a mixed order
        let labels: Vec<i32> = (0..22).map(|i| if i % 5 < 3 && i < 21 { FAKE_LABEL } else { REAL_LABEL }).collect();
        let num_fake = labels.iter().filter(|&&l| l == FAKE_LABEL).count();
        assert_eq!(num_fake, 13);

        let folds = stratified_folds(&labels, 5);
        assert_eq!(folds.len(), 5);

        let sizes: Vec<usize> = folds.iter().map(|(_, test)| test.len()).collect();
        let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
        assert!(max - min <= 1);
        assert_eq!(sizes.iter().sum::<usize>(), labels.len());

        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), labels.len());
            assert!(train.iter().all(|i| !test.contains(i)));
            assert!(train.iter().any(|&i| labels[i] == FAKE_LABEL));
            assert!(train.iter().any(|&i| labels[i] == REAL_LABEL));

            let fake_in_test = test.iter().filter(|&&i| labels[i] == FAKE_LABEL).count();
            assert!(fake_in_test == 2 || fake_in_test == 3);
        }
    }

    #[test]
    fn test_c2st_small_balanced_pool() {
        // Five rows per class: each test fold holds exactly one of each
        let mut rng = StdRng::seed_from_u64(8);
        let fake = cloud(&mut rng, 5, 3, -0.5, 0.5);
        let real = cloud(&mut rng, 5, 3, 0.5, 0.5);

        let score = seeded(2).evaluate(&fake, &real).unwrap();
        assert!((0.0..=1.0).contains(&score.accuracy));
        assert!((0.0..=1.0).contains(&score.precision));
    }
}
