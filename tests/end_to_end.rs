//! Full training run on a small synthetic table

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tch::Device;
use tempfile::tempdir;

use tabular_wgan_gp::data::{array_to_tensor, BatchEnumerator};
use tabular_wgan_gp::evaluation::{C2st, C2stConfig};
use tabular_wgan_gp::model::Wgan;
use tabular_wgan_gp::training::{meets_stopping_criterion, Trainer, TrainingConfig};
use tabular_wgan_gp::utils::{best_checkpoint, list_checkpoints, OutputConfig};

const NUM_ROWS: usize = 200;
const NUM_FEATURES: usize = 10;

/// Rows tightly clustered near 0.9, easy for the classifier to separate from
/// an untrained generator
fn clustered_table(seed: u64) -> ndarray::Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    ndarray::Array2::from_shape_fn((NUM_ROWS, NUM_FEATURES), |_| 0.9 + 0.05 * (rng.gen::<f64>() - 0.5))
}

/// Number of `.pt` files in a directory; a missing directory holds none
fn snapshot_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().map(|ext| ext == "pt").unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}

#[test]
fn untrained_generator_writes_no_checkpoints() {
    tch::manual_seed(17);
    let dir = tempdir().unwrap();
    let output = OutputConfig::under(dir.path());

    let table = array_to_tensor(&clustered_table(5), Device::Cpu);
    let data = BatchEnumerator::new(table, 20).unwrap();
    assert_eq!(data.num_batches(), 10);

    let config = TrainingConfig {
        batch_size: 20,
        n_epochs: 3,
        n_critic: 5,
        progress: false,
        ..Default::default()
    };
    let threshold = config.stop_threshold;
    let evaluator = C2st::new(C2stConfig {
        seed: Some(21),
        ..Default::default()
    })
    .unwrap();

    let mut model = Wgan::for_table(NUM_FEATURES as i64, 5, false, Device::Cpu).unwrap();
    let mut trainer = Trainer::new(config, output.clone(), evaluator).unwrap();
    let report = trainer.train(&mut model, &data).unwrap();

    let history = &report.history;
    assert_eq!(history.num_epochs(), 3);
    assert_eq!(history.critic_losses.len(), 3);
    assert_eq!(history.gen_losses.len(), 3);
    assert_eq!(history.c2st_accuracies.len(), 3);
    assert!(history.gradient_penalties.iter().all(|&gp| gp >= 0.0));
    assert!(history.c2st_accuracies.iter().all(|acc| (0.0..=1.0).contains(acc)));

    // Snapshots exist exactly for the epochs whose accuracy met the threshold
    let expected: Vec<usize> = history
        .c2st_accuracies
        .iter()
        .enumerate()
        .filter(|(_, acc)| meets_stopping_criterion(**acc, threshold))
        .map(|(i, _)| i + 1)
        .collect();
    let written: Vec<usize> = report.checkpoints.iter().map(|c| c.epoch).collect();
    assert_eq!(written, expected);

    let listed = list_checkpoints(&output.generator_dir);
    assert_eq!(listed.len(), expected.len());
    for checkpoint in &report.checkpoints {
        assert!(checkpoint.generator_path.exists());
        assert!(checkpoint.critic_path.exists());
    }
    assert_eq!(best_checkpoint(&output.generator_dir).is_some(), !expected.is_empty());

    // Three epochs cannot bring an untrained generator near this table
    assert!(expected.is_empty(), "unexpected convergence: {:?}", history.c2st_accuracies);
    assert!(report.checkpoints.is_empty());
    assert_eq!(snapshot_count(&output.generator_dir), 0);
    assert_eq!(snapshot_count(&output.critic_dir), 0);

    assert!(output.loss_plot.exists());
}

#[test]
fn generated_rows_stay_in_tanh_range() {
    let model = Wgan::for_table(NUM_FEATURES as i64, 5, false, Device::Cpu).unwrap();
    let samples = model.generate(64);

    assert_eq!(samples.size(), vec![64, NUM_FEATURES as i64]);
    assert!(samples.abs().max().double_value(&[]) <= 1.0);
}
