//! WGAN-GP for Tabular Data
//!
//! Main entry point providing CLI interface for:
//! - Writing a default configuration
//! - Training a WGAN-GP model on a numeric CSV table
//! - Generating synthetic rows from a saved generator

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ndarray::Array2;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tabular_wgan_gp::{
    data::{denormalize_data, load_csv_matrix, normalize_data, save_csv_matrix, tensor_to_rows, BatchEnumerator, NormalizationParams},
    evaluation::C2st,
    model::{Mode, Wgan},
    training::Trainer,
    utils::{best_checkpoint, load_checkpoint_meta, Config},
};

/// Normalization parameters, stored next to the generator checkpoints
const NORMALIZATION_FILE: &str = "normalization.json";
/// Column names of the training table
const COLUMNS_FILE: &str = "columns.json";

/// WGAN-GP for Synthetic Tabular Data
#[derive(Parser)]
#[command(name = "wgan_gp")]
#[command(version = "0.1.0")]
#[command(about = "Generate synthetic table rows using a WGAN-GP gated by a classifier two-sample test")]
struct Cli {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },

    /// Train the WGAN-GP model
    Train {
        /// Path to training data CSV (header row, numeric columns)
        #[arg(short, long)]
        data: PathBuf,

        /// Number of epochs (overrides the configuration)
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Train on the raw column values
        #[arg(long)]
        no_normalize: bool,
    },

    /// Generate synthetic samples
    Generate {
        /// Generator checkpoint (.pt)
        #[arg(long, conflicts_with = "checkpoint_dir")]
        checkpoint: Option<PathBuf>,

        /// Pick the checkpoint closest to chance level from this directory
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Number of samples to generate
        #[arg(short, long, default_value = "1000")]
        num_samples: i64,

        /// Output file path
        #[arg(short, long, default_value = "synthetic_samples.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { output } => {
            init_config(&output)?;
        }
        Commands::Train {
            data,
            epochs,
            no_normalize,
        } => {
            train_model(&cli.config, &data, epochs, !no_normalize)?;
        }
        Commands::Generate {
            checkpoint,
            checkpoint_dir,
            num_samples,
            output,
        } => {
            let config = load_config(&cli.config)?;
            let checkpoint = resolve_checkpoint(&config, checkpoint, checkpoint_dir)?;
            generate_samples(&config, &checkpoint, num_samples, &output)?;
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("failed to read config {}", path.display()))
    } else {
        info!("Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Train the WGAN-GP model
fn train_model(config_path: &Path, data_path: &Path, epochs: Option<usize>, normalize: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(epochs) = epochs {
        config.training.n_epochs = epochs;
    }

    if let Some(seed) = config.training.seed {
        tch::manual_seed(seed);
    }

    info!("Loading data from {}", data_path.display());
    let (headers, table) = load_csv_matrix(data_path)?;
    let (num_samples, num_features) = table.dim();
    info!("Loaded {} rows with {} columns", num_samples, num_features);

    config.validate_for_table(num_samples, num_features)?;

    let device = config.get_device();
    info!("Using device: {:?}", device);

    std::fs::create_dir_all(&config.output.generator_dir)?;
    std::fs::write(
        config.output.generator_dir.join(COLUMNS_FILE),
        serde_json::to_string_pretty(&headers)?,
    )?;

    let table = if normalize {
        let (normalized, params) = normalize_data(&table);
        params.save_json(config.output.generator_dir.join(NORMALIZATION_FILE))?;
        normalized
    } else {
        let stale = config.output.generator_dir.join(NORMALIZATION_FILE);
        if stale.exists() {
            std::fs::remove_file(&stale)?;
        }
        table
    };

    let data = BatchEnumerator::from_array(&table, config.training.batch_size, device)?;
    let mut model = Wgan::for_table(num_features as i64, config.model.latent_dim, config.model.normalize, device)?;
    let evaluator = C2st::new(config.evaluation.clone())?;

    let mut trainer = Trainer::new(config.training.clone(), config.output.clone(), evaluator)?;
    let report = trainer.train(&mut model, &data)?;

    info!(
        "Training complete after {} epochs. Final G_loss: {:.4}, D_loss: {:.4}",
        report.history.num_epochs(),
        report.history.latest_gen_loss().unwrap_or(f64::NAN),
        report.history.latest_critic_loss().unwrap_or(f64::NAN)
    );
    match report.checkpoints.last() {
        Some(last) => info!(
            "{} checkpoints written, latest {}",
            report.checkpoints.len(),
            last.generator_path.display()
        ),
        None => warn!("No epoch reached the C2ST threshold, no checkpoint written"),
    }

    Ok(())
}

fn resolve_checkpoint(config: &Config, checkpoint: Option<PathBuf>, dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = checkpoint {
        return Ok(path);
    }

    let dir = dir.unwrap_or_else(|| config.output.generator_dir.clone());
    match best_checkpoint(&dir) {
        Some((path, meta)) => {
            info!(
                "Using checkpoint from epoch {} (C2ST accuracy {:.3})",
                meta.epoch, meta.accuracy
            );
            Ok(path)
        }
        None => bail!("no generator checkpoints found in {}", dir.display()),
    }
}

/// Generate synthetic samples
fn generate_samples(config: &Config, checkpoint: &Path, num_samples: i64, output_path: &Path) -> Result<()> {
    if num_samples <= 0 {
        bail!("num_samples must be > 0, got {}", num_samples);
    }

    let meta = load_checkpoint_meta(checkpoint)
        .with_context(|| format!("missing metadata for checkpoint {}", checkpoint.display()))?;

    let device = config.get_device();
    let mut model = Wgan::for_table(meta.num_features, meta.latent_dim, meta.normalize, device)?;
    model.load_generator(checkpoint)?;
    model.set_mode(Mode::Eval);
    info!("Loaded generator from {}", checkpoint.display());

    info!("Generating {} synthetic samples", num_samples);
    let rows = tensor_to_rows(&model.generate(num_samples))?;
    let num_features = meta.num_features as usize;
    let samples = Array2::from_shape_vec((rows.len(), num_features), rows.into_iter().flatten().collect())?;

    let checkpoint_dir = checkpoint.parent().unwrap_or_else(|| Path::new("."));

    let params_path = checkpoint_dir.join(NORMALIZATION_FILE);
    let samples = if params_path.exists() {
        let params = NormalizationParams::load_json(&params_path)?;
        denormalize_data(&samples, &params)
    } else {
        samples
    };

    let columns_path = checkpoint_dir.join(COLUMNS_FILE);
    let headers: Vec<String> = if columns_path.exists() {
        serde_json::from_str(&std::fs::read_to_string(&columns_path)?)?
    } else {
        (0..num_features).map(|i| format!("col_{}", i)).collect()
    };
    if headers.len() != num_features {
        bail!(
            "{} lists {} columns but the generator produces {}",
            columns_path.display(),
            headers.len(),
            num_features
        );
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    save_csv_matrix(output_path, &headers, &samples)?;
    info!("Saved synthetic samples to {}", output_path.display());

    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output_path)?;

    info!("Created default configuration at {}", output_path.display());
    Ok(())
}
