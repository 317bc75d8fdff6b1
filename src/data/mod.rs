//! Data module for feeding tables into training
//!
//! This module provides:
//! - Sequential batch enumeration over the training table
//! - Column normalization to the generator's output range
//! - CSV table loading and export

mod enumerator;
mod preprocessing;

pub use enumerator::{array_to_tensor, tensor_to_rows, BatchEnumerator, Batches};
pub use preprocessing::{
    denormalize_data, load_csv_matrix, normalize_data, save_csv_matrix, NormalizationParams,
};
