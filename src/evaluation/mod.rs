//! Evaluation module for judging generated samples
//!
//! This module provides:
//! - Classifier two-sample test (RBF SVM, k-fold cross-validation)

mod c2st;

pub use c2st::{C2st, C2stConfig, C2stScore, Gamma, FAKE_LABEL, REAL_LABEL};
