//! Weighted k-nearest-neighbour classification over tabular data.
//!
//! The data layer and distance metrics live in [`tabknn_helpers`], the classifier
//! in [`k_nn`]. This crate adds the [`training`] harness that splits a dataset,
//! evaluates the classifier on the held-out rows and builds confusion matrices.

pub mod training;

pub use k_nn::{KnnClassifier, KnnError, Neighbour};
pub use tabknn_helpers::*;
pub use training::{ConfusionMatrix, Evaluation, TrainingError, TrainingHarness};
