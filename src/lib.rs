// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Text sentiment classification
//!
//! This crate provides:
//! - Tab-separated dataset loading (`Sentiment`, `SentimentText`)
//! - Text featurization (word and character n-grams)
//! - One-versus-all averaged perceptron with Platt calibration
//! - Multi-class metrics and k-fold cross-validation
//! - Fold statistics (mean, standard deviation, 95% confidence interval)
//! - ZIP model archives with checksum verification
//! - An interactive prediction loop

pub mod cross_validation;
pub mod datasets;
pub mod featurize;
pub mod metrics;
pub mod model_store;
pub mod pipeline;
pub mod repl;
pub mod statistics;
pub mod trainers;

pub use cross_validation::{cross_validate, CrossValidationConfig, CrossValidationResult};
pub use datasets::{Dataset, ModelInput, ModelOutput, Polarity};
pub use metrics::{ConfusionMatrix, MulticlassMetrics};
pub use model_store::{ModelManifest, ModelStoreError};
pub use pipeline::{BuildReport, ModelBuilder, PipelineConfig, PredictionEngine};
pub use statistics::{FoldsSummary, MetricSummary};
pub use trainers::{Classifier, SentimentPipeline, TrainerConfig};
