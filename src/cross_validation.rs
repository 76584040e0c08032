// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! k-fold cross-validation
//!
//! Samples are shuffled once with a seeded RNG and cut into `k` contiguous
//! folds whose sizes differ by at most one. Each fold is held out in turn
//! while a fresh classifier is trained on the rest.

use crate::datasets::ModelInput;
use crate::metrics::MulticlassMetrics;
use crate::trainers::Classifier;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Configuration for a cross-validation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationConfig {
    pub folds: usize,
    /// Seed for the fold assignment shuffle
    pub seed: u64,
    /// Show a progress bar on stderr
    pub show_progress: bool,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            seed: 1,
            show_progress: false,
        }
    }
}

/// Metrics of one held-out fold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidationResult {
    /// 0-based fold index
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub metrics: MulticlassMetrics,
}

/// Assign sample indices to folds
pub fn fold_indices(n: usize, folds: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if folds < 2 {
        bail!("Cross-validation needs at least 2 folds, got {}", folds);
    }
    if n < folds {
        bail!(
            "Cross-validation needs at least one sample per fold ({} samples, {} folds)",
            n,
            folds
        );
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let base = n / folds;
    let extra = n % folds;
    let mut result = Vec::with_capacity(folds);
    let mut start = 0;

    for k in 0..folds {
        let size = base + usize::from(k < extra);
        result.push(order[start..start + size].to_vec());
        start += size;
    }
    Ok(result)
}

/// Train and evaluate a fresh classifier per fold
pub fn cross_validate<C, F>(
    samples: &[ModelInput],
    config: &CrossValidationConfig,
    mut factory: F,
) -> Result<Vec<CrossValidationResult>>
where
    C: Classifier,
    F: FnMut() -> C,
{
    let folds = fold_indices(samples.len(), config.folds, config.seed)?;

    let progress = if config.show_progress {
        let pb = ProgressBar::new(config.folds as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] fold {pos}/{len}")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut results = Vec::with_capacity(config.folds);

    for (k, held_out) in folds.iter().enumerate() {
        let mut in_test = vec![false; samples.len()];
        for &i in held_out {
            in_test[i] = true;
        }

        let train: Vec<ModelInput> = samples
            .iter()
            .zip(&in_test)
            .filter(|(_, t)| !**t)
            .map(|(s, _)| s.clone())
            .collect();
        let test: Vec<ModelInput> = held_out.iter().map(|&i| samples[i].clone()).collect();

        let mut model = factory();
        model
            .fit(&train)
            .with_context(|| format!("Training failed on fold {}", k + 1))?;

        let outputs = model.predict_batch(&test);
        let truths: Vec<String> = test.iter().map(|s| s.sentiment.clone()).collect();
        let metrics = MulticlassMetrics::evaluate(model.class_labels(), &truths, &outputs)
            .with_context(|| format!("Evaluation failed on fold {}", k + 1))?;

        tracing::info!(
            "  Fold {}/{} - MicroAccuracy: {:.4}, MacroAccuracy: {:.4}, LogLoss: {:.4}",
            k + 1,
            config.folds,
            metrics.micro_accuracy,
            metrics.macro_accuracy,
            metrics.log_loss
        );
        tracing::debug!("\n{}{}", metrics.format(), metrics.confusion_matrix.format());

        results.push(CrossValidationResult {
            fold: k,
            train_size: train.len(),
            test_size: test.len(),
            metrics,
        });
        progress.inc(1);
    }

    progress.finish_and_clear();
    Ok(results)
}
