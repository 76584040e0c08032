// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Trainers for the sentiment classifier
//!
//! Implements:
//! - Averaged perceptron (binary, hinge loss)
//! - Platt calibration of raw perceptron scores
//! - One-versus-all reduction over any number of classes
//! - `SentimentPipeline`: featurize -> min-max normalise -> one-versus-all

use crate::datasets::{Dataset, ModelInput, ModelOutput};
use crate::featurize::{MinMaxNormalizer, SparseVector, TextFeaturizer};
use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Hyperparameters shared by the binary trainers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Passes over the training data
    pub iterations: usize,
    pub learning_rate: f32,
    /// Seed for per-iteration shuffling
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            learning_rate: 1.0,
            seed: 1,
        }
    }
}

/// Trait for trainable multiclass text classifiers
pub trait Classifier: Send + Sync {
    /// Train the model on the given samples
    fn fit(&mut self, samples: &[ModelInput]) -> Result<()>;

    /// Predict label and per-class scores for a single input
    fn predict(&self, input: &ModelInput) -> ModelOutput;

    /// Predict for multiple inputs
    fn predict_batch(&self, inputs: &[ModelInput]) -> Vec<ModelOutput> {
        inputs.iter().map(|i| self.predict(i)).collect()
    }

    /// Class labels in score order
    fn class_labels(&self) -> &[String];

    fn name(&self) -> &str;

    fn description(&self) -> &str;
}

/// Linear decision function `w . x + b`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl LinearModel {
    pub fn score(&self, x: &SparseVector) -> f32 {
        x.dot(&self.weights) + self.bias
    }
}

/// Averaged perceptron with hinge loss (margin 1)
#[derive(Debug, Clone)]
pub struct AveragedPerceptron {
    config: TrainerConfig,
}

impl AveragedPerceptron {
    const MARGIN: f32 = 1.0;

    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Train on `(features, is_positive)` pairs
    pub fn train(&self, examples: &[(&SparseVector, bool)], dimension: usize) -> LinearModel {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let lr = self.config.learning_rate;

        let mut weights = vec![0.0f32; dimension];
        let mut bias = 0.0f32;
        // Running sums of counter-scaled updates, used to recover the average.
        // f64 keeps the step counter exact past 2^24 examples.
        let mut weight_acc = vec![0.0f64; dimension];
        let mut bias_acc = 0.0f64;
        let mut counter = 1.0f64;

        let mut order: Vec<usize> = (0..examples.len()).collect();

        for _ in 0..self.config.iterations {
            order.shuffle(&mut rng);

            for &i in &order {
                let (x, positive) = examples[i];
                let y = if positive { 1.0 } else { -1.0 };
                let output = x.dot(&weights) + bias;

                if y * output < Self::MARGIN {
                    for &(idx, v) in &x.entries {
                        if idx < dimension {
                            let update = lr * y * v;
                            weights[idx] += update;
                            weight_acc[idx] += counter * update as f64;
                        }
                    }
                    bias += lr * y;
                    bias_acc += counter * (lr * y) as f64;
                }
                counter += 1.0;
            }
        }

        let averaged = weights
            .iter()
            .zip(&weight_acc)
            .map(|(w, acc)| (*w as f64 - acc / counter) as f32)
            .collect();

        LinearModel {
            weights: averaged,
            bias: (bias as f64 - bias_acc / counter) as f32,
        }
    }
}

/// Sigmoid mapping of raw scores to probabilities: `1 / (1 + exp(a*s + b))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattCalibrator {
    pub a: f64,
    pub b: f64,
}

impl Default for PlattCalibrator {
    fn default() -> Self {
        Self { a: -1.0, b: 0.0 }
    }
}

impl PlattCalibrator {
    const MAX_ITERATIONS: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    /// Fit on raw scores and their binary labels (Newton's method with backtracking)
    pub fn fit(scores: &[f32], labels: &[bool]) -> Self {
        let n_pos = labels.iter().filter(|l| **l).count() as f64;
        let n_neg = labels.len() as f64 - n_pos;

        let hi_target = (n_pos + 1.0) / (n_pos + 2.0);
        let lo_target = 1.0 / (n_neg + 2.0);

        let data: Vec<(f64, f64)> = scores
            .iter()
            .zip(labels)
            .map(|(s, l)| (*s as f64, if *l { hi_target } else { lo_target }))
            .collect();

        let objective = |a: f64, b: f64| -> f64 {
            data.iter()
                .map(|(s, t)| {
                    let f = s * a + b;
                    if f >= 0.0 {
                        t * f + (-f).exp().ln_1p()
                    } else {
                        (t - 1.0) * f + f.exp().ln_1p()
                    }
                })
                .sum()
        };

        let mut a = 0.0;
        let mut b = ((n_neg + 1.0) / (n_pos + 1.0)).ln();
        let mut fval = objective(a, b);

        for _ in 0..Self::MAX_ITERATIONS {
            let (mut h11, mut h22, mut h21) = (Self::SIGMA, Self::SIGMA, 0.0);
            let (mut g1, mut g2) = (0.0, 0.0);

            for (s, t) in &data {
                let f = s * a + b;
                let (p, q) = if f >= 0.0 {
                    let e = (-f).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = f.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += s * s * d2;
                h22 += d2;
                h21 += s * d2;
                let d1 = t - p;
                g1 += s * d1;
                g2 += d1;
            }

            if g1.abs() < Self::EPS && g2.abs() < Self::EPS {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            while step >= Self::MIN_STEP {
                let (new_a, new_b) = (a + step * da, b + step * db);
                let new_f = objective(new_a, new_b);
                if new_f < fval + 1e-4 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    break;
                }
                step /= 2.0;
            }

            if step < Self::MIN_STEP {
                tracing::debug!("Platt calibration line search failed to converge");
                break;
            }
        }

        Self { a, b }
    }

    pub fn probability(&self, score: f32) -> f64 {
        let f = score as f64 * self.a + self.b;
        if f >= 0.0 {
            let e = (-f).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + f.exp())
        }
    }
}

/// A perceptron paired with its calibrator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibratedBinary {
    pub model: LinearModel,
    pub calibrator: PlattCalibrator,
}

impl CalibratedBinary {
    pub fn probability(&self, x: &SparseVector) -> f64 {
        self.calibrator.probability(self.model.score(x))
    }
}

/// One calibrated binary classifier per class
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneVersusAll {
    pub classes: Vec<String>,
    pub binaries: Vec<CalibratedBinary>,
}

impl OneVersusAll {
    /// Train one binary classifier per class; `targets[i]` indexes into `classes`
    pub fn train(
        config: TrainerConfig,
        classes: Vec<String>,
        features: &[SparseVector],
        targets: &[usize],
        dimension: usize,
    ) -> Self {
        let trainer = AveragedPerceptron::new(config);

        let binaries = (0..classes.len())
            .map(|k| {
                let labels: Vec<bool> = targets.iter().map(|t| *t == k).collect();
                let examples: Vec<(&SparseVector, bool)> =
                    features.iter().zip(labels.iter().copied()).collect();

                let model = trainer.train(&examples, dimension);
                let scores: Vec<f32> = features.iter().map(|x| model.score(x)).collect();
                let calibrator = PlattCalibrator::fit(&scores, &labels);

                tracing::debug!(
                    "Trained class '{}' (a={:.4}, b={:.4})",
                    classes[k],
                    calibrator.a,
                    calibrator.b
                );

                CalibratedBinary { model, calibrator }
            })
            .collect();

        Self { classes, binaries }
    }

    /// Normalised class probabilities in class order
    pub fn scores(&self, x: &SparseVector) -> Vec<f32> {
        let raw: Vec<f64> = self.binaries.iter().map(|b| b.probability(x)).collect();
        let total: f64 = raw.iter().sum();

        if total > 0.0 {
            raw.iter().map(|p| (p / total) as f32).collect()
        } else {
            let uniform = 1.0 / raw.len().max(1) as f32;
            vec![uniform; raw.len()]
        }
    }

    /// Index of the highest score; ties go to the lowest index
    pub fn argmax(scores: &[f32]) -> Option<usize> {
        scores
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, s)| match best {
                Some((_, b)) if *s <= b => best,
                _ => Some((i, *s)),
            })
            .map(|(i, _)| i)
    }
}

/// Full text classification pipeline
///
/// Text is featurized into word and character n-grams, scaled per feature,
/// and classified with a one-versus-all averaged perceptron.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentPipeline {
    config: TrainerConfig,
    featurizer: TextFeaturizer,
    normalizer: MinMaxNormalizer,
    ova: OneVersusAll,
}

impl SentimentPipeline {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        !self.ova.classes.is_empty()
    }

    fn features(&self, text: &str) -> SparseVector {
        self.normalizer.transform(&self.featurizer.transform(text))
    }
}

impl Classifier for SentimentPipeline {
    fn fit(&mut self, samples: &[ModelInput]) -> Result<()> {
        if samples.is_empty() {
            bail!("Cannot train on an empty dataset");
        }

        let classes = Dataset::class_labels(samples);
        let targets: Vec<usize> = samples
            .iter()
            .map(|s| classes.iter().position(|c| *c == s.sentiment).unwrap_or(0))
            .collect();

        self.featurizer = TextFeaturizer::new();
        self.featurizer
            .fit(samples.iter().map(|s| s.sentiment_text.as_str()));
        let dimension = self.featurizer.dimension();

        let raw: Vec<SparseVector> = samples
            .iter()
            .map(|s| self.featurizer.transform(&s.sentiment_text))
            .collect();
        self.normalizer = MinMaxNormalizer::fit(&raw, dimension);
        let features: Vec<SparseVector> = raw.iter().map(|x| self.normalizer.transform(x)).collect();

        tracing::debug!(
            "Training on {} samples, {} classes, {} features",
            samples.len(),
            classes.len(),
            dimension
        );

        self.ova = OneVersusAll::train(self.config, classes, &features, &targets, dimension);
        Ok(())
    }

    fn predict(&self, input: &ModelInput) -> ModelOutput {
        let score = self.ova.scores(&self.features(&input.sentiment_text));
        let prediction = OneVersusAll::argmax(&score)
            .map(|i| self.ova.classes[i].clone())
            .unwrap_or_default();

        ModelOutput { prediction, score }
    }

    fn class_labels(&self) -> &[String] {
        &self.ova.classes
    }

    fn name(&self) -> &str {
        "AveragedPerceptronOva"
    }

    fn description(&self) -> &str {
        "Word/char n-gram features, min-max scaling, one-versus-all averaged perceptron"
    }
}
