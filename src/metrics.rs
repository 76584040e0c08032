// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation metrics for multi-class classification
//!
//! Implements:
//! - Confusion Matrix
//! - Micro-accuracy and macro-accuracy
//! - Log-loss, log-loss reduction and per-class log-loss

use crate::datasets::ModelOutput;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Probabilities are clamped to this before taking the log
const LOG_LOSS_EPSILON: f64 = 1e-15;

/// Confusion matrix; `counts[actual][predicted]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub classes: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(classes: Vec<String>) -> Self {
        let n = classes.len();
        Self {
            classes,
            counts: vec![vec![0; n]; n],
        }
    }

    fn record(&mut self, actual: usize, predicted: usize) {
        self.counts[actual][predicted] += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Format as an aligned table
    pub fn format(&self) -> String {
        let width = self
            .classes
            .iter()
            .map(|c| c.len())
            .max()
            .unwrap_or(0)
            .max(6);

        let mut output = format!("{:>width$} |", "", width = width);
        for class in &self.classes {
            output.push_str(&format!(" {:>width$}", class, width = width));
        }
        output.push('\n');

        for (class, row) in self.classes.iter().zip(&self.counts) {
            output.push_str(&format!("{:>width$} |", class, width = width));
            for count in row {
                output.push_str(&format!(" {:>width$}", count, width = width));
            }
            output.push('\n');
        }
        output
    }
}

/// Quality metrics for one evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticlassMetrics {
    /// Fraction of samples predicted correctly
    pub micro_accuracy: f64,
    /// Mean per-class recall over classes present in the evaluation set
    pub macro_accuracy: f64,
    pub log_loss: f64,
    /// Relative improvement of log-loss over the label prior
    pub log_loss_reduction: f64,
    /// Mean log-loss over samples of each class; 0 for classes without samples
    pub per_class_log_loss: Vec<f64>,
    pub confusion_matrix: ConfusionMatrix,
}

impl MulticlassMetrics {
    /// Evaluate model outputs against ground truth labels
    ///
    /// `classes` is the model's score order. Ground truth labels the model has
    /// never seen are appended as extra classes with probability zero.
    pub fn evaluate(classes: &[String], truths: &[String], outputs: &[ModelOutput]) -> Result<Self> {
        if truths.len() != outputs.len() {
            bail!(
                "Prediction and ground truth lengths must match ({} predictions, {} labels)",
                outputs.len(),
                truths.len()
            );
        }

        let mut all_classes = classes.to_vec();
        for truth in truths {
            if !all_classes.contains(truth) {
                all_classes.push(truth.clone());
            }
        }
        let index_of = |label: &str| all_classes.iter().position(|c| c == label);

        let mut matrix = ConfusionMatrix::new(all_classes.clone());
        let mut class_loss = vec![0.0; all_classes.len()];
        let mut support = vec![0usize; all_classes.len()];
        let mut correct = 0usize;

        for (truth, output) in truths.iter().zip(outputs) {
            let actual = index_of(truth.as_str()).unwrap_or(0);
            support[actual] += 1;
            // Outputs from an untrained model carry no known label
            if let Some(predicted) = index_of(output.prediction.as_str()) {
                matrix.record(actual, predicted);
                if predicted == actual {
                    correct += 1;
                }
            }

            let p_true = output.score.get(actual).copied().unwrap_or(0.0) as f64;
            class_loss[actual] += -p_true.max(LOG_LOSS_EPSILON).ln();
        }

        let n = truths.len();
        let micro_accuracy = if n == 0 { 0.0 } else { correct as f64 / n as f64 };

        let recalls: Vec<f64> = support
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(k, n)| matrix.counts[k][k] as f64 / *n as f64)
            .collect();
        let macro_accuracy = if recalls.is_empty() {
            0.0
        } else {
            recalls.iter().sum::<f64>() / recalls.len() as f64
        };

        let log_loss = if n == 0 { 0.0 } else { class_loss.iter().sum::<f64>() / n as f64 };

        let per_class_log_loss = class_loss
            .iter()
            .enumerate()
            .map(|(k, loss)| match support[k] {
                0 => 0.0,
                n => loss / n as f64,
            })
            .collect();

        let prior = Self::prior_log_loss(&support);
        let log_loss_reduction = if prior > 0.0 { (prior - log_loss) / prior } else { 0.0 };

        Ok(Self {
            micro_accuracy,
            macro_accuracy,
            log_loss,
            log_loss_reduction,
            per_class_log_loss,
            confusion_matrix: matrix,
        })
    }

    /// Log-loss of always predicting the evaluation label distribution
    fn prior_log_loss(support: &[usize]) -> f64 {
        let total = support.iter().sum::<usize>() as f64;
        if total == 0.0 {
            return 0.0;
        }
        support
            .iter()
            .map(|n| *n as f64 / total)
            .filter(|p| *p > 0.0)
            .map(|p| -p * p.ln())
            .sum()
    }

    /// Format as a human-readable string
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", "*".repeat(60)));
        output.push_str("*    Metrics for multi-class classification model\n");
        output.push_str(&format!("*{}\n", "-".repeat(59)));
        output.push_str(&format!(
            "    MacroAccuracy = {:.4}, a value between 0 and 1, the closer to 1, the better\n",
            self.macro_accuracy
        ));
        output.push_str(&format!(
            "    MicroAccuracy = {:.4}, a value between 0 and 1, the closer to 1, the better\n",
            self.micro_accuracy
        ));
        output.push_str(&format!("    LogLoss = {:.4}, the closer to 0, the better\n", self.log_loss));
        for (i, loss) in self.per_class_log_loss.iter().enumerate() {
            output.push_str(&format!(
                "    LogLoss for class {} = {:.4}, the closer to 0, the better\n",
                i + 1,
                loss
            ));
        }
        output.push_str(&format!("{}\n", "*".repeat(60)));
        output
    }
}
