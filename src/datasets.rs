// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Sentiment dataset loading
//!
//! Training data is a tab-separated file with a header row and two columns:
//! `Sentiment` (the label) followed by `SentimentText`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Name of the label column in the training file
pub const LABEL_COLUMN: &str = "Sentiment";
/// Name of the text column in the training file
pub const TEXT_COLUMN: &str = "SentimentText";

/// A single labelled (or unlabelled) piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInput {
    /// Ground truth label; empty when the input comes from the console
    pub sentiment: String,
    /// Text content to classify
    pub sentiment_text: String,
}

impl ModelInput {
    pub fn new(sentiment: impl Into<String>, sentiment_text: impl Into<String>) -> Self {
        Self {
            sentiment: sentiment.into(),
            sentiment_text: sentiment_text.into(),
        }
    }

    /// Unlabelled input, as typed by a user
    pub fn from_text(sentiment_text: impl Into<String>) -> Self {
        Self::new(String::new(), sentiment_text)
    }
}

/// Prediction produced by a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    /// Predicted label
    pub prediction: String,
    /// One confidence score per class, in class key order
    pub score: Vec<f32>,
}

/// Whether a label reads as a positive or negative sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
    Unknown,
}

impl Polarity {
    pub fn of_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "1" | "true" | "positive" | "pos" => Polarity::Positive,
            "0" | "false" | "negative" | "neg" => Polarity::Negative,
            _ => Polarity::Unknown,
        }
    }
}

/// An in-memory training set
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub samples: Vec<ModelInput>,
}

impl Dataset {
    pub fn from_samples(samples: Vec<ModelInput>) -> Self {
        Self { samples }
    }

    /// Load a tab-separated file with a header row
    pub fn load_tsv(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open training file: {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .quoting(false)
            .flexible(true)
            .from_reader(file);

        let mut samples = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            // Header is line 1
            let line = idx + 2;
            let record = result
                .with_context(|| format!("Failed to read line {} in {}", line, path.display()))?;

            if record.len() < 2 {
                bail!(
                    "Malformed line {} in {}: expected {} and {} columns, found {} field(s)",
                    line,
                    path.display(),
                    LABEL_COLUMN,
                    TEXT_COLUMN,
                    record.len()
                );
            }

            samples.push(ModelInput::new(&record[0], &record[1]));
        }

        tracing::debug!("Read {} rows from {}", samples.len(), path.display());
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Distinct labels in order of first appearance
    pub fn class_labels(samples: &[ModelInput]) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for sample in samples {
            if !labels.contains(&sample.sentiment) {
                labels.push(sample.sentiment.clone());
            }
        }
        labels
    }

    /// Get label distribution for a set of samples
    pub fn label_distribution(samples: &[ModelInput]) -> HashMap<String, usize> {
        let mut dist = HashMap::new();
        for sample in samples {
            *dist.entry(sample.sentiment.clone()).or_insert(0) += 1;
        }
        dist
    }
}
