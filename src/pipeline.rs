// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Model building and consumption
//!
//! Orchestrates:
//! - Dataset loading
//! - Training the sentiment pipeline on the full dataset
//! - Cross-validation and fold statistics
//! - Model archive persistence
//! - Lazy model loading for predictions

use crate::cross_validation::{cross_validate, CrossValidationConfig, CrossValidationResult};
use crate::datasets::{Dataset, ModelInput, ModelOutput};
use crate::model_store::{self, ModelManifest};
use crate::statistics::FoldsSummary;
use crate::trainers::{Classifier, SentimentPipeline, TrainerConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration for building a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tab-separated training file
    pub data_path: PathBuf,
    /// Where the model archive is written
    pub model_path: PathBuf,
    pub trainer: TrainerConfig,
    pub cross_validation: CrossValidationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("Data").join("train-data.txt"),
            model_path: PathBuf::from("Data").join("MLModel.zip"),
            trainer: TrainerConfig::default(),
            cross_validation: CrossValidationConfig::default(),
        }
    }
}

/// Everything produced by a build run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub config: PipelineConfig,
    pub training_samples: usize,
    pub classes: Vec<String>,
    pub label_distribution: HashMap<String, usize>,
    pub cross_validation: Vec<CrossValidationResult>,
    pub summary: FoldsSummary,
    pub manifest: ModelManifest,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Trains, evaluates and saves a sentiment model
pub struct ModelBuilder {
    config: PipelineConfig,
}

impl ModelBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn build_pipeline(&self) -> SentimentPipeline {
        SentimentPipeline::new(self.config.trainer)
    }

    /// Run load -> train -> evaluate -> save from the configured data file
    pub fn create_model(&self) -> Result<BuildReport> {
        tracing::info!("Loading training data from {}", self.config.data_path.display());
        let dataset = Dataset::load_tsv(&self.config.data_path)?;
        self.create_model_from(&dataset)
    }

    /// Same as [`create_model`](Self::create_model) on an in-memory dataset
    pub fn create_model_from(&self, dataset: &Dataset) -> Result<BuildReport> {
        let samples = &dataset.samples;

        let mut model = self.build_pipeline();
        tracing::info!("=============== Training model: {} ===============", model.name());
        tracing::info!("  {}", model.description());
        model.fit(samples).context("Training failed")?;
        tracing::info!(
            "=============== End of training process ({} samples, classes {:?}) ===============",
            samples.len(),
            model.class_labels()
        );

        tracing::info!("=============== Cross-validating to get model's accuracy metrics ===============");
        let cross_validation =
            cross_validate(samples, &self.config.cross_validation, || self.build_pipeline())?;
        let summary = FoldsSummary::from_fold_metrics(cross_validation.iter().map(|r| &r.metrics));

        tracing::info!("=============== Saving the model ===============");
        let manifest = model_store::save_model(&model, &self.config.model_path).with_context(|| {
            format!("Failed to save model to {}", self.config.model_path.display())
        })?;
        tracing::info!("The model is saved to {}", self.config.model_path.display());

        Ok(BuildReport {
            config: self.config.clone(),
            training_samples: samples.len(),
            classes: model.class_labels().to_vec(),
            label_distribution: Dataset::label_distribution(samples),
            cross_validation,
            summary,
            manifest,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Save a build report as JSON
    pub fn save_report(report: &BuildReport, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write report to {}", output_path.display()))?;
        tracing::info!("Report saved to {}", output_path.display());
        Ok(())
    }
}

/// Serves predictions from a saved model archive
///
/// The archive is read on the first prediction and kept for later calls.
pub struct PredictionEngine {
    model_path: PathBuf,
    model: OnceCell<SentimentPipeline>,
}

impl PredictionEngine {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            model: OnceCell::new(),
        }
    }

    /// Wrap an already loaded model
    pub fn from_model(model: SentimentPipeline) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(model);
        Self {
            model_path: PathBuf::new(),
            model: cell,
        }
    }

    fn model(&self) -> Result<&SentimentPipeline> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let (model, manifest) = model_store::load_model(&self.model_path)
            .with_context(|| format!("Failed to load model from {}", self.model_path.display()))?;
        tracing::debug!(
            "Loaded model v{} created {} (classes {:?})",
            manifest.crate_version,
            manifest.created_at,
            manifest.classes
        );
        Ok(self.model.get_or_init(|| model))
    }

    /// Class labels in score order
    pub fn class_labels(&self) -> Result<&[String]> {
        Ok(self.model()?.class_labels())
    }

    pub fn predict(&self, input: &ModelInput) -> Result<ModelOutput> {
        Ok(self.model()?.predict(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_dataset() -> Dataset {
        let positive = [
            "I love it it's perfect",
            "Wonderful and lovely",
            "Great, I really enjoyed it",
            "Absolutely fantastic work",
            "Nice and helpful",
        ];
        let negative = [
            "I hate this, it is awful",
            "Terrible and useless",
            "Horrible, a waste of time",
            "Bad, boring and rude",
            "Awful and ugly",
        ];

        let samples = positive
            .iter()
            .map(|t| ModelInput::new("1", *t))
            .chain(negative.iter().map(|t| ModelInput::new("0", *t)))
            .collect();
        Dataset::from_samples(samples)
    }

    fn config_in(dir: &TempDir) -> PipelineConfig {
        PipelineConfig {
            data_path: dir.path().join("train-data.txt"),
            model_path: dir.path().join("MLModel.zip"),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_create_model_from_dataset() {
        let dir = TempDir::new().unwrap();
        let builder = ModelBuilder::new(config_in(&dir));

        let report = builder.create_model_from(&sample_dataset()).unwrap();

        assert_eq!(report.training_samples, 10);
        assert_eq!(report.classes, vec!["1", "0"]);
        assert_eq!(report.cross_validation.len(), 5);
        assert_eq!(report.summary.folds, 5);
        assert!(builder.config().model_path.exists());

        let engine = PredictionEngine::new(&builder.config().model_path);
        let output = engine.predict(&ModelInput::from_text("I love it it's perfect")).unwrap();
        assert_eq!(output.prediction, "1");
        assert_eq!(output.score.len(), 2);
    }

    #[test]
    fn test_create_model_from_file() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        std::fs::write(
            &config.data_path,
            "Sentiment\tSentimentText\n1\tgood\n0\tbad\n1\tvery good\n0\tvery bad\n1\tgood one\n0\tbad one\n",
        )
        .unwrap();

        let report = ModelBuilder::new(config.clone()).create_model().unwrap();
        assert_eq!(report.training_samples, 6);

        let report_path = dir.path().join("reports").join("build.json");
        ModelBuilder::save_report(&report, &report_path).unwrap();
        let json = std::fs::read_to_string(&report_path).unwrap();
        assert!(json.contains("micro_accuracy"));
    }

    #[test]
    fn test_create_model_missing_data() {
        let dir = TempDir::new().unwrap();
        let err = ModelBuilder::new(config_in(&dir)).create_model().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open training file"));
    }

    #[test]
    fn test_too_few_samples_for_folds() {
        let dir = TempDir::new().unwrap();
        let dataset = Dataset::from_samples(vec![ModelInput::new("1", "ok"), ModelInput::new("0", "no")]);
        assert!(ModelBuilder::new(config_in(&dir)).create_model_from(&dataset).is_err());
    }

    #[test]
    fn test_prediction_engine_missing_model() {
        let engine = PredictionEngine::new("no/such/model.zip");
        let err = engine.predict(&ModelInput::from_text("hello")).unwrap_err();
        assert!(err.to_string().contains("Failed to load model"));
    }

    #[test]
    fn test_prediction_engine_from_model() {
        let mut model = SentimentPipeline::new(TrainerConfig::default());
        model.fit(&sample_dataset().samples).unwrap();

        let engine = PredictionEngine::from_model(model);
        assert_eq!(engine.class_labels().unwrap(), &["1".to_string(), "0".to_string()]);
        let output = engine.predict(&ModelInput::from_text("terrible and awful")).unwrap();
        assert_eq!(output.prediction, "0");
    }
}
