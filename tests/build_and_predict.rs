// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

use sentiment_ml::pipeline::{ModelBuilder, PipelineConfig, PredictionEngine};
use sentiment_ml::repl::run_repl;
use sentiment_ml::{model_store, ModelInput};
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;

fn bundled_data() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Data").join("train-data.txt")
}

fn build(dir: &TempDir) -> (ModelBuilder, sentiment_ml::BuildReport) {
    let config = PipelineConfig {
        data_path: bundled_data(),
        model_path: dir.path().join("MLModel.zip"),
        ..PipelineConfig::default()
    };
    let builder = ModelBuilder::new(config);
    let report = builder.create_model().expect("build should succeed");
    (builder, report)
}

#[test]
fn test_build_reports_fold_statistics() {
    let dir = TempDir::new().unwrap();
    let (_, report) = build(&dir);

    assert_eq!(report.training_samples, 60);
    assert_eq!(report.classes, vec!["1", "0"]);
    assert_eq!(report.label_distribution["1"], 30);
    assert_eq!(report.cross_validation.len(), 5);

    let test_total: usize = report.cross_validation.iter().map(|r| r.test_size).sum();
    assert_eq!(test_total, 60);

    for summary in [&report.summary.micro_accuracy, &report.summary.macro_accuracy] {
        assert!(summary.mean >= 0.0 && summary.mean <= 1.0);
        assert!(summary.std_dev.is_finite() && summary.std_dev >= 0.0);
        assert!(summary.ci95.is_finite());
    }
    assert!(report.summary.log_loss.mean > 0.0);

    let formatted = report.summary.format();
    assert!(formatted.contains("Average MicroAccuracy:"));
    assert!(formatted.contains("Confidence Interval 95%"));
}

#[test]
fn test_build_is_reproducible() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let (_, first) = build(&first_dir);
    let (_, second) = build(&second_dir);

    assert_eq!(first.summary.micro_accuracy, second.summary.micro_accuracy);
    assert_eq!(first.summary.log_loss, second.summary.log_loss);
    assert_eq!(first.manifest.model_sha256, second.manifest.model_sha256);
}

#[test]
fn test_saved_model_serves_predictions() {
    let dir = TempDir::new().unwrap();
    let (builder, report) = build(&dir);

    let manifest = model_store::read_manifest(&builder.config().model_path).unwrap();
    assert_eq!(manifest.model_sha256, report.manifest.model_sha256);

    let engine = PredictionEngine::new(&builder.config().model_path);

    let positive = engine.predict(&ModelInput::from_text("I love it it's perfect")).unwrap();
    assert_eq!(positive.prediction, "1");
    assert!(positive.score[0] > positive.score[1]);

    let negative = engine
        .predict(&ModelInput::from_text("Terrible quality, a complete waste of money"))
        .unwrap();
    assert_eq!(negative.prediction, "0");

    let mut out = Vec::new();
    let count = run_repl(
        &engine,
        Cursor::new("Great quality and fast delivery\nexit\n"),
        &mut out,
        false,
    )
    .unwrap();
    assert_eq!(count, 1);
    assert!(String::from_utf8(out).unwrap().contains("Predicted Sentiment value 1"));
}
