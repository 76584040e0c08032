// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Sentiment model builder CLI
//!
//! Trains on a tab-separated file, reports cross-validation metrics, saves the
//! model archive, reloads it and then classifies text typed on stdin.
//!
//! Usage:
//!   sentiment --data Data/train-data.txt --model Data/MLModel.zip
//!   sentiment --folds 10 --seed 7 --report results/build.json --no-repl

use anyhow::Result;
use clap::Parser;
use sentiment_ml::cross_validation::CrossValidationConfig;
use sentiment_ml::pipeline::{ModelBuilder, PipelineConfig, PredictionEngine};
use sentiment_ml::repl;
use sentiment_ml::trainers::TrainerConfig;
use sentiment_ml::ModelInput;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sentiment")]
#[command(about = "Train, evaluate and query a text sentiment model")]
#[command(version)]
struct Args {
    /// Tab-separated training file with a header row
    #[arg(short, long, default_value = "Data/train-data.txt")]
    data: PathBuf,

    /// Output path of the model archive
    #[arg(short, long, default_value = "Data/MLModel.zip")]
    model: PathBuf,

    /// Number of cross-validation folds
    #[arg(short, long, default_value_t = 5)]
    folds: usize,

    /// Random seed for reproducibility
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Perceptron passes over the training data
    #[arg(short, long, default_value_t = 10)]
    iterations: usize,

    /// Text used for the single prediction after training
    #[arg(long, default_value = "I love it it's perfect")]
    sample: String,

    /// Write the build report as JSON
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Exit after the sample prediction
    #[arg(long)]
    no_repl: bool,
}

/// Map command-line flags onto the build configuration
fn config_from(args: &Args, show_progress: bool) -> PipelineConfig {
    PipelineConfig {
        data_path: args.data.clone(),
        model_path: args.model.clone(),
        trainer: TrainerConfig {
            iterations: args.iterations,
            seed: args.seed,
            ..TrainerConfig::default()
        },
        cross_validation: CrossValidationConfig {
            folds: args.folds,
            seed: args.seed,
            show_progress,
        },
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let colorize = io::stdout().is_terminal();

    tracing::info!("Sentiment Model Builder");
    tracing::info!("=======================");
    tracing::info!("Data: {}", args.data.display());
    tracing::info!("Model: {}", args.model.display());
    tracing::info!("Seed: {}", args.seed);

    let builder = ModelBuilder::new(config_from(&args, io::stderr().is_terminal()));
    let report = builder.create_model()?;

    println!("\n{}", report.summary.format());

    if let Some(ref path) = args.report {
        ModelBuilder::save_report(&report, path)?;
        println!("Build report saved to: {}", path.display());
    }

    // Reload the archive from disk, as a separate consumer would
    let engine = PredictionEngine::new(&builder.config().model_path);
    let sample = ModelInput::from_text(args.sample.as_str());
    let output = engine.predict(&sample)?;

    println!("Using model to make single prediction -- Comparing actual Sentiment with predicted Sentiment from sample data...\n");
    let mut stdout = io::stdout().lock();
    repl::write_prediction(&mut stdout, &sample, &output, colorize)?;

    if !args.no_repl {
        let count = repl::run_repl(&engine, io::stdin().lock(), &mut stdout, colorize)?;
        tracing::info!("{} predictions made", count);
    }

    println!("=============== End of process ===============");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let args = Args::try_parse_from(["sentiment"]).unwrap();
        let config = config_from(&args, false);

        assert_eq!(config.data_path, PathBuf::from("Data/train-data.txt"));
        assert_eq!(config.model_path, PathBuf::from("Data/MLModel.zip"));
        assert_eq!(config.cross_validation.folds, 5);
        assert_eq!(config.trainer, TrainerConfig::default());
        assert!(!config.cross_validation.show_progress);
        assert!(!args.no_repl);
        assert_eq!(args.sample, "I love it it's perfect");
    }

    #[test]
    fn test_flags_reach_trainer_and_folds() {
        let args = Args::try_parse_from([
            "sentiment",
            "--data",
            "in.tsv",
            "--model",
            "out/model.zip",
            "--folds",
            "10",
            "--seed",
            "7",
            "--iterations",
            "3",
            "--no-repl",
        ])
        .unwrap();
        let config = config_from(&args, true);

        assert_eq!(config.data_path, PathBuf::from("in.tsv"));
        assert_eq!(config.model_path, PathBuf::from("out/model.zip"));
        assert_eq!(config.cross_validation.folds, 10);
        assert_eq!(config.cross_validation.seed, 7);
        assert!(config.cross_validation.show_progress);
        assert_eq!(config.trainer.seed, 7);
        assert_eq!(config.trainer.iterations, 3);
        assert_eq!(config.trainer.learning_rate, TrainerConfig::default().learning_rate);
        assert!(args.no_repl);
    }
}
