// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Standalone prediction runner
//!
//! Loads a saved model archive and classifies either a single `--text` or
//! lines typed on stdin.

use anyhow::Result;
use clap::Parser;
use sentiment_ml::model_store;
use sentiment_ml::pipeline::PredictionEngine;
use sentiment_ml::repl;
use sentiment_ml::ModelInput;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sentiment-predict")]
#[command(about = "Classify text with a saved sentiment model")]
#[command(version)]
struct Args {
    /// Model archive written by `sentiment`
    #[arg(short, long, default_value = "Data/MLModel.zip")]
    model: PathBuf,

    /// Classify this text and exit
    #[arg(short, long)]
    text: Option<String>,

    /// Print the archive manifest and exit
    #[arg(long)]
    info: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.info {
        let manifest = model_store::read_manifest(&args.model)?;
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    let colorize = io::stdout().is_terminal();
    let engine = PredictionEngine::new(&args.model);
    let mut stdout = io::stdout().lock();

    match args.text {
        Some(text) => {
            let input = ModelInput::from_text(text);
            let output = engine.predict(&input)?;
            repl::write_prediction(&mut stdout, &input, &output, colorize)?;
        }
        None => {
            tracing::info!("Classes: {:?}", engine.class_labels()?);
            let count = repl::run_repl(&engine, io::stdin().lock(), &mut stdout, colorize)?;
            tracing::info!("{} predictions made", count);
        }
    }

    Ok(())
}
