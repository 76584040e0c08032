// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Interactive prediction loop

use crate::datasets::{ModelInput, ModelOutput, Polarity};
use crate::pipeline::PredictionEngine;
use anyhow::Result;
use console::style;
use std::io::{BufRead, Write};

/// Typing this on its own line ends the loop
pub const EXIT_COMMAND: &str = "exit";

/// `[s1,s2,...]` using the shortest float representation
pub fn format_scores(scores: &[f32]) -> String {
    let joined: Vec<String> = scores.iter().map(|s| s.to_string()).collect();
    format!("[{}]", joined.join(","))
}

/// Label styled by polarity: green for positive, red for negative
pub fn format_label(label: &str, colorize: bool) -> String {
    let styled = match Polarity::of_label(label) {
        Polarity::Positive => style(label).green().bold(),
        Polarity::Negative => style(label).red().bold(),
        Polarity::Unknown => style(label),
    };
    styled.force_styling(colorize).to_string()
}

/// Write one prediction in the console layout
pub fn write_prediction<W: Write>(
    writer: &mut W,
    input: &ModelInput,
    output: &ModelOutput,
    colorize: bool,
) -> Result<()> {
    writeln!(writer, "SentimentText: {}", input.sentiment_text)?;
    writeln!(
        writer,
        "Predicted Sentiment value {}",
        format_label(&output.prediction, colorize)
    )?;
    writeln!(writer, "Predicted Sentiment scores: {}", format_scores(&output.score))?;
    Ok(())
}

/// Read lines until `exit` or end of input, printing a prediction for each
///
/// Blank lines are skipped. Returns the number of predictions made.
pub fn run_repl<R: BufRead, W: Write>(
    engine: &PredictionEngine,
    mut reader: R,
    writer: &mut W,
    colorize: bool,
) -> Result<usize> {
    let mut predictions = 0;
    let mut line = String::new();

    loop {
        write!(writer, "\nEnter text to classify ('{}' to quit): ", EXIT_COMMAND)?;
        writer.flush()?;

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            tracing::debug!("End of input");
            break;
        }

        let text = line.trim_end_matches(&['\r', '\n'][..]);
        if text.trim() == EXIT_COMMAND {
            break;
        }
        if text.trim().is_empty() {
            continue;
        }

        let input = ModelInput::from_text(text);
        let output = engine.predict(&input)?;
        writeln!(writer)?;
        write_prediction(writer, &input, &output, colorize)?;
        predictions += 1;
    }

    writeln!(writer)?;
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainers::{Classifier, SentimentPipeline, TrainerConfig};
    use std::io::Cursor;

    fn engine() -> PredictionEngine {
        let samples = vec![
            ModelInput::new("1", "happy great lovely"),
            ModelInput::new("0", "sad awful terrible"),
            ModelInput::new("1", "great day"),
            ModelInput::new("0", "awful day"),
        ];
        let mut model = SentimentPipeline::new(TrainerConfig::default());
        model.fit(&samples).unwrap();
        PredictionEngine::from_model(model)
    }

    fn run(input: &str) -> (usize, String) {
        let mut out = Vec::new();
        let count = run_repl(&engine(), Cursor::new(input.to_string()), &mut out, false).unwrap();
        (count, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_exit_stops_loop() {
        let (count, out) = run("great lovely\nexit\nawful\n");
        assert_eq!(count, 1);
        assert!(out.contains("SentimentText: great lovely"));
        assert!(out.contains("Predicted Sentiment value 1"));
        assert!(!out.contains("SentimentText: awful"));
    }

    #[test]
    fn test_eof_stops_loop() {
        let (count, out) = run("sad awful\n");
        assert_eq!(count, 1);
        assert!(out.contains("Predicted Sentiment value 0"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let (count, _) = run("\n   \nexit\n");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_exit_is_case_sensitive() {
        let (count, out) = run("EXIT\nexit\n");
        assert_eq!(count, 1);
        assert!(out.contains("SentimentText: EXIT"));
    }

    #[test]
    fn test_format_scores() {
        assert_eq!(format_scores(&[0.25, 0.75]), "[0.25,0.75]");
        assert_eq!(format_scores(&[]), "[]");
    }

    #[test]
    fn test_format_label_colors() {
        assert_eq!(format_label("1", false), "1");
        assert!(format_label("1", true).contains("\u{1b}[32"));
        assert!(format_label("0", true).contains("\u{1b}[31"));
        assert_eq!(format_label("maybe", true), "maybe");
    }
}
