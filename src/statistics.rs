// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Summary statistics over cross-validation folds
//!
//! Each metric series (one value per fold) is reduced to its mean, sample
//! standard deviation and a normal-approximation 95% confidence interval.
//! Degenerate inputs follow IEEE float semantics: the standard deviation of
//! fewer than two values is NaN, as is the mean of no values.

use crate::metrics::MulticlassMetrics;
use serde::{Deserialize, Serialize};

/// z-score of the two-sided 95% normal interval
pub const Z_95: f64 = 1.96;

/// Arithmetic average
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (Bessel's correction)
pub fn standard_deviation(values: &[f64]) -> f64 {
    let average = mean(values);
    let sum_of_squares: f64 = values.iter().map(|v| (v - average) * (v - average)).sum();
    (sum_of_squares / (values.len() as f64 - 1.0)).sqrt()
}

/// `1.96 * sd / sqrt(n - 1)`
pub fn confidence_interval_95(values: &[f64]) -> f64 {
    Z_95 * standard_deviation(values) / (values.len() as f64 - 1.0).sqrt()
}

/// Mean, standard deviation and 95% confidence interval of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub ci95: f64,
}

impl MetricSummary {
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            std_dev: standard_deviation(values),
            ci95: confidence_interval_95(values),
        }
    }
}

/// Fold-averaged metrics of a cross-validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldsSummary {
    pub folds: usize,
    pub micro_accuracy: MetricSummary,
    pub macro_accuracy: MetricSummary,
    pub log_loss: MetricSummary,
    pub log_loss_reduction: MetricSummary,
}

impl FoldsSummary {
    pub fn from_fold_metrics<'a, I>(metrics: I) -> Self
    where
        I: IntoIterator<Item = &'a MulticlassMetrics>,
    {
        let metrics: Vec<&MulticlassMetrics> = metrics.into_iter().collect();
        let series = |f: fn(&MulticlassMetrics) -> f64| -> MetricSummary {
            let values: Vec<f64> = metrics.iter().map(|m| f(*m)).collect();
            MetricSummary::from_values(&values)
        };

        Self {
            folds: metrics.len(),
            micro_accuracy: series(|m| m.micro_accuracy),
            macro_accuracy: series(|m| m.macro_accuracy),
            log_loss: series(|m| m.log_loss),
            log_loss_reduction: series(|m| m.log_loss_reduction),
        }
    }

    /// Format the folds-average report block
    pub fn format(&self) -> String {
        let line = |name: &str, summary: &MetricSummary, mean_leading_zero: bool| {
            format!(
                "*       Average {:<18}{}  - Standard deviation: ({})  - Confidence Interval 95%: ({})\n",
                format!("{}:", name),
                format_decimal(summary.mean, mean_leading_zero),
                format_decimal(summary.std_dev, false),
                format_decimal(summary.ci95, false),
            )
        };

        let mut output = String::new();
        output.push_str(&format!("{}\n", "*".repeat(109)));
        output.push_str("*       Metrics for Multi-class Classification model\n");
        output.push_str(&format!("*{}\n", "-".repeat(108)));
        output.push_str(&line("MicroAccuracy", &self.micro_accuracy, true));
        output.push_str(&line("MacroAccuracy", &self.macro_accuracy, true));
        output.push_str(&line("LogLoss", &self.log_loss, false));
        output.push_str(&line("LogLossReduction", &self.log_loss_reduction, false));
        output.push_str(&format!("{}\n", "*".repeat(109)));
        output
    }
}

/// Up to three decimals with trailing zeros trimmed
///
/// Without `leading_zero` the integer part is dropped when it is zero, so
/// `0.25` prints as `.25`, and zero itself prints as an empty string.
pub fn format_decimal(value: f64, leading_zero: bool) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }

    let mut text = format!("{:.3}", value);
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    if text == "-0" {
        text = "0".to_string();
    }

    if !leading_zero {
        if text == "0" {
            return String::new();
        }
        if let Some(rest) = text.strip_prefix("0.") {
            return format!(".{}", rest);
        }
        if let Some(rest) = text.strip_prefix("-0.") {
            return format!("-.{}", rest);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ConfusionMatrix;
    use approx::assert_abs_diff_eq;

    fn fold(micro: f64, macro_: f64, log_loss: f64, reduction: f64) -> MulticlassMetrics {
        MulticlassMetrics {
            micro_accuracy: micro,
            macro_accuracy: macro_,
            log_loss,
            log_loss_reduction: reduction,
            per_class_log_loss: vec![],
            confusion_matrix: ConfusionMatrix::default(),
        }
    }

    #[test]
    fn test_known_series() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];

        assert_abs_diff_eq!(mean(&values), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(standard_deviation(&values), 1.5811, epsilon = 1e-4);
        assert_abs_diff_eq!(confidence_interval_95(&values), 1.5495, epsilon = 1e-4);
    }

    #[test]
    fn test_single_value_is_undefined() {
        assert!(standard_deviation(&[0.7]).is_nan());
        assert!(confidence_interval_95(&[0.7]).is_nan());
        assert_abs_diff_eq!(mean(&[0.7]), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_mean_is_nan() {
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_ci_scales_with_std_dev() {
        let values = [0.80, 0.82, 0.85, 0.79, 0.84];
        let doubled: Vec<f64> = values.iter().map(|v| v * 2.0).collect();

        assert_abs_diff_eq!(
            standard_deviation(&doubled),
            2.0 * standard_deviation(&values),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            confidence_interval_95(&doubled),
            2.0 * confidence_interval_95(&values),
            epsilon = 1e-12
        );
        let ratio = confidence_interval_95(&values) / standard_deviation(&values);
        assert_abs_diff_eq!(ratio, Z_95 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mean_order_invariant() {
        let values = [0.3, 0.9, 0.1, 0.5, 0.7];
        let mut reversed = values;
        reversed.reverse();
        let mut sorted = values;
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

        assert_abs_diff_eq!(mean(&values), mean(&reversed), epsilon = 1e-12);
        assert_abs_diff_eq!(mean(&values), mean(&sorted), epsilon = 1e-12);
    }

    #[test]
    fn test_folds_summary() {
        let folds = vec![
            fold(0.8, 0.7, 0.5, 0.2),
            fold(0.9, 0.8, 0.4, 0.3),
            fold(0.7, 0.6, 0.6, 0.1),
        ];

        let summary = FoldsSummary::from_fold_metrics(&folds);

        assert_eq!(summary.folds, 3);
        assert_abs_diff_eq!(summary.micro_accuracy.mean, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(summary.macro_accuracy.mean, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(summary.log_loss.std_dev, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(
            summary.log_loss_reduction.ci95,
            1.96 * 0.1 / 2f64.sqrt(),
            epsilon = 1e-12
        );

        let report = summary.format();
        assert!(report.contains("Average MicroAccuracy:    0.8  - Standard deviation: (.1)"));
        assert!(report.contains("Average LogLossReduction: .2"));
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(0.85, true), "0.85");
        assert_eq!(format_decimal(0.85, false), ".85");
        assert_eq!(format_decimal(1.23456, false), "1.235");
        assert_eq!(format_decimal(2.0, true), "2");
        assert_eq!(format_decimal(0.0, true), "0");
        assert_eq!(format_decimal(0.0, false), "");
        assert_eq!(format_decimal(-0.25, false), "-.25");
        assert_eq!(format_decimal(f64::NAN, false), "NaN");
    }
}
