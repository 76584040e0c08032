// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Text featurization
//!
//! Turns free text into a sparse numeric vector:
//! - lowercase normalisation
//! - word n-grams (unigrams and bigrams) over Unicode word-boundary tokens
//! - character tri-grams over the whole normalised text
//! - term-frequency weighting with L2 normalisation per bag
//!
//! Vocabularies are learned on training data only. Grams never seen during
//! fitting are dropped at transform time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unicode_segmentation::UnicodeSegmentation;

const START_MARKER: char = '\u{2}';
const END_MARKER: char = '\u{3}';
const CHAR_GRAM_LENGTH: usize = 3;

/// Sparse feature vector, sorted by index with no duplicates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub entries: Vec<(usize, f32)>,
}

impl SparseVector {
    fn from_counts(counts: BTreeMap<usize, f32>, offset: usize) -> Self {
        let norm = counts.values().map(|v| v * v).sum::<f32>().sqrt();
        let entries = counts
            .into_iter()
            .map(|(idx, v)| (idx + offset, if norm > 0.0 { v / norm } else { 0.0 }))
            .collect();
        Self { entries }
    }

    pub fn dot(&self, weights: &[f32]) -> f32 {
        self.entries
            .iter()
            .filter_map(|(idx, v)| weights.get(*idx).map(|w| w * v))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Learned vocabularies for word n-grams and character tri-grams
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextFeaturizer {
    word_grams: BTreeMap<String, usize>,
    char_grams: BTreeMap<String, usize>,
}

impl TextFeaturizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(text: &str) -> String {
        text.to_lowercase()
    }

    fn word_ngrams(normalized: &str) -> Vec<String> {
        let tokens: Vec<&str> = normalized
            .split_word_bounds()
            .filter(|t| !t.trim().is_empty())
            .collect();

        let mut grams: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        grams.extend(tokens.windows(2).map(|pair| format!("{}|{}", pair[0], pair[1])));
        grams
    }

    fn char_ngrams(normalized: &str) -> Vec<String> {
        let chars: Vec<char> = std::iter::once(START_MARKER)
            .chain(normalized.chars())
            .chain(std::iter::once(END_MARKER))
            .collect();

        chars
            .windows(CHAR_GRAM_LENGTH)
            .map(|w| w.iter().collect())
            .collect()
    }

    /// Learn vocabularies from training text
    pub fn fit<'a, I>(&mut self, texts: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.word_grams.clear();
        self.char_grams.clear();

        for text in texts {
            let normalized = Self::normalize(text);
            for gram in Self::word_ngrams(&normalized) {
                let next = self.word_grams.len();
                self.word_grams.entry(gram).or_insert(next);
            }
            for gram in Self::char_ngrams(&normalized) {
                let next = self.char_grams.len();
                self.char_grams.entry(gram).or_insert(next);
            }
        }

        tracing::debug!(
            "Featurizer vocabulary: {} word n-grams, {} char n-grams",
            self.word_grams.len(),
            self.char_grams.len()
        );
    }

    /// Total width of the produced vectors
    pub fn dimension(&self) -> usize {
        self.word_grams.len() + self.char_grams.len()
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let normalized = Self::normalize(text);

        let mut word_counts: BTreeMap<usize, f32> = BTreeMap::new();
        for gram in Self::word_ngrams(&normalized) {
            if let Some(&idx) = self.word_grams.get(&gram) {
                *word_counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut char_counts: BTreeMap<usize, f32> = BTreeMap::new();
        for gram in Self::char_ngrams(&normalized) {
            if let Some(&idx) = self.char_grams.get(&gram) {
                *char_counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector = SparseVector::from_counts(word_counts, 0);
        vector
            .entries
            .extend(SparseVector::from_counts(char_counts, self.word_grams.len()).entries);
        vector
    }
}

/// Min-max scaling that keeps zero at zero
///
/// Every feature is divided by the largest absolute value it took during
/// fitting. Features that were always zero keep a scale of zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxNormalizer {
    scales: Vec<f32>,
}

impl MinMaxNormalizer {
    pub fn fit(vectors: &[SparseVector], dimension: usize) -> Self {
        let mut max_abs = vec![0.0f32; dimension];
        for vector in vectors {
            for &(idx, v) in &vector.entries {
                if idx < dimension && v.abs() > max_abs[idx] {
                    max_abs[idx] = v.abs();
                }
            }
        }

        let scales = max_abs
            .into_iter()
            .map(|m| if m > 0.0 { 1.0 / m } else { 0.0 })
            .collect();
        Self { scales }
    }

    pub fn transform(&self, vector: &SparseVector) -> SparseVector {
        let entries = vector
            .entries
            .iter()
            .filter_map(|&(idx, v)| {
                let scale = self.scales.get(idx).copied().unwrap_or(0.0);
                let scaled = v * scale;
                (scaled != 0.0).then_some((idx, scaled))
            })
            .collect();
        SparseVector { entries }
    }
}
