//! Core data types for Pente Fino
//!
//! This module defines all the shared types used across the analysis pipeline:
//! configuration, the per-file feature bundle, result rows, per-question
//! baselines, and the status/policy enums.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors detected at startup
///
/// All of these are fatal: the engine refuses to run with an invalid
/// configuration rather than producing misleading scores.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Shingle width below the minimum of 1
    #[error("shingle width k must be at least 1 (got {0})")]
    ShingleWidth(usize),

    /// A component weight that is negative, NaN, or infinite
    #[error("weight for `{name}` must be a non-negative finite number (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },

    /// Threshold outside the meaningful score range
    #[error("threshold must be within [0, 1] (got {0})")]
    Threshold(f64),
}

/// Weights for the five component measures of the composite score
///
/// The composite is the plain weighted sum of the breakdown vector; weights
/// are used exactly as configured, with no renormalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// k-shingle Jaccard over the normalized token stream
    pub jaccard: f64,
    /// Edit similarity over the compressed control-flow stream
    pub control: f64,
    /// Jaccard over raw identifier sets
    pub idents: f64,
    /// Jaccard over loop-header signature sets
    pub loops: f64,
    /// Jaccard over function-call name sets
    pub calls: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            jaccard: 0.40,
            control: 0.20,
            idents: 0.15,
            loops: 0.15,
            calls: 0.10,
        }
    }
}

impl Weights {
    /// Validate that every weight is a non-negative finite number
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("jaccard", self.jaccard),
            ("control", self.control),
            ("idents", self.idents),
            ("loops", self.loops),
            ("calls", self.calls),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }
}

/// Per-pair component scores, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub jaccard: f64,
    pub control: f64,
    pub idents: f64,
    pub loops: f64,
    pub calls: f64,
}

impl Breakdown {
    /// Composite score: dot product of the breakdown with the weights
    pub fn composite(&self, weights: &Weights) -> f64 {
        weights.jaccard * self.jaccard
            + weights.control * self.control
            + weights.idents * self.idents
            + weights.loops * self.loops
            + weights.calls * self.calls
    }

    /// The five component values in canonical order
    pub fn components(&self) -> [f64; 5] {
        [self.jaccard, self.control, self.idents, self.loops, self.calls]
    }
}

/// Flagging policy applied to each row's composite score and breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// SUSPEITO when any single component reaches the threshold
    Any,
    /// SUSPEITO only when every component reaches the threshold
    All,
    /// Bands on the composite: SUSPEITO at the threshold, REVISAR at 85% of it
    #[default]
    Weighted,
}

/// Triage label attached to each output row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "REVISAR")]
    Revisar,
    #[serde(rename = "SUSPEITO")]
    Suspeito,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Revisar => "REVISAR",
            Status::Suspeito => "SUSPEITO",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full feature bundle derived from one source file
///
/// Produced once by the extractor, cached by `(path, mtime_ns, size)`, and
/// immutable afterwards. A file that failed to read carries an `error`
/// string; a file with fewer than `min_tokens` raw tokens carries
/// `too_short`. Either condition excludes the file from every pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    /// Token count fell below `min_tokens`; no other field is populated
    pub too_short: bool,

    /// I/O or extraction failure recorded for this file
    pub error: Option<String>,

    /// Blake3 hash of the raw file bytes (hex string)
    ///
    /// Carried in the cache for change detection parallel to mtime/size.
    pub content_hash: String,

    /// Token stream after identifier aliasing (`ID1`, `ID2`, ...)
    pub tokens_norm: Vec<String>,

    /// Set of k-token windows over the normalized stream
    pub shingles: HashSet<String>,

    /// Multiset of normalized tokens
    pub token_freq: HashMap<String, u32>,

    /// Raw (un-aliased) non-keyword identifiers
    pub idents: HashSet<String>,

    /// Raw identifiers immediately followed by `(`
    pub calls: HashSet<String>,

    /// Compressed control-flow stream (IF, FOR, BRACE{, SEMI, ...)
    pub control: Vec<String>,

    /// Normalized `for`/`while` header signatures
    pub loop_sigs: HashSet<String>,
}

impl Features {
    /// Build a stub bundle recording a per-file failure
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// True when this file may participate in pairwise comparison
    pub fn is_comparable(&self) -> bool {
        !self.too_short && self.error.is_none()
    }
}

/// Scores for one unordered pair of submissions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairMetrics {
    /// Weighted composite in [0, 1]
    pub score: f64,
    /// The five component scores
    pub breakdown: Breakdown,
    /// Cosine over token-frequency bags (reported beside Jaccard)
    pub cosine: f64,
}

/// One output row per submission per question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Question number parsed from the filename prefix
    pub question: u32,

    /// Author tag parsed from the filename
    #[serde(rename = "sigla")]
    pub tag: String,

    /// Display name from the roster, when available
    #[serde(rename = "nome")]
    pub display_name: Option<String>,

    /// Basename of this submission
    pub file: String,

    /// Basename of the closest peer, or `None` when no valid pair exists
    pub best_with: Option<String>,

    /// Composite score of the best match (0 when no valid pair)
    pub score: f64,

    /// Component scores of the best match
    pub breakdown: Breakdown,

    /// Cosine similarity of the best match's token bags
    pub cosine: f64,

    /// `(score - mean) / stddev` against the question baseline, when defined
    pub zscore: Option<f64>,

    /// Triage label from the configured policy
    pub status: Status,
}

/// Per-question mean and population standard deviation of pair composites
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean: f64,
    pub stddev: f64,
}

/// Complete result of one analysis run
///
/// This is what the reporters consume; it round-trips through
/// `analysis.json` so the HTML report can be regenerated offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Label for the analyzed set (directory basename)
    pub source: String,

    /// Weights the composite scores were produced with
    pub weights: Weights,

    /// One row per submission, grouped by question, sorted by lowercase tag
    pub rows: Vec<Row>,

    /// Questions with at least 2 valid pairs map to their baseline
    pub baselines: BTreeMap<u32, Baseline>,
}

impl AnalysisOutput {
    /// Rows grouped by question, preserving within-question order
    pub fn rows_by_question(&self) -> BTreeMap<u32, Vec<&Row>> {
        let mut map: BTreeMap<u32, Vec<&Row>> = BTreeMap::new();
        for row in &self.rows {
            map.entry(row.question).or_default().push(row);
        }
        map
    }
}

/// Configuration for one analysis run
///
/// Validated once at startup; invalid values are fatal before any file is
/// touched.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Shingle width (tokens per window)
    pub k: usize,

    /// Alias identifiers before shingling and counting
    pub normalize_identifiers: bool,

    /// Minimum raw-token count for a file to be eligible
    pub min_tokens: usize,

    /// Component weights for the composite score
    pub weights: Weights,

    /// Composite threshold for the status policy
    pub threshold: f64,

    /// Flagging policy (any / all / weighted)
    pub policy: Policy,

    /// Worker-pool size for extraction and scoring; 0 sizes from hardware
    pub jobs: usize,

    /// Basenames matching any of these globs are excluded from gathering
    pub ignore_globs: Vec<String>,

    /// Location of the persistent feature cache
    pub cache_path: PathBuf,

    /// Lowercase author tag to display name
    pub roster: HashMap<String, String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            k: 5,
            normalize_identifiers: true,
            min_tokens: 10,
            weights: Weights::default(),
            threshold: 0.70,
            policy: Policy::default(),
            jobs: 0,
            ignore_globs: Vec::new(),
            cache_path: PathBuf::from(".pente_fino_cache.json"),
            roster: HashMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k < 1 {
            return Err(ConfigError::ShingleWidth(self.k));
        }
        self.weights.validate()?;
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Threshold(self.threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = Weights::default();
        let sum = w.jaccard + w.control + w.idents + w.loops + w.calls;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_composite_is_dot_product() {
        let w = Weights::default();
        let br = Breakdown {
            jaccard: 0.5,
            control: 1.0,
            idents: 0.25,
            loops: 0.0,
            calls: 1.0,
        };
        let expected = 0.40 * 0.5 + 0.20 * 1.0 + 0.15 * 0.25 + 0.15 * 0.0 + 0.10 * 1.0;
        assert!((br.composite(&w) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_negative_weight_is_fatal() {
        let config = AnalysisConfig {
            weights: Weights {
                control: -0.1,
                ..Weights::default()
            },
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { name: "control", .. })
        ));
    }

    #[test]
    fn test_zero_shingle_width_is_fatal() {
        let config = AnalysisConfig {
            k: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ShingleWidth(0))));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::Suspeito.to_string(), "SUSPEITO");
        assert_eq!(
            serde_json::to_string(&Status::Revisar).unwrap(),
            "\"REVISAR\""
        );
    }
}
