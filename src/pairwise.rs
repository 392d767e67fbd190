//! Grouping, pairwise scoring, baselines, and row assembly
//!
//! Partitions submissions by question, enumerates unordered pairs within
//! each question, scores them with the similarity kernel, and derives one
//! row per submission: best peer, component breakdown, z-score against the
//! question baseline, and triage status.
//!
//! Pair scoring may run in parallel; the best-match fold is sequential over
//! the fixed pair order so the first-seen tiebreak is deterministic.

use crate::index::parse_submission_name;
use crate::similarity::compare_features;
use crate::types::{
    AnalysisConfig, Baseline, Breakdown, Features, PairMetrics, Policy, Row, Status,
};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Group submissions by question, ordered by lowercase author tag
///
/// Questions with fewer than 2 submissions are discarded.
pub fn group_by_question(paths: &[PathBuf]) -> BTreeMap<u32, Vec<PathBuf>> {
    let mut groups: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();
    for path in paths {
        if let Some(name) = parse_submission_name(path) {
            groups.entry(name.question).or_default().push(path.clone());
        }
    }
    for files in groups.values_mut() {
        files.sort_by_key(|p| tag_of(p).to_lowercase());
    }
    groups.retain(|_, files| files.len() >= 2);
    groups
}

fn tag_of(path: &Path) -> String {
    parse_submission_name(path)
        .map(|n| n.tag)
        .unwrap_or_default()
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Mean and population standard deviation over pair composites
///
/// `None` when fewer than 2 pairs exist.
pub fn baseline_stats(scores: &[f64]) -> Option<Baseline> {
    if scores.len() < 2 {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    Some(Baseline {
        mean,
        stddev: variance.sqrt(),
    })
}

/// Apply the configured flagging policy to one row's scores
pub fn classify(score: f64, breakdown: &Breakdown, threshold: f64, policy: Policy) -> Status {
    match policy {
        Policy::Weighted => {
            if score >= threshold {
                Status::Suspeito
            } else if score >= threshold * 0.85 {
                Status::Revisar
            } else {
                Status::Ok
            }
        }
        Policy::Any => {
            if breakdown.components().iter().any(|&c| c >= threshold) {
                Status::Suspeito
            } else {
                Status::Ok
            }
        }
        Policy::All => {
            if breakdown.components().iter().all(|&c| c >= threshold) {
                Status::Suspeito
            } else {
                Status::Ok
            }
        }
    }
}

/// Score every group and assemble rows plus per-question baselines
pub fn analyze_groups(
    groups: &BTreeMap<u32, Vec<PathBuf>>,
    features: &HashMap<PathBuf, Features>,
    config: &AnalysisConfig,
) -> (Vec<Row>, BTreeMap<u32, Baseline>) {
    let mut rows = Vec::new();
    let mut baselines = BTreeMap::new();
    for (&question, files) in groups {
        let (question_rows, baseline) = analyze_question(question, files, features, config);
        rows.extend(question_rows);
        if let Some(b) = baseline {
            baselines.insert(question, b);
        }
    }
    (rows, baselines)
}

fn analyze_question(
    question: u32,
    files: &[PathBuf],
    features: &HashMap<PathBuf, Features>,
    config: &AnalysisConfig,
) -> (Vec<Row>, Option<Baseline>) {
    let tags: Vec<String> = files.iter().map(|p| tag_of(p)).collect();

    // Unordered pairs with distinct tags where both operands are comparable.
    let mut pair_indices: Vec<(usize, usize)> = Vec::new();
    for i in 0..files.len() {
        for j in (i + 1)..files.len() {
            if tags[i].to_lowercase() == tags[j].to_lowercase() {
                continue;
            }
            let both_comparable = matches!(
                (features.get(&files[i]), features.get(&files[j])),
                (Some(a), Some(b)) if a.is_comparable() && b.is_comparable()
            );
            if both_comparable {
                pair_indices.push((i, j));
            }
        }
    }

    let scored: Vec<(usize, usize, PairMetrics)> = pair_indices
        .par_iter()
        .map(|&(i, j)| {
            let metrics = compare_features(
                &features[&files[i]],
                &features[&files[j]],
                &config.weights,
            );
            (i, j, metrics)
        })
        .collect();

    let pair_scores: Vec<f64> = scored.iter().map(|&(_, _, m)| m.score).collect();
    let baseline = baseline_stats(&pair_scores);

    // Best peer per submission; strict `>` keeps the first-seen peer on ties.
    let mut best: Vec<Option<(usize, PairMetrics)>> = vec![None; files.len()];
    for &(i, j, metrics) in &scored {
        if best[i].map_or(true, |(_, prev)| metrics.score > prev.score) {
            best[i] = Some((j, metrics));
        }
        if best[j].map_or(true, |(_, prev)| metrics.score > prev.score) {
            best[j] = Some((i, metrics));
        }
    }

    let rows = files
        .iter()
        .enumerate()
        .map(|(idx, path)| {
            let tag = tags[idx].clone();
            let display_name = config.roster.get(&tag.to_lowercase()).cloned();
            let (best_with, metrics) = match best[idx] {
                Some((peer, m)) => (Some(basename(&files[peer])), m),
                None => (
                    None,
                    PairMetrics {
                        score: 0.0,
                        breakdown: Breakdown::default(),
                        cosine: 0.0,
                    },
                ),
            };
            let zscore = match (&best_with, baseline) {
                (Some(_), Some(b)) if b.stddev > 0.0 => Some((metrics.score - b.mean) / b.stddev),
                _ => None,
            };
            Row {
                question,
                tag,
                display_name,
                file: basename(path),
                best_with,
                score: metrics.score,
                breakdown: metrics.breakdown,
                cosine: metrics.cosine,
                zscore,
                status: classify(metrics.score, &metrics.breakdown, config.threshold, config.policy),
            }
        })
        .collect();

    (rows, baseline)
}
