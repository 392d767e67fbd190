//! Pente Fino - similarity triage for C programming assignments
//!
//! This library groups submissions named `qN_SIGLA.c` by question, turns
//! each file into a bundle of lexical features (normalized token shingles,
//! identifier and call sets, a compressed control-flow stream, and loop
//! header signatures), scores every within-question pair with a weighted
//! composite of five similarity measures, and emits one row per submission
//! with its closest peer, score breakdown, z-score against the question
//! baseline, and a triage status an instructor can act on.
//!
//! The CLI and the HTML/CSV/JSON reporters share this engine.

pub mod cache;
pub mod export;
pub mod features;
pub mod index;
pub mod lexer;
pub mod pairwise;
pub mod report;
pub mod roster;
pub mod similarity;
pub mod types;

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::cache::{CacheKey, FeatureCache};
use crate::types::{AnalysisConfig, AnalysisOutput, Features};

/// Trait for reporting progress during long-running operations
pub trait ProgressReporter: Send + Sync {
    fn start(&self, total: u64, message: &str);
    fn inc(&self, delta: u64);
    fn finish(&self, message: &str);
}

/// A no-op progress reporter that does nothing
pub struct NoopProgressReporter;
impl ProgressReporter for NoopProgressReporter {
    fn start(&self, _total: u64, _message: &str) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _message: &str) {}
}

/// Core analysis engine shared by the CLI and any embedding front end
pub struct AnalysisEngine<'a> {
    pub config: &'a AnalysisConfig,
    pub progress: Option<&'a dyn ProgressReporter>,
}

impl<'a> AnalysisEngine<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the full pipeline: gather, extract (cache-backed), score
    ///
    /// Fails fast on invalid configuration and when fewer than two eligible
    /// submissions exist under `root`.
    pub fn run(&self, root: &Path) -> Result<AnalysisOutput> {
        self.config.validate().context("invalid configuration")?;

        let paths = index::gather_files(root, &self.config.ignore_globs)?;
        if paths.len() < 2 {
            bail!(
                "need at least 2 eligible submissions under {}, found {}",
                root.display(),
                paths.len()
            );
        }
        debug!("gathered {} submissions", paths.len());

        if self.config.jobs > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.jobs)
                .build()
                .context("failed to build worker pool")?;
            pool.install(|| self.run_pipeline(root, &paths))
        } else {
            self.run_pipeline(root, &paths)
        }
    }

    fn run_pipeline(&self, root: &Path, paths: &[PathBuf]) -> Result<AnalysisOutput> {
        // Stage A: feature extraction over the cache-miss set.
        let features = self.extract_all(paths)?;

        // Stage B: grouping, pairwise scoring, row assembly.
        if let Some(p) = self.progress {
            p.start(0, "Scoring pairs...");
        }
        let groups = pairwise::group_by_question(paths);
        let (rows, baselines) = pairwise::analyze_groups(&groups, &features, self.config);
        if let Some(p) = self.progress {
            p.finish("Scoring complete");
        }

        Ok(AnalysisOutput {
            source: source_label(root),
            weights: self.config.weights,
            rows,
            baselines,
        })
    }

    /// Resolve features for every path, extracting cache misses in parallel
    ///
    /// Workers are stateless; the cache map stays with the coordinator and
    /// is written back once at the end.
    fn extract_all(&self, paths: &[PathBuf]) -> Result<HashMap<PathBuf, Features>> {
        let mut cache = FeatureCache::load(&self.config.cache_path);
        let mut features: HashMap<PathBuf, Features> = HashMap::new();
        let mut todo: Vec<(PathBuf, CacheKey)> = Vec::new();
        let mut hits = 0usize;

        for path in paths {
            match CacheKey::for_path(path) {
                Ok(key) => {
                    if let Some(cached) = cache.get(&key) {
                        features.insert(path.clone(), cached.clone());
                        hits += 1;
                    } else {
                        todo.push((path.clone(), key));
                    }
                }
                Err(e) => {
                    features.insert(
                        path.clone(),
                        Features::from_error(format!("{}: {}", path.display(), e)),
                    );
                }
            }
        }
        debug!("{} cache hits, {} files to extract", hits, todo.len());

        if let Some(p) = self.progress {
            p.start(todo.len() as u64, "Extracting features...");
        }

        let extracted: Vec<(PathBuf, CacheKey, Features)> = todo
            .into_par_iter()
            .map(|(path, key)| {
                let bundle = features::extract_file(&path, self.config);
                if let Some(p) = self.progress {
                    p.inc(1);
                }
                (path, key, bundle)
            })
            .collect();

        for (path, key, bundle) in extracted {
            cache.insert(key, bundle.clone());
            features.insert(path, bundle);
        }

        if cache.is_dirty() {
            if let Err(e) = cache.save() {
                warn!("failed to write feature cache: {:#}", e);
            }
        }

        if let Some(p) = self.progress {
            p.finish("Feature extraction complete");
        }
        Ok(features)
    }
}

/// Label for the analyzed set: the directory basename, or the parent
/// directory's basename for a single-file input
fn source_label(root: &Path) -> String {
    let dir = if root.is_file() {
        root.parent().unwrap_or(root)
    } else {
        root
    };
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
