//! Submission discovery
//!
//! Walks a directory (or accepts a single file), keeps files matching the
//! `qN_SIGLA.c` naming convention, drops basenames matching any ignore
//! glob, and returns a sorted path list. Files that do not match the
//! convention are silently ignored.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Question number and author tag parsed from a submission basename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionName {
    pub question: u32,
    pub tag: String,
}

fn name_pattern() -> &'static Regex {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    NAME_RE.get_or_init(|| {
        Regex::new(r"^[qQ](\d+)[ _-]([A-Za-z0-9_-]+)\.c$")
            .expect("invalid submission name pattern - this is a bug in pente-fino")
    })
}

/// Parse the question number and author tag from a path's basename
pub fn parse_submission_name(path: &Path) -> Option<SubmissionName> {
    let name = path.file_name()?.to_str()?;
    let caps = name_pattern().captures(name)?;
    let question = caps[1].parse().ok()?;
    Some(SubmissionName {
        question,
        tag: caps[2].to_string(),
    })
}

fn build_ignore_set(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for g in globs {
        builder.add(Glob::new(g).with_context(|| format!("invalid ignore glob `{}`", g))?);
    }
    builder.build().context("failed to build ignore globs")
}

fn is_submission(path: &Path, ignore: &GlobSet) -> bool {
    if parse_submission_name(path).is_none() {
        return false;
    }
    match path.file_name() {
        Some(name) => !ignore.is_match(Path::new(name)),
        None => false,
    }
}

/// Collect submission paths under `root`, sorted for determinism
///
/// `root` may be a single file; ignore globs are tested against basenames
/// only. An invalid glob is a configuration error and fails the run.
pub fn gather_files(root: &Path, ignore_globs: &[String]) -> Result<Vec<PathBuf>> {
    let ignore = build_ignore_set(ignore_globs)?;
    let mut paths = Vec::new();

    if root.is_file() {
        if is_submission(root, &ignore) {
            paths.push(root.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && is_submission(entry.path(), &ignore) {
                paths.push(entry.path().to_path_buf());
            }
        }
    }

    paths.sort();
    Ok(paths)
}
