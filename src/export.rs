//! Result export
//!
//! Writers for the machine-readable outputs: CSV summary, JSONL rows,
//! per-student JSON files, and the full analysis document that the
//! `report` subcommand consumes to regenerate HTML offline.

use crate::types::{AnalysisOutput, Row};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const CSV_HEADER: [&str; 14] = [
    "question", "sigla", "nome", "file", "best_with", "score", "jaccard", "control", "idents",
    "loops", "calls", "cosine", "zscore", "status",
];

/// Write one CSV row per submission
pub fn write_csv(rows: &[Row], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(CSV_HEADER)?;
    for r in rows {
        writer.write_record([
            r.question.to_string(),
            r.tag.clone(),
            r.display_name.clone().unwrap_or_default(),
            r.file.clone(),
            r.best_with.clone().unwrap_or_else(|| "—".to_string()),
            format!("{:.6}", r.score),
            format!("{:.6}", r.breakdown.jaccard),
            format!("{:.6}", r.breakdown.control),
            format!("{:.6}", r.breakdown.idents),
            format!("{:.6}", r.breakdown.loops),
            format!("{:.6}", r.breakdown.calls),
            format!("{:.6}", r.cosine),
            r.zscore.map(|z| format!("{:.3}", z)).unwrap_or_default(),
            r.status.to_string(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Write rows as JSONL (one JSON object per line)
pub fn write_jsonl(rows: &[Row], path: &Path) -> Result<()> {
    let mut out = String::new();
    for r in rows {
        out.push_str(&serde_json::to_string(r).context("failed to serialize row")?);
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))
}

/// Write one pretty-printed JSON file per submission
///
/// Layout: `<dir>/Q<NN>_per_student/<sigla>.json`.
pub fn write_student_json(output: &AnalysisOutput, dir: &Path) -> Result<()> {
    for (question, rows) in output.rows_by_question() {
        let qdir = dir.join(format!("Q{:02}_per_student", question));
        fs::create_dir_all(&qdir)
            .with_context(|| format!("failed to create {}", qdir.display()))?;
        for row in rows {
            let path = qdir.join(format!("{}.json", row.tag));
            let json = serde_json::to_string_pretty(row).context("failed to serialize row")?;
            fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
        }
    }
    Ok(())
}

/// Persist the full analysis document
pub fn write_analysis_json(output: &AnalysisOutput, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(output).context("failed to serialize analysis")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Load an analysis document saved by `write_analysis_json`
pub fn load_analysis(path: &Path) -> Result<AnalysisOutput> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
