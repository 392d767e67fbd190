//! Roster reader
//!
//! Optional CSV that decorates author tags with display names in reports.
//! Expected columns: `sigla` and `nome` (extras such as `matricula` are
//! ignored). Lookup keys are lowercased; the engine never depends on the
//! roster being present.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Read a roster CSV into a `lowercase tag -> display name` map
pub fn read_roster(path: &Path) -> Result<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open roster {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let sigla_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("sigla"));
    let nome_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("nome"));
    let (Some(sigla_idx), Some(nome_idx)) = (sigla_idx, nome_idx) else {
        bail!(
            "roster {} must have `sigla` and `nome` columns",
            path.display()
        );
    };

    let mut map = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let sigla = record.get(sigla_idx).unwrap_or("").trim();
        let nome = record.get(nome_idx).unwrap_or("").trim();
        if !sigla.is_empty() && !nome.is_empty() {
            map.insert(sigla.to_lowercase(), nome.to_string());
        }
    }
    Ok(map)
}
