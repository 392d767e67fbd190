//! HTML report generation
//!
//! Self-contained dark-theme report: one card per question with its
//! baseline line and a table of submissions showing the best peer, the
//! composite and component scores as percentages, the z-score, and the
//! colored triage status.

use crate::types::{AnalysisOutput, Baseline, Row, Status};
use anyhow::{Context, Result};
use chrono::Local;
use std::fmt::Write as _;
use std::path::Path;

/// Generate the HTML report for one analysis run
pub fn generate_html_report(output: &AnalysisOutput, path: &Path) -> Result<()> {
    let html = build_html(output);
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn build_html(output: &AnalysisOutput) -> String {
    let mut html = String::new();
    html.push_str(&build_head(&output.source));

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let weights = serde_json::to_string(&output.weights).unwrap_or_default();
    let _ = write!(
        html,
        r#"<body>
<header><h1>Relatório de Similaridade — Pente Fino</h1>
<div class="sub">Conjunto: {} · Gerado em {} · Pesos: {}</div></header>
<main>
"#,
        esc(&output.source),
        timestamp,
        esc(&weights)
    );

    for (question, rows) in output.rows_by_question() {
        html.push_str(&build_question_card(
            question,
            &rows,
            output.baselines.get(&question),
        ));
    }

    html.push_str(
        r#"</main><footer>
<span class="pill">Jaccard: k-shingles</span> <span class="pill">Fluxo: edição (IF/FOR/WHILE…)</span>
<span class="pill">Ids: nomes iguais</span> <span class="pill">Laços: cabeçalhos normalizados</span>
<span class="pill">Chamadas: funções</span> <span class="pill">Cosseno: sacos de tokens</span>
</footer></body></html>
"#,
    );

    html
}

fn build_head(source: &str) -> String {
    format!(
        r#"<!doctype html><html lang="pt-br"><head><meta charset="utf-8">
<title>Pente Fino — {}</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>
:root{{--bg:#0b1020;--card:#121a33;--muted:#93a4c3;--text:#e8efff;--ok:#7ad97a;--warn:#ffd36e;--bad:#ff7a7a}}
*{{box-sizing:border-box}}body{{margin:0;font-family:system-ui,-apple-system,Segoe UI,Roboto,Arial,sans-serif;background:var(--bg);color:var(--text)}}
header{{padding:24px;border-bottom:1px solid #213055;background:linear-gradient(180deg,#0f1630,transparent)}}
h1{{margin:0 0 6px}}.sub{{color:var(--muted);font-size:14px}}
main{{padding:24px;max-width:1280px;margin:0 auto}}
.card{{background:var(--card);border:1px solid #1f2b4b;border-radius:16px;padding:16px;margin-bottom:20px}}
table{{width:100%;border-collapse:collapse;font-size:14px}}th,td{{padding:10px 12px;border-bottom:1px solid #1f2b4b;text-align:left}}
th{{color:var(--muted)}}tr:hover td{{background:rgba(255,255,255,.03)}}
.pct{{font-variant-numeric:tabular-nums;font-weight:600}}
.good{{color:var(--ok)}}.mid{{color:var(--warn)}}.bad{{color:var(--bad)}}
.pill{{border:1px solid #2a3c6e;border-radius:999px;padding:2px 8px;color:#c9d6f3;font-size:12px}}
.small{{color:var(--muted);font-size:12px}}
footer{{text-align:center;padding:24px;color:var(--muted)}}
</style></head>
"#,
        esc(source)
    )
}

fn build_question_card(question: u32, rows: &[&Row], baseline: Option<&Baseline>) -> String {
    let mut html = String::new();
    let _ = write!(html, "<section class='card'><h2>Questão Q{:02}</h2>", question);
    if let Some(b) = baseline {
        let _ = write!(
            html,
            "<div class='small'>Baseline (score composto) — média={:.3}; DP={:.3}</div>",
            b.mean, b.stddev
        );
    }
    html.push_str(
        "<table><thead><tr>\
<th>Sigla</th><th>Nome</th><th>Arquivo</th><th>Melhor Par</th>\
<th>Score</th><th>Jaccard</th><th>Fluxo</th><th>Ids</th><th>Laços</th><th>Chamadas</th>\
<th>Cosseno</th><th>Z</th><th>Status</th>\
</tr></thead><tbody>",
    );

    for row in rows {
        let class = status_class(row.status);
        let ztext = row
            .zscore
            .map(|z| format!("{:.2}", z))
            .unwrap_or_else(|| "—".to_string());
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
<td class='pct'>{}</td><td class='pct'>{}</td><td class='pct'>{}</td>\
<td class='pct'>{}</td><td class='pct'>{}</td><td class='pct'>{}</td>\
<td class='pct'>{}</td><td class='pct'>{}</td><td class='{}'>{}</td></tr>\n",
            esc(&row.tag),
            esc(row.display_name.as_deref().unwrap_or("")),
            esc(&row.file),
            esc(row.best_with.as_deref().unwrap_or("—")),
            pct(row.score),
            pct(row.breakdown.jaccard),
            pct(row.breakdown.control),
            pct(row.breakdown.idents),
            pct(row.breakdown.loops),
            pct(row.breakdown.calls),
            pct(row.cosine),
            ztext,
            class,
            row.status
        );
    }

    html.push_str("</tbody></table></section>\n");
    html
}

fn status_class(status: Status) -> &'static str {
    match status {
        Status::Suspeito => "bad",
        Status::Revisar => "mid",
        Status::Ok => "good",
    }
}

fn pct(x: f64) -> String {
    format!("{:.1}%", x * 100.0)
}

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Breakdown, Weights};
    use std::collections::BTreeMap;

    fn sample_output() -> AnalysisOutput {
        let row = Row {
            question: 2,
            tag: "abc".to_string(),
            display_name: Some("Ana <Braga>".to_string()),
            file: "q2_abc.c".to_string(),
            best_with: Some("q2_def.c".to_string()),
            score: 0.91,
            breakdown: Breakdown {
                jaccard: 0.95,
                control: 0.9,
                idents: 0.85,
                loops: 1.0,
                calls: 0.75,
            },
            cosine: 0.97,
            zscore: Some(2.1),
            status: Status::Suspeito,
        };
        let mut baselines = BTreeMap::new();
        baselines.insert(
            2,
            Baseline {
                mean: 0.42,
                stddev: 0.2,
            },
        );
        AnalysisOutput {
            source: "turma_b".to_string(),
            weights: Weights::default(),
            rows: vec![row],
            baselines,
        }
    }

    #[test]
    fn test_report_contains_rows_and_baseline() {
        let html = build_html(&sample_output());
        assert!(html.contains("Questão Q02"));
        assert!(html.contains("média=0.420"));
        assert!(html.contains("91.0%"));
        assert!(html.contains("SUSPEITO"));
        // HTML-sensitive characters in names are escaped.
        assert!(html.contains("Ana &lt;Braga&gt;"));
        assert!(!html.contains("Ana <Braga>"));
    }

    #[test]
    fn test_missing_values_render_as_dash() {
        let mut output = sample_output();
        output.rows[0].best_with = None;
        output.rows[0].zscore = None;
        let html = build_html(&output);
        assert!(html.contains("—"));
    }
}
