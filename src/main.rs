//! Pente Fino - similarity triage for C programming assignments
//!
//! A standalone executable that:
//! - gathers `qN_SIGLA.c` submissions from a directory (or a single file)
//! - extracts lexical features in parallel, backed by a persistent cache
//! - scores every within-question pair with a weighted composite
//! - prints a console summary and top-N listing
//! - exports HTML, CSV, JSONL, and per-student JSON reports

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use pente_fino::export::{
    load_analysis, write_analysis_json, write_csv, write_jsonl, write_student_json,
};
use pente_fino::report::generate_html_report;
use pente_fino::roster::read_roster;
use pente_fino::types::{AnalysisConfig, AnalysisOutput, Policy, Row, Status, Weights};
use pente_fino::{AnalysisEngine, ProgressReporter};

/// Pente Fino - similarity triage for C programming assignments
#[derive(Parser)]
#[command(name = "pente-fino")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a directory (or single file) of submissions
    Analyze {
        /// Directory or file containing `qN_SIGLA.c` submissions
        path: PathBuf,

        /// Shingle width in tokens
        #[arg(long, default_value = "5")]
        k: usize,

        /// Keep identifiers verbatim instead of aliasing them
        #[arg(long)]
        no_normalize: bool,

        /// Minimum raw-token count for a file to be eligible
        #[arg(long, default_value = "10")]
        min_tokens: usize,

        /// Worker-pool size (0 = derive from hardware parallelism)
        #[arg(short, long, default_value = "0")]
        jobs: usize,

        /// Basename globs to exclude (comma-separated)
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,

        /// Path of the persistent feature cache
        #[arg(long, default_value = ".pente_fino_cache.json")]
        cache: PathBuf,

        /// CSV roster with `sigla,nome` columns for display names
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Weight of the k-shingle Jaccard component
        #[arg(long, default_value = "0.40")]
        w_jaccard: f64,

        /// Weight of the control-flow edit component
        #[arg(long, default_value = "0.20")]
        w_control: f64,

        /// Weight of the identifier Jaccard component
        #[arg(long, default_value = "0.15")]
        w_idents: f64,

        /// Weight of the loop-signature Jaccard component
        #[arg(long, default_value = "0.15")]
        w_loops: f64,

        /// Weight of the call Jaccard component
        #[arg(long, default_value = "0.10")]
        w_calls: f64,

        /// Composite threshold for the status policy
        #[arg(long, default_value = "0.70")]
        threshold: f64,

        /// Flagging policy (any, all, weighted)
        #[arg(long, value_enum, default_value = "weighted")]
        policy: Policy,

        /// Output HTML report path (defaults into the run directory)
        #[arg(long)]
        html: Option<PathBuf>,

        /// Output CSV path (defaults into the run directory)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Directory for per-student JSON files
        #[arg(long)]
        jsondir: Option<PathBuf>,

        /// Base directory for run outputs
        #[arg(short = 'B', long, default_value = "results")]
        results_base: PathBuf,

        /// Rows shown in the console top listing
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Regenerate the HTML report from a saved analysis document
    Report {
        /// `analysis.json` produced by a previous run
        #[arg(short, long)]
        input: PathBuf,

        /// Output HTML file path
        #[arg(long)]
        html: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logger (controlled by RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            k,
            no_normalize,
            min_tokens,
            jobs,
            ignore,
            cache,
            roster,
            w_jaccard,
            w_control,
            w_idents,
            w_loops,
            w_calls,
            threshold,
            policy,
            html,
            csv,
            jsondir,
            results_base,
            top,
        } => {
            let roster_map = match roster {
                Some(ref p) => read_roster(p)?,
                None => Default::default(),
            };
            let config = AnalysisConfig {
                k,
                normalize_identifiers: !no_normalize,
                min_tokens,
                weights: Weights {
                    jaccard: w_jaccard,
                    control: w_control,
                    idents: w_idents,
                    loops: w_loops,
                    calls: w_calls,
                },
                threshold,
                policy,
                jobs,
                ignore_globs: ignore,
                cache_path: cache,
                roster: roster_map,
            };
            run_analyze(&path, &config, html, csv, jsondir, &results_base, top)?;
        }

        Commands::Report { input, html } => {
            run_report(&input, &html)?;
        }
    }

    Ok(())
}

/// Run the analyze command
fn run_analyze(
    path: &Path,
    config: &AnalysisConfig,
    html: Option<PathBuf>,
    csv: Option<PathBuf>,
    jsondir: Option<PathBuf>,
    results_base: &Path,
    top: usize,
) -> Result<()> {
    println!("{}", style("Pente Fino").cyan().bold());
    println!("{}", style("═".repeat(60)).dim());

    let progress = ConsoleProgress::new();
    let output = AnalysisEngine::new(config)
        .with_progress(&progress)
        .run(path)?;

    // Console summary
    println!("\n{}", style("Resumo").cyan().bold());
    println!("{}", style("─".repeat(60)).dim());
    display_summary_table(&output);

    if !output.rows.is_empty() {
        println!("\n{}", style("Maiores scores").cyan().bold());
        println!("{}", style("─".repeat(60)).dim());
        display_top_table(&output.rows, top);
    }

    // Exports
    let results_dir = ensure_results_dir(results_base)?;
    let html_path = html.unwrap_or_else(|| results_dir.join("report.html"));
    let csv_path = csv.unwrap_or_else(|| results_dir.join("results.csv"));
    let jsonl_path = results_dir.join("results.jsonl");
    let analysis_path = results_dir.join("analysis.json");

    generate_html_report(&output, &html_path)?;
    write_csv(&output.rows, &csv_path)?;
    write_jsonl(&output.rows, &jsonl_path)?;
    write_analysis_json(&output, &analysis_path)?;
    if let Some(ref dir) = jsondir {
        write_student_json(&output, dir)?;
    }

    println!("\n{}", style("Exports").cyan().bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  {} {}", style("HTML:").dim(), html_path.display());
    println!("  {} {}", style("CSV:").dim(), csv_path.display());
    println!("  {} {}", style("JSONL:").dim(), jsonl_path.display());
    println!("  {} {}", style("Analysis:").dim(), analysis_path.display());
    if let Some(ref dir) = jsondir {
        println!("  {} {}/", style("Per-student JSON:").dim(), dir.display());
    }

    println!("\n{}", style("✓ Complete").green().bold());
    Ok(())
}

/// Run the report command
fn run_report(input: &Path, html: &Path) -> Result<()> {
    println!("{}", style("Pente Fino Report Generator").cyan().bold());
    println!("{}", style("═".repeat(60)).dim());

    println!("\nLoading analysis from {}...", input.display());
    let output = load_analysis(input)?;
    println!("  Loaded {} rows", style(output.rows.len()).green());

    generate_html_report(&output, html)?;
    println!("\n{} Report generated: {}", style("✓").green(), html.display());
    Ok(())
}

/// Progress reporter backed by an indicatif bar
struct ConsoleProgress {
    bar: Mutex<ProgressBar>,
}

impl ConsoleProgress {
    fn new() -> Self {
        Self {
            bar: Mutex::new(ProgressBar::hidden()),
        }
    }
}

impl ProgressReporter for ConsoleProgress {
    fn start(&self, total: u64, message: &str) {
        let mut bar = self.bar.lock().expect("progress bar lock poisoned");
        bar.finish_and_clear();
        *bar = if total > 0 {
            create_progress_bar(total)
        } else {
            ProgressBar::new_spinner()
        };
        bar.set_message(message.to_string());
    }

    fn inc(&self, delta: u64) {
        self.bar.lock().expect("progress bar lock poisoned").inc(delta);
    }

    fn finish(&self, message: &str) {
        self.bar
            .lock()
            .expect("progress bar lock poisoned")
            .finish_with_message(message.to_string());
    }
}

/// Create a progress bar
fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("invalid progress bar template - this is a bug in pente-fino")
            .progress_chars("█▓░"),
    );
    pb
}

/// Display aggregate statistics for the run
fn display_summary_table(output: &AnalysisOutput) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);

    table.set_header(vec![
        Cell::new("Metric").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
    ]);

    let questions = output.rows_by_question().len();
    let suspects = output
        .rows
        .iter()
        .filter(|r| r.status == Status::Suspeito)
        .count();
    let reviews = output
        .rows
        .iter()
        .filter(|r| r.status == Status::Revisar)
        .count();
    let max_score = output.rows.iter().map(|r| r.score).fold(0.0, f64::max);

    table.add_row(vec![
        Cell::new("Questions"),
        Cell::new(questions).fg(Color::White),
    ]);
    table.add_row(vec![
        Cell::new("Submissions"),
        Cell::new(output.rows.len()).fg(Color::White),
    ]);
    table.add_row(vec![
        Cell::new("SUSPEITO"),
        Cell::new(suspects).fg(if suspects > 0 { Color::Red } else { Color::White }),
    ]);
    table.add_row(vec![
        Cell::new("REVISAR"),
        Cell::new(reviews).fg(if reviews > 0 { Color::Yellow } else { Color::White }),
    ]);
    table.add_row(vec![
        Cell::new("Max score"),
        Cell::new(format!("{:.1}%", max_score * 100.0)).fg(score_color(max_score)),
    ]);

    println!("{table}");
}

/// Display the highest-scoring rows across all questions
fn display_top_table(rows: &[Row], top: usize) {
    let mut sorted: Vec<&Row> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Q").fg(Color::Cyan),
        Cell::new("Sigla").fg(Color::Cyan),
        Cell::new("Arquivo").fg(Color::Cyan),
        Cell::new("Melhor Par").fg(Color::Cyan),
        Cell::new("Score").fg(Color::Cyan),
        Cell::new("Z").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    for row in sorted.into_iter().take(top) {
        let status_color = match row.status {
            Status::Suspeito => Color::Red,
            Status::Revisar => Color::Yellow,
            Status::Ok => Color::Green,
        };
        table.add_row(vec![
            Cell::new(format!("Q{:02}", row.question)),
            Cell::new(&row.tag),
            Cell::new(&row.file),
            Cell::new(row.best_with.as_deref().unwrap_or("—")),
            Cell::new(format!("{:.1}%", row.score * 100.0)).fg(score_color(row.score)),
            Cell::new(
                row.zscore
                    .map(|z| format!("{:.2}", z))
                    .unwrap_or_else(|| "—".to_string()),
            ),
            Cell::new(row.status.as_str()).fg(status_color),
        ]);
    }

    println!("{table}");
}

fn score_color(score: f64) -> Color {
    if score >= 0.70 {
        Color::Red
    } else if score >= 0.50 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Generate a short unique ID for the run
fn generate_run_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let mut hasher = DefaultHasher::new();
    now.as_nanos().hash(&mut hasher);
    std::process::id().hash(&mut hasher);

    let hash = hasher.finish();
    format!("{:08x}", hash as u32) // 8-char hex ID
}

/// Ensure the results directory exists and create a unique run subfolder
///
/// Creates a subfolder with format: `run_YYYYMMDD_HHMMSS_<unique-id>`
/// so repeated runs never overwrite each other.
fn ensure_results_dir(base_path: &Path) -> Result<PathBuf> {
    if !base_path.exists() {
        fs::create_dir_all(base_path).context("Failed to create base output directory")?;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let run_folder = base_path.join(format!("run_{}_{}", timestamp, generate_run_id()));

    fs::create_dir_all(&run_folder).context("Failed to create run directory")?;

    Ok(run_folder)
}
