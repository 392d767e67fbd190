//! End-to-end pipeline tests over real files

use pente_fino::types::{AnalysisConfig, Status};
use pente_fino::AnalysisEngine;
use std::fs;
use std::path::Path;

const SUM_LOOP: &str = r#"
#include <stdio.h>
int main(void) {
    int i, n = 10, soma = 0;
    for (i = 0; i < n; i++) {
        soma += i;
    }
    printf("%d\n", soma);
    return 0;
}
"#;

const FACTORIAL: &str = r#"
#include <stdio.h>
long fatorial(long n) {
    if (n <= 1) {
        return 1;
    }
    return n * fatorial(n - 1);
}
int main(void) {
    long n = 0;
    while (scanf("%ld", &n) == 1) {
        printf("%ld\n", fatorial(n));
    }
    return 0;
}
"#;

fn config_for(dir: &Path) -> AnalysisConfig {
    AnalysisConfig {
        cache_path: dir.join("cache.json"),
        ..AnalysisConfig::default()
    }
}

#[test]
fn identical_pair_is_flagged_and_outlier_is_not() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("q1_aaa.c"), SUM_LOOP).unwrap();
    fs::write(dir.path().join("q1_bbb.c"), SUM_LOOP).unwrap();
    fs::write(dir.path().join("q1_ccc.c"), FACTORIAL).unwrap();

    let config = config_for(dir.path());
    let output = AnalysisEngine::new(&config).run(dir.path()).unwrap();

    assert_eq!(output.rows.len(), 3);
    let aaa = &output.rows[0];
    let bbb = &output.rows[1];
    let ccc = &output.rows[2];

    // The identical submissions point at each other with a perfect score.
    assert_eq!(aaa.best_with.as_deref(), Some("q1_bbb.c"));
    assert_eq!(bbb.best_with.as_deref(), Some("q1_aaa.c"));
    assert!((aaa.score - 1.0).abs() < 1e-9);
    assert!((bbb.score - 1.0).abs() < 1e-9);
    assert_eq!(aaa.status, Status::Suspeito);
    assert_eq!(bbb.status, Status::Suspeito);

    // The unrelated submission stays well under the threshold and, on the
    // tie between the two identical peers, keeps the first-seen one.
    assert!(ccc.score < 0.70);
    assert_eq!(ccc.status, Status::Ok);
    assert_eq!(ccc.best_with.as_deref(), Some("q1_aaa.c"));

    // Baseline over the three pair composites.
    let baseline = output.baselines[&1];
    let expected_mean = (1.0 + 2.0 * ccc.score) / 3.0;
    assert!((baseline.mean - expected_mean).abs() < 1e-9);
    assert!(baseline.stddev > 0.0);
    assert!(aaa.zscore.unwrap() > 0.0);
    assert!(ccc.zscore.unwrap() < 0.0);
}

#[test]
fn questions_are_compared_in_isolation() {
    let dir = tempfile::tempdir().unwrap();
    // The same program appears in both questions; peers must stay within
    // the question.
    fs::write(dir.path().join("q1_aaa.c"), SUM_LOOP).unwrap();
    fs::write(dir.path().join("q1_bbb.c"), FACTORIAL).unwrap();
    fs::write(dir.path().join("q2_ccc.c"), SUM_LOOP).unwrap();
    fs::write(dir.path().join("q2_ddd.c"), FACTORIAL).unwrap();

    let config = config_for(dir.path());
    let output = AnalysisEngine::new(&config).run(dir.path()).unwrap();

    assert_eq!(output.rows.len(), 4);
    for row in &output.rows {
        let peer = row.best_with.as_deref().unwrap();
        assert!(peer.starts_with(&format!("q{}_", row.question)));
    }
}

#[test]
fn repeated_runs_reuse_the_cache_and_agree() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("q1_aaa.c"), SUM_LOOP).unwrap();
    fs::write(dir.path().join("q1_bbb.c"), FACTORIAL).unwrap();

    let config = config_for(dir.path());
    let first = AnalysisEngine::new(&config).run(dir.path()).unwrap();
    assert!(config.cache_path.is_file());

    // Second run resolves every file from the cache.
    let second = AnalysisEngine::new(&config).run(dir.path()).unwrap();
    assert_eq!(first.rows, second.rows);
    assert_eq!(first.baselines, second.baselines);

    // Rewriting a file (new size) invalidates its entry.
    fs::write(dir.path().join("q1_bbb.c"), SUM_LOOP).unwrap();
    let third = AnalysisEngine::new(&config).run(dir.path()).unwrap();
    assert!((third.rows[0].score - 1.0).abs() < 1e-9);
    assert_eq!(third.rows[0].status, Status::Suspeito);
}

#[test]
fn fewer_than_two_submissions_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("q1_aaa.c"), SUM_LOOP).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a submission").unwrap();

    let config = config_for(dir.path());
    let err = AnalysisEngine::new(&config).run(dir.path()).unwrap_err();
    assert!(err.to_string().contains("at least 2"));
}

#[test]
fn invalid_configuration_fails_before_any_io() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig {
        k: 0,
        ..config_for(dir.path())
    };
    assert!(AnalysisEngine::new(&config).run(dir.path()).is_err());
}

#[test]
fn unreadable_submission_never_aborts_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("q1_aaa.c"), SUM_LOOP).unwrap();
    fs::write(dir.path().join("q1_bbb.c"), SUM_LOOP).unwrap();
    // Eligible by name but with too few tokens to compare.
    fs::write(dir.path().join("q1_ccc.c"), "int x;").unwrap();

    let config = config_for(dir.path());
    let output = AnalysisEngine::new(&config).run(dir.path()).unwrap();

    assert_eq!(output.rows.len(), 3);
    let ccc = &output.rows[2];
    assert!(ccc.best_with.is_none());
    assert_eq!(ccc.score, 0.0);
    assert_eq!(ccc.status, Status::Ok);
    // The aaa/bbb pair still scored.
    assert!((output.rows[0].score - 1.0).abs() < 1e-9);
}

#[test]
fn explicit_jobs_count_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("q1_aaa.c"), SUM_LOOP).unwrap();
    fs::write(dir.path().join("q1_bbb.c"), FACTORIAL).unwrap();

    let config = AnalysisConfig {
        jobs: 2,
        ..config_for(dir.path())
    };
    let output = AnalysisEngine::new(&config).run(dir.path()).unwrap();
    assert_eq!(output.rows.len(), 2);
}
