use std::fs;
use std::path::Path;

use dqguard_cli::run::{run_check, CheckArgs};

const RULES: &str = r#"
tables:
  - name: orders
    checks:
      - type: duplicate
        subset: [id]
    columns:
      - name: amount
        checks:
          - type: range
            min: 0
            max: 100
      - name: status
        checks:
          - type: enum
            allowed: [new, shipped]
"#;

const INPUT: &str = "\
id,amount,status
1,10,new
1,10,new
2,500,shipped
3,20,bogus
";

fn args(dir: &Path) -> CheckArgs {
    let rules = dir.join("rules.yaml");
    let input = dir.join("input.csv");
    fs::write(&rules, RULES).expect("write rules");
    fs::write(&input, INPUT).expect("write input");
    CheckArgs {
        rules,
        input,
        out: dir.join("out"),
        delimiter: ',',
        fix: false,
        fix_dry_run: false,
        max_row_drop_frac: 0.02,
        max_cell_change_frac: 0.05,
        trim: false,
        normalize_timestamps: false,
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    let text = fs::read_to_string(path).expect("read artifact");
    serde_json::from_str(&text).expect("parse artifact")
}

#[test]
fn check_writes_results_and_skips_the_fix_pass() {
    let dir = tempfile::tempdir().expect("tempdir");
    let args = args(dir.path());
    let out = args.out.clone();

    let outcome = run_check(args).expect("run check");
    assert_eq!(outcome.evaluation.failed_count, 3);
    assert!(outcome.fix_report.is_none());

    let results = read_json(&out.join("results.json"));
    assert_eq!(results["run_id"], serde_json::json!(outcome.run_id));
    assert_eq!(results["evaluation"]["total_checks"], 3);
    assert_eq!(results["evaluation"]["checks"][0]["check_type"], "duplicate");
    assert!(!out.join("fix_report.json").exists());
    assert!(!out.join("cleaned.csv").exists());
}

#[test]
fn fix_writes_the_cleaned_dataset_and_quarantine_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut args = args(dir.path());
    args.fix = true;
    args.max_row_drop_frac = 1.0;
    args.max_cell_change_frac = 1.0;
    let out = args.out.clone();

    let outcome = run_check(args).expect("run check");
    let report = outcome.fix_report.expect("fix report");
    assert_eq!(report.total_rows_dropped, 1);
    assert_eq!(report.total_cells_changed, 2);

    let cleaned = fs::read_to_string(out.join("cleaned.csv")).expect("read cleaned");
    let mut lines = cleaned.lines();
    assert_eq!(lines.next(), Some("id,amount,status"));
    assert_eq!(lines.clone().count(), 3);
    // Out-of-range amount clipped, disallowed status nulled out.
    assert!(cleaned.contains("2,100,shipped"));
    assert!(cleaned.contains("3,20,"));

    let quarantine =
        fs::read_to_string(out.join("quarantine").join("duplicate_rows.csv"))
            .expect("read quarantine");
    assert!(quarantine.starts_with("source_row,id,amount,status"));
    assert!(quarantine.contains("1,1,10,new"));
}

#[test]
fn dry_run_reports_without_touching_the_dataset_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut args = args(dir.path());
    args.fix_dry_run = true;
    args.max_row_drop_frac = 1.0;
    args.max_cell_change_frac = 1.0;
    let out = args.out.clone();

    let outcome = run_check(args).expect("run check");
    assert!(outcome.fix_report.is_some());

    let report = read_json(&out.join("fix_report.json"));
    assert_eq!(report["rows_before"], 4);
    assert_eq!(report["rows_after"], 3);
    assert!(!out.join("cleaned.csv").exists());
    assert!(!out.join("quarantine").exists());
}

#[test]
fn invalid_rules_fail_before_any_artifact_is_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut args = args(dir.path());
    fs::write(
        &args.rules,
        "tables:\n  - name: orders\n    columns:\n      - name: amount\n        checks:\n          - type: bogus\n",
    )
    .expect("write rules");
    args.fix = false;
    let out = args.out.clone();

    assert!(run_check(args).is_err());
    assert!(!out.exists());
}
