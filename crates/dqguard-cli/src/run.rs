//! The `dqguard check` flow: load, evaluate, optionally fix, write artifacts.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use uuid::Uuid;

use dqguard_eval::{CheckEngine, EvaluateOptions, EvaluationResult};
use dqguard_fix::{apply_fixes, FixConfig, FixReport, GuardrailBudget};
use dqguard_rules::parse_rules;

use crate::load::load_csv;
use crate::output::{
    prepare_out_dir, write_cleaned_csv, write_fix_report, write_results, CsvQuarantineSink,
    RunSummary,
};
use crate::CliError;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// YAML rule file.
    #[arg(long, value_name = "FILE")]
    pub rules: PathBuf,
    /// CSV dataset to check.
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,
    /// Output directory for run artifacts.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,
    /// CSV field delimiter.
    #[arg(long, default_value = ",")]
    pub delimiter: char,
    /// Run the fix pass and write the cleaned dataset.
    #[arg(long, default_value_t = false)]
    pub fix: bool,
    /// Run the fix pass and write the report, but no cleaned dataset.
    #[arg(long, default_value_t = false, conflicts_with = "fix")]
    pub fix_dry_run: bool,
    /// Largest fraction of rows the fix pass may drop.
    #[arg(long, default_value_t = 0.02)]
    pub max_row_drop_frac: f64,
    /// Largest fraction of cells the fix pass may change.
    #[arg(long, default_value_t = 0.05)]
    pub max_cell_change_frac: f64,
    /// Trim surrounding whitespace from text cells before fixing.
    #[arg(long, default_value_t = false)]
    pub trim: bool,
    /// Parse freshness columns into typed timestamps before fixing.
    #[arg(long, default_value_t = false)]
    pub normalize_timestamps: bool,
}

/// Outcome of one `check` run, returned for tests and callers.
#[derive(Debug)]
pub struct CheckOutcome {
    pub run_id: String,
    pub evaluation: EvaluationResult,
    pub fix_report: Option<FixReport>,
}

pub fn run_check(args: CheckArgs) -> Result<CheckOutcome, CliError> {
    let delimiter = parse_delimiter(args.delimiter)?;
    let run_id = Uuid::new_v4().to_string();
    let started_at = chrono::Utc::now();
    let timer = Instant::now();

    tracing::info!(event = "run_started", run_id = %run_id, input = %args.input.display());

    let rules_text = fs::read_to_string(&args.rules)?;
    let rules = match parse_rules(&rules_text) {
        Ok(rules) => rules,
        Err(err) => {
            for issue in err.issues() {
                tracing::error!(code = %issue.code, path = %issue.path, "{}", issue);
            }
            return Err(err.into());
        }
    };
    tracing::info!(event = "rules_compiled", checks = rules.check_count());

    let dataset = load_csv(&args.input, delimiter)?;

    let now = started_at.naive_utc();
    let engine = CheckEngine::new(EvaluateOptions { now });
    let evaluation = engine.run(&dataset, &rules);

    let paths = prepare_out_dir(&args.out)?;
    let summary = RunSummary {
        run_id: run_id.clone(),
        started_at: started_at.to_rfc3339(),
        rules: args.rules.display().to_string(),
        input: args.input.display().to_string(),
        evaluation: &evaluation,
    };
    write_results(&paths, &summary)?;
    tracing::info!(event = "results_written", path = %paths.results_path.display());

    let fix_report = if args.fix || args.fix_dry_run {
        let config = FixConfig {
            budget: GuardrailBudget::new(args.max_row_drop_frac, args.max_cell_change_frac)?,
            trim_strings: args.trim,
            normalize_timestamps: args.normalize_timestamps,
            now,
        };
        let mut sink = CsvQuarantineSink::new();
        let (cleaned, report) = apply_fixes(&dataset, &rules, &evaluation, &config, &mut sink)?;
        write_fix_report(&paths, &report)?;
        tracing::info!(event = "fix_report_written", path = %paths.fix_report_path.display());
        if args.fix {
            write_cleaned_csv(&paths, &cleaned, delimiter)?;
            sink.flush(&paths, dataset.columns(), delimiter)?;
            tracing::info!(event = "cleaned_written", path = %paths.cleaned_path.display());
        }
        Some(report)
    } else {
        None
    };

    tracing::info!(
        event = "run_finished",
        status = "success",
        failed_checks = evaluation.failed_count,
        duration_ms = timer.elapsed().as_millis()
    );

    Ok(CheckOutcome {
        run_id,
        evaluation,
        fix_report,
    })
}

fn parse_delimiter(delimiter: char) -> Result<u8, CliError> {
    u8::try_from(delimiter).map_err(|_| {
        CliError::InvalidConfig(format!("delimiter '{delimiter}' is not a single-byte character"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multibyte_delimiters_are_rejected() {
        assert!(parse_delimiter(',').is_ok());
        assert!(parse_delimiter(';').is_ok());
        assert!(parse_delimiter('→').is_err());
    }
}
