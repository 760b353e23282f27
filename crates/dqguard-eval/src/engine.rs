use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use dqguard_core::Dataset;
use dqguard_rules::{Check, CheckRef, RuleSet};

use crate::evaluators;
use crate::model::{CheckResult, EvaluationResult, SampleRow, COLUMN_NOT_FOUND, SAMPLE_ROW_CAP};

/// Options for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateOptions {
    /// Reference "now" for freshness checks; fixed per run for determinism.
    pub now: NaiveDateTime,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            now: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Evaluate a dataset snapshot against a validated rule set.
#[derive(Debug, Clone)]
pub struct CheckEngine {
    options: EvaluateOptions,
}

impl CheckEngine {
    pub fn new(options: EvaluateOptions) -> Self {
        Self { options }
    }

    /// Run every declared check, in declaration order.
    ///
    /// Checks are isolated: a missing column or any per-check condition
    /// degrades to a failed result, never an early return, so the output
    /// always holds exactly one result per declared check.
    pub fn run(&self, dataset: &Dataset, rules: &RuleSet) -> EvaluationResult {
        tracing::debug!(
            checks = rules.check_count(),
            rows = dataset.row_count(),
            "evaluating rule set"
        );
        let checks = rules
            .iter_checks()
            .map(|check_ref| self.evaluate_one(dataset, check_ref))
            .collect();
        let result = EvaluationResult::from_checks(checks);
        tracing::info!(
            total = result.total_checks,
            passed = result.passed_count,
            failed = result.failed_count,
            "evaluation complete"
        );
        result
    }

    fn evaluate_one(&self, dataset: &Dataset, check_ref: CheckRef<'_>) -> CheckResult {
        let CheckRef {
            table,
            column,
            check,
        } = check_ref;

        // Column-scoped checks degrade to a failed result when the column
        // is absent; this is a check-time condition, not an error.
        let column_idx = match column {
            Some(name) => match dataset.column_index(name) {
                Some(idx) => Some(idx),
                None => return column_not_found(dataset, table, column, check),
            },
            None => None,
        };

        let (failing, passed, excluded) = match (check, column_idx) {
            (Check::Duplicate(spec), _) => match evaluators::duplicate_rows(dataset, spec) {
                Ok(failing) => {
                    let passed = failing.is_empty();
                    (failing, passed, 0)
                }
                Err(_missing) => return column_not_found(dataset, table, column, check),
            },
            (Check::NullRate(spec), Some(idx)) => {
                let (failing, passed) = evaluators::null_rate_outcome(dataset, idx, spec);
                (failing, passed, 0)
            }
            (Check::Range(spec), Some(idx)) => {
                let (failing, excluded) = evaluators::range_outcome(dataset, idx, spec);
                let passed = failing.is_empty();
                (failing, passed, excluded)
            }
            (Check::Enum(spec), Some(idx)) => {
                let failing = evaluators::enum_outcome(dataset, idx, spec);
                let passed = failing.is_empty();
                (failing, passed, 0)
            }
            (Check::Freshness(spec), Some(idx)) => {
                let failing =
                    evaluators::freshness_outcome(dataset, idx, spec, self.options.now);
                let passed = failing.is_empty();
                (failing, passed, 0)
            }
            // Compilation rejects column checks without a column scope.
            (_, None) => return column_not_found(dataset, table, column, check),
        };

        build_result(dataset, table, column, check, failing, passed, excluded, None)
    }
}

fn column_not_found(
    dataset: &Dataset,
    table: &str,
    column: Option<&str>,
    check: &Check,
) -> CheckResult {
    build_result(
        dataset,
        table,
        column,
        check,
        Vec::new(),
        false,
        0,
        Some(COLUMN_NOT_FOUND.to_string()),
    )
}

#[allow(clippy::too_many_arguments)]
fn build_result(
    dataset: &Dataset,
    table: &str,
    column: Option<&str>,
    check: &Check,
    failing: Vec<usize>,
    passed: bool,
    excluded_count: u64,
    reason: Option<String>,
) -> CheckResult {
    let failing_count = failing.len() as u64;
    let failing_fraction = if dataset.row_count() == 0 {
        0.0
    } else {
        failing_count as f64 / dataset.row_count() as f64
    };
    let sample_rows = failing
        .into_iter()
        .take(SAMPLE_ROW_CAP)
        .map(|idx| SampleRow {
            row: idx as u64,
            values: dataset
                .row(idx)
                .map(|row| row.iter().map(|value| value.to_field()).collect())
                .unwrap_or_default(),
        })
        .collect();
    CheckResult {
        table: table.to_string(),
        column: column.map(str::to_string),
        check_type: check.kind(),
        params: check.params_json(),
        passed,
        failing_count,
        failing_fraction,
        sample_rows,
        reason,
        excluded_count,
    }
}
