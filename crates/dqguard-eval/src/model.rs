use std::collections::BTreeMap;

use serde::Serialize;

use dqguard_rules::CheckKind;

/// Hard cap on the offending-row sample per check.
///
/// The sample is the first N failing rows in dataset order, which keeps
/// reports reproducible across runs; the true failing count is reported
/// separately.
pub const SAMPLE_ROW_CAP: usize = 200;

/// Distinguished failure reason for checks whose column is absent.
pub const COLUMN_NOT_FOUND: &str = "column not found";

/// One sampled offending row: its index plus the rendered cell values, so
/// report consumers can show the row without re-reading the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRow {
    pub row: u64,
    pub values: Vec<String>,
}

/// Outcome of one declared check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub table: String,
    pub column: Option<String>,
    pub check_type: CheckKind,
    pub params: serde_json::Value,
    pub passed: bool,
    pub failing_count: u64,
    pub failing_fraction: f64,
    /// Offending rows in dataset order, capped at [`SAMPLE_ROW_CAP`].
    pub sample_rows: Vec<SampleRow>,
    /// Set for degraded outcomes such as [`COLUMN_NOT_FOUND`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Values excluded from pass/fail (range: non-numeric or missing).
    #[serde(skip_serializing_if = "is_zero")]
    pub excluded_count: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Failed-check count for one column, for "top offending columns" views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnFailureCount {
    pub column: String,
    pub failed_checks: u64,
}

/// Pass rate over the checks declared for one table.
#[derive(Debug, Clone, Serialize)]
pub struct TablePassRate {
    pub table: String,
    pub total_checks: u64,
    pub passed_checks: u64,
    pub pass_rate: f64,
}

/// Immutable evaluation outcome: ordered results plus derived aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub checks: Vec<CheckResult>,
    pub total_checks: u64,
    pub passed_count: u64,
    pub failed_count: u64,
    pub column_failures: Vec<ColumnFailureCount>,
    pub table_pass_rates: Vec<TablePassRate>,
}

impl EvaluationResult {
    /// Derive the aggregates as a pure reduction over the result list.
    pub fn from_checks(checks: Vec<CheckResult>) -> Self {
        let total_checks = checks.len() as u64;
        let passed_count = checks.iter().filter(|check| check.passed).count() as u64;
        let failed_count = total_checks - passed_count;

        let mut per_column: BTreeMap<String, u64> = BTreeMap::new();
        for check in checks.iter().filter(|check| !check.passed) {
            if let Some(column) = &check.column {
                *per_column.entry(column.clone()).or_default() += 1;
            }
        }
        let mut column_failures: Vec<ColumnFailureCount> = per_column
            .into_iter()
            .map(|(column, failed_checks)| ColumnFailureCount {
                column,
                failed_checks,
            })
            .collect();
        // Worst offenders first; BTreeMap already fixed the name order for ties.
        column_failures.sort_by(|a, b| b.failed_checks.cmp(&a.failed_checks));

        let mut table_order = Vec::new();
        let mut per_table: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for check in &checks {
            if !per_table.contains_key(&check.table) {
                table_order.push(check.table.clone());
            }
            let entry = per_table.entry(check.table.clone()).or_default();
            entry.0 += 1;
            if check.passed {
                entry.1 += 1;
            }
        }
        let table_pass_rates = table_order
            .into_iter()
            .map(|table| {
                let (total, passed) = per_table[&table];
                TablePassRate {
                    table,
                    total_checks: total,
                    passed_checks: passed,
                    pass_rate: if total == 0 {
                        1.0
                    } else {
                        passed as f64 / total as f64
                    },
                }
            })
            .collect();

        Self {
            checks,
            total_checks,
            passed_count,
            failed_count,
            column_failures,
            table_pass_rates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(table: &str, column: Option<&str>, passed: bool) -> CheckResult {
        CheckResult {
            table: table.to_string(),
            column: column.map(str::to_string),
            check_type: CheckKind::Range,
            params: serde_json::json!({}),
            passed,
            failing_count: if passed { 0 } else { 1 },
            failing_fraction: 0.0,
            sample_rows: Vec::new(),
            reason: None,
            excluded_count: 0,
        }
    }

    #[test]
    fn aggregates_count_passed_and_failed() {
        let agg = EvaluationResult::from_checks(vec![
            result("orders", Some("amount"), false),
            result("orders", Some("amount"), false),
            result("orders", Some("status"), true),
            result("events", None, true),
        ]);
        assert_eq!(agg.total_checks, 4);
        assert_eq!(agg.passed_count, 2);
        assert_eq!(agg.failed_count, 2);
        assert_eq!(
            agg.column_failures,
            vec![ColumnFailureCount {
                column: "amount".to_string(),
                failed_checks: 2
            }]
        );
        assert_eq!(agg.table_pass_rates.len(), 2);
        assert_eq!(agg.table_pass_rates[0].table, "orders");
        assert!((agg.table_pass_rates[0].pass_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!((agg.table_pass_rates[1].pass_rate - 1.0).abs() < 1e-9);
    }
}
