//! Budget enforcement and the fix controller.
//!
//! The controller folds over the failed checks in declaration order. Every
//! fixer proposes a candidate against the current dataset; the budget is
//! checked against the candidate's projected cost before anything is
//! applied, and a rejected candidate leaves the dataset untouched. The
//! budget is advisory per fix: a rejection is recorded and the fold moves
//! on, it never aborts the run.

use chrono::NaiveDateTime;
use serde::Serialize;

use dqguard_core::Dataset;
use dqguard_eval::{EvaluationResult, COLUMN_NOT_FOUND};
use dqguard_rules::{Check, CheckRef, RuleSet};

use crate::errors::{FixError, Result};
use crate::fixers::{self, FixCandidate};
use crate::quarantine::QuarantineSink;
use crate::report::{FixRecord, FixReport};

/// Scope tag for dataset-wide passes that belong to no single table rule.
const DATASET_SCOPE: &str = "*";

/// Upper bounds on what one fix pass may change, as fractions of the
/// original dataset.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GuardrailBudget {
    max_row_drop_frac: f64,
    max_cell_change_frac: f64,
}

impl GuardrailBudget {
    /// Build a budget, rejecting fractions outside `[0, 1]`.
    pub fn new(max_row_drop_frac: f64, max_cell_change_frac: f64) -> Result<Self> {
        for (name, value) in [
            ("max_row_drop_frac", max_row_drop_frac),
            ("max_cell_change_frac", max_cell_change_frac),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FixError::InvalidBudget(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(Self {
            max_row_drop_frac,
            max_cell_change_frac,
        })
    }

    /// Budget from optional settings; an absent limit allows nothing.
    pub fn from_options(
        max_row_drop_frac: Option<f64>,
        max_cell_change_frac: Option<f64>,
    ) -> Result<Self> {
        Self::new(
            max_row_drop_frac.unwrap_or(0.0),
            max_cell_change_frac.unwrap_or(0.0),
        )
    }

    pub fn max_row_drop_frac(&self) -> f64 {
        self.max_row_drop_frac
    }

    pub fn max_cell_change_frac(&self) -> f64 {
        self.max_cell_change_frac
    }
}

impl Default for GuardrailBudget {
    fn default() -> Self {
        Self {
            max_row_drop_frac: 0.0,
            max_cell_change_frac: 0.0,
        }
    }
}

/// Running cost of the fixes accepted so far.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BudgetUsage {
    pub rows_dropped: u64,
    pub cells_changed: u64,
}

/// Settings for one fix pass.
#[derive(Debug, Clone)]
pub struct FixConfig {
    pub budget: GuardrailBudget,
    /// Dataset-wide whitespace trim before any per-check fix.
    pub trim_strings: bool,
    /// Parse freshness columns into typed timestamps before the fold.
    pub normalize_timestamps: bool,
    /// Reference "now"; must match the evaluation's for freshness fixes.
    pub now: NaiveDateTime,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            budget: GuardrailBudget::default(),
            trim_strings: false,
            normalize_timestamps: false,
            now: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Apply fixes for every failed check, under the guardrail budget.
///
/// The evaluation must come from the same rule set: results are matched to
/// checks positionally through the shared declaration order.
pub fn apply_fixes(
    dataset: &Dataset,
    rules: &RuleSet,
    evaluation: &EvaluationResult,
    config: &FixConfig,
    sink: &mut dyn QuarantineSink,
) -> Result<(Dataset, FixReport)> {
    if rules.check_count() != evaluation.checks.len() {
        return Err(FixError::ResultMismatch(format!(
            "{} declared checks but {} results",
            rules.check_count(),
            evaluation.checks.len()
        )));
    }

    let mut pipeline = Pipeline::new(dataset.clone(), config, sink);
    pipeline.pre_passes(rules)?;

    for (check_ref, result) in rules.iter_checks().zip(&evaluation.checks) {
        if result.passed {
            continue;
        }
        pipeline.fix_one(check_ref, result.reason.as_deref())?;
    }

    Ok(pipeline.finish(dataset.row_count()))
}

struct Pipeline<'a> {
    dataset: Dataset,
    config: &'a FixConfig,
    sink: &'a mut dyn QuarantineSink,
    usage: BudgetUsage,
    rows_changed: u64,
    records: Vec<FixRecord>,
    rows_before: u64,
    cells_total: u64,
}

impl<'a> Pipeline<'a> {
    fn new(dataset: Dataset, config: &'a FixConfig, sink: &'a mut dyn QuarantineSink) -> Self {
        let rows_before = dataset.row_count() as u64;
        let cells_total = rows_before * dataset.column_count() as u64;
        Self {
            dataset,
            config,
            sink,
            usage: BudgetUsage::default(),
            rows_changed: 0,
            records: Vec::new(),
            rows_before,
            cells_total,
        }
    }

    fn pre_passes(&mut self, rules: &RuleSet) -> Result<()> {
        if self.config.trim_strings {
            if let Some(candidate) = fixers::trim_strings(&self.dataset) {
                self.decide(DATASET_SCOPE, None, None, candidate)?;
            }
        }
        if !self.config.normalize_timestamps {
            return Ok(());
        }
        let mut normalized = Vec::new();
        for check_ref in rules.iter_checks() {
            let Check::Freshness(spec) = check_ref.check else {
                continue;
            };
            let Some(column) = check_ref.column else {
                continue;
            };
            let Some(idx) = self.dataset.column_index(column) else {
                continue;
            };
            if normalized.contains(&idx) {
                continue;
            }
            normalized.push(idx);
            if let Some(candidate) =
                fixers::normalize_timestamps(&self.dataset, idx, spec.parse_format.as_deref())
            {
                self.decide(check_ref.table, Some(column), None, candidate)?;
            }
        }
        Ok(())
    }

    fn fix_one(&mut self, check_ref: CheckRef<'_>, reason: Option<&str>) -> Result<()> {
        let CheckRef {
            table,
            column,
            check,
        } = check_ref;
        let kind = check.kind();

        if reason == Some(COLUMN_NOT_FOUND) {
            self.records
                .push(FixRecord::unfixable(table, column, kind, COLUMN_NOT_FOUND));
            return Ok(());
        }

        let column_idx = match column {
            Some(name) => match self.dataset.column_index(name) {
                Some(idx) => Some(idx),
                None => {
                    self.records
                        .push(FixRecord::unfixable(table, column, kind, COLUMN_NOT_FOUND));
                    return Ok(());
                }
            },
            None => None,
        };

        let outcome = match (check, column_idx) {
            (Check::Duplicate(spec), _) => fixers::fix_duplicate(&self.dataset, spec),
            (Check::NullRate(spec), Some(idx)) => fixers::fix_null_fill(&self.dataset, idx, spec),
            (Check::Range(spec), Some(idx)) => fixers::fix_range(&self.dataset, idx, spec),
            (Check::Enum(spec), Some(idx)) => fixers::fix_enum(&self.dataset, idx, spec),
            (Check::Freshness(spec), Some(idx)) => {
                fixers::fix_freshness(&self.dataset, idx, spec, self.config.now)
            }
            (_, None) => Err("column scope missing".to_string()),
        };

        match outcome {
            Ok(candidate) => self.decide(table, column, Some(kind), candidate),
            Err(note) => {
                self.records
                    .push(FixRecord::unfixable(table, column, kind, note));
                Ok(())
            }
        }
    }

    /// Accept or reject one candidate against the remaining budget.
    fn decide(
        &mut self,
        table: &str,
        column: Option<&str>,
        check_type: Option<dqguard_rules::CheckKind>,
        candidate: FixCandidate,
    ) -> Result<()> {
        let mut record = FixRecord {
            table: table.to_string(),
            column: column.map(str::to_string),
            check_type,
            action: Some(candidate.action),
            rows_affected: candidate.rows_affected,
            cells_affected: candidate.cells_changed,
            budget_exceeded: false,
            quarantine_reason: None,
            note: None,
        };

        if candidate.rows_dropped == 0 && candidate.cells_changed == 0 {
            record.note = Some("nothing left to fix".to_string());
            self.records.push(record);
            return Ok(());
        }

        let row_frac = self.fraction(
            self.usage.rows_dropped + candidate.rows_dropped,
            self.rows_before,
        );
        let cell_frac = self.fraction(
            self.usage.cells_changed + candidate.cells_changed,
            self.cells_total,
        );
        if row_frac > self.config.budget.max_row_drop_frac
            || cell_frac > self.config.budget.max_cell_change_frac
        {
            tracing::warn!(
                table,
                column,
                rows = candidate.rows_dropped,
                cells = candidate.cells_changed,
                "fix rejected by guardrail budget"
            );
            // A rejected fix changed nothing; only the note keeps the
            // proposed cost.
            record.budget_exceeded = true;
            record.note = Some(format!(
                "rejected candidate would have affected {} row(s) and {} cell(s)",
                candidate.rows_affected, candidate.cells_changed
            ));
            record.rows_affected = 0;
            record.cells_affected = 0;
            self.records.push(record);
            return Ok(());
        }

        if !candidate.quarantined.is_empty() {
            let reason = candidate
                .quarantine_reason
                .as_deref()
                .unwrap_or("removed by fix");
            self.sink.receive(&candidate.quarantined, reason)?;
            record.quarantine_reason = Some(reason.to_string());
        }
        self.usage.rows_dropped += candidate.rows_dropped;
        self.usage.cells_changed += candidate.cells_changed;
        if candidate.rows_dropped == 0 {
            self.rows_changed += candidate.rows_affected;
        }
        self.dataset = candidate.dataset;
        self.records.push(record);
        Ok(())
    }

    fn fraction(&self, count: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    }

    fn finish(self, rows_before: usize) -> (Dataset, FixReport) {
        let report = FixReport {
            rows_before: rows_before as u64,
            rows_after: self.dataset.row_count() as u64,
            total_rows_changed: self.rows_changed,
            total_rows_dropped: self.usage.rows_dropped,
            total_cells_changed: self.usage.cells_changed,
            row_change_fraction: self.fraction(self.rows_changed, self.rows_before),
            row_drop_fraction: self.fraction(self.usage.rows_dropped, self.rows_before),
            cell_change_fraction: self.fraction(self.usage.cells_changed, self.cells_total),
            records: self.records,
        };
        tracing::info!(
            rows_dropped = report.total_rows_dropped,
            cells_changed = report.total_cells_changed,
            records = report.records.len(),
            "fix pass complete"
        );
        (self.dataset, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_rejects_out_of_range_fractions() {
        assert!(GuardrailBudget::new(0.02, 0.05).is_ok());
        assert!(GuardrailBudget::new(-0.1, 0.05).is_err());
        assert!(GuardrailBudget::new(0.02, 1.5).is_err());
    }

    #[test]
    fn absent_limits_allow_nothing() {
        let budget = GuardrailBudget::from_options(None, Some(0.5)).expect("valid budget");
        assert_eq!(budget.max_row_drop_frac(), 0.0);
        assert_eq!(budget.max_cell_change_frac(), 0.5);
    }
}
