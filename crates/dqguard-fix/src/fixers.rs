//! Per-check fixers.
//!
//! Each fixer recomputes the offending rows against the dataset it is given,
//! never against a stale evaluation, so fixes compose: a row already removed
//! by an earlier fix cannot be counted or removed again. A fixer returns a
//! candidate describing the derived dataset and its cost, or a note saying
//! why the failure cannot be fixed.

use chrono::NaiveDateTime;

use dqguard_core::{Dataset, Value};
use dqguard_eval::evaluators;
use dqguard_rules::{
    DuplicateCheck, EnumCheck, FillStrategy, FreshnessCheck, NullRateCheck, RangeCheck,
};

use crate::quarantine::QuarantinedRow;
use crate::report::FixAction;

/// A proposed fix: the derived dataset plus everything the audit needs.
#[derive(Debug, Clone)]
pub struct FixCandidate {
    pub action: FixAction,
    pub dataset: Dataset,
    pub quarantined: Vec<QuarantinedRow>,
    pub quarantine_reason: Option<String>,
    /// Rows dropped or edited by this candidate.
    pub rows_affected: u64,
    /// Rows removed from the dataset; counted against the row-drop budget.
    pub rows_dropped: u64,
    /// Cells rewritten in place; counted against the cell-change budget.
    pub cells_changed: u64,
}

impl FixCandidate {
    fn dropped(
        action: FixAction,
        dataset: Dataset,
        removed: Vec<(usize, Vec<Value>)>,
        reason: &str,
    ) -> Self {
        let quarantined: Vec<QuarantinedRow> = removed
            .into_iter()
            .map(|(idx, values)| QuarantinedRow::new(idx, values))
            .collect();
        let rows = quarantined.len() as u64;
        Self {
            action,
            dataset,
            quarantined,
            quarantine_reason: Some(reason.to_string()),
            rows_affected: rows,
            rows_dropped: rows,
            cells_changed: 0,
        }
    }

    fn edited(action: FixAction, dataset: Dataset, rows: u64, cells: u64) -> Self {
        Self {
            action,
            dataset,
            quarantined: Vec::new(),
            quarantine_reason: None,
            rows_affected: rows,
            rows_dropped: 0,
            cells_changed: cells,
        }
    }
}

type FixOutcome = std::result::Result<FixCandidate, String>;

/// Drop every duplicate row beyond the first occurrence of its group.
pub fn fix_duplicate(dataset: &Dataset, spec: &DuplicateCheck) -> FixOutcome {
    let failing = evaluators::duplicate_rows(dataset, spec)
        .map_err(|column| format!("subset column '{column}' not found"))?;
    let (survivor, removed) = dataset.without_rows(&failing);
    Ok(FixCandidate::dropped(
        FixAction::Drop,
        survivor,
        removed,
        "duplicate rows",
    ))
}

/// Clamp out-of-range numeric values to the violated bound.
pub fn fix_range(dataset: &Dataset, column: usize, spec: &RangeCheck) -> FixOutcome {
    let mut fixed = dataset.clone();
    let mut rows = 0u64;
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let Some(number) = row.get(column).and_then(Value::as_numeric) else {
            continue;
        };
        let clamped = match (spec.min, spec.max) {
            (Some(min), _) if number < min => min,
            (_, Some(max)) if number > max => max,
            _ => continue,
        };
        set_cell(&mut fixed, row_idx, column, numeric_value(clamped, row.get(column)))?;
        rows += 1;
    }
    Ok(FixCandidate::edited(FixAction::Clip, fixed, rows, rows))
}

/// Replace values outside the allowed set with null.
///
/// Null cells are left alone even when they fail the check; filling them is
/// the null-rate fixer's concern.
pub fn fix_enum(dataset: &Dataset, column: usize, spec: &EnumCheck) -> FixOutcome {
    let mut fixed = dataset.clone();
    let mut rows = 0u64;
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let Some(value) = row.get(column) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if !spec.allowed.iter().any(|allowed| allowed == &value.to_field()) {
            set_cell(&mut fixed, row_idx, column, Value::Null)?;
            rows += 1;
        }
    }
    Ok(FixCandidate::edited(FixAction::Enforce, fixed, rows, rows))
}

/// Fill null cells with the configured constant or column statistic.
pub fn fix_null_fill(dataset: &Dataset, column: usize, spec: &NullRateCheck) -> FixOutcome {
    let fill = match (&spec.fill_value, spec.fill_with) {
        (Some(constant), None) => json_to_value(constant)
            .ok_or_else(|| "fill_value is not a fillable literal".to_string())?,
        (None, Some(strategy)) => {
            let mut numbers: Vec<f64> = dataset
                .column_values(column)
                .filter_map(Value::as_numeric)
                .collect();
            if numbers.is_empty() {
                return Err("no numeric values to aggregate for fill".to_string());
            }
            match strategy {
                FillStrategy::Mean => {
                    Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
                FillStrategy::Median => {
                    numbers.sort_by(|a, b| a.total_cmp(b));
                    let mid = numbers.len() / 2;
                    let median = if numbers.len() % 2 == 0 {
                        (numbers[mid - 1] + numbers[mid]) / 2.0
                    } else {
                        numbers[mid]
                    };
                    Value::Float(median)
                }
            }
        }
        _ => return Err("no fill configured".to_string()),
    };

    let mut fixed = dataset.clone();
    let mut rows = 0u64;
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        if row.get(column).is_some_and(Value::is_null) {
            set_cell(&mut fixed, row_idx, column, fill.clone())?;
            rows += 1;
        }
    }
    Ok(FixCandidate::edited(FixAction::Fill, fixed, rows, rows))
}

/// Drop stale and unparseable rows when the check opted into `drop_stale`.
pub fn fix_freshness(
    dataset: &Dataset,
    column: usize,
    spec: &FreshnessCheck,
    now: NaiveDateTime,
) -> FixOutcome {
    if !spec.drop_stale {
        return Err("drop_stale not set".to_string());
    }
    let failing = evaluators::freshness_outcome(dataset, column, spec, now);
    let (survivor, removed) = dataset.without_rows(&failing);
    Ok(FixCandidate::dropped(
        FixAction::Drop,
        survivor,
        removed,
        "stale or unparseable timestamps",
    ))
}

/// Dataset-wide pass: strip surrounding whitespace from every text cell.
///
/// Returns `None` when no cell needed trimming.
pub fn trim_strings(dataset: &Dataset) -> Option<FixCandidate> {
    let mut fixed = dataset.clone();
    let mut cells = 0u64;
    let mut touched_rows = 0u64;
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let mut row_touched = false;
        for (col_idx, value) in row.iter().enumerate() {
            let Some(text) = value.as_str() else {
                continue;
            };
            let trimmed = text.trim();
            if trimmed.len() != text.len() {
                // set_cell cannot fail here: indices come from the same dataset.
                fixed
                    .set_cell(row_idx, col_idx, Value::Text(trimmed.to_string()))
                    .ok()?;
                cells += 1;
                row_touched = true;
            }
        }
        if row_touched {
            touched_rows += 1;
        }
    }
    if cells == 0 {
        return None;
    }
    Some(FixCandidate::edited(
        FixAction::Trim,
        fixed,
        touched_rows,
        cells,
    ))
}

/// Column pass: parse text cells into typed timestamps.
///
/// Cells that do not parse are left untouched for the freshness check to
/// report. Returns `None` when no cell was converted.
pub fn normalize_timestamps(
    dataset: &Dataset,
    column: usize,
    format: Option<&str>,
) -> Option<FixCandidate> {
    let mut fixed = dataset.clone();
    let mut cells = 0u64;
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let Some(value) = row.get(column) else {
            continue;
        };
        if value.as_str().is_none() {
            continue;
        }
        if let Some(timestamp) = evaluators::cell_timestamp(value, format) {
            fixed
                .set_cell(row_idx, column, Value::Timestamp(timestamp))
                .ok()?;
            cells += 1;
        }
    }
    if cells == 0 {
        return None;
    }
    Some(FixCandidate::edited(FixAction::Parse, fixed, cells, cells))
}

fn set_cell(
    dataset: &mut Dataset,
    row: usize,
    column: usize,
    value: Value,
) -> std::result::Result<(), String> {
    dataset
        .set_cell(row, column, value)
        .map_err(|err| err.to_string())
}

/// Keep integer columns integral when the bound itself is an exact i64.
///
/// Bounds outside the i64 range would saturate under `as`, so those fall
/// back to a float cell instead of silently clipping to `i64::MAX`.
fn numeric_value(number: f64, original: Option<&Value>) -> Value {
    let exact_int = number.fract() == 0.0
        && number >= i64::MIN as f64
        && number < i64::MAX as f64;
    if exact_int && matches!(original, Some(Value::Int(_))) {
        Value::Int(number as i64)
    } else {
        Value::Float(number)
    }
}

fn json_to_value(literal: &serde_json::Value) -> Option<Value> {
    match literal {
        serde_json::Value::Bool(value) => Some(Value::Bool(*value)),
        serde_json::Value::Number(value) => {
            if let Some(int) = value.as_i64() {
                Some(Value::Int(int))
            } else {
                value.as_f64().map(Value::Float)
            }
        }
        serde_json::Value::String(value) => Some(Value::Text(value.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(rows: Vec<Vec<Value>>) -> Dataset {
        let columns = (0..rows.first().map_or(0, Vec::len))
            .map(|idx| format!("c{idx}"))
            .collect();
        Dataset::new(columns, rows).expect("valid dataset")
    }

    #[test]
    fn duplicate_fix_keeps_first_occurrences_and_quarantines_the_rest() {
        let data = dataset(vec![
            vec![Value::Text("a".to_string())],
            vec![Value::Text("b".to_string())],
            vec![Value::Text("a".to_string())],
        ]);
        let candidate =
            fix_duplicate(&data, &DuplicateCheck::default()).expect("fixable");
        assert_eq!(candidate.dataset.row_count(), 2);
        assert_eq!(candidate.rows_dropped, 1);
        assert_eq!(candidate.quarantined[0].source_row, 2);
    }

    #[test]
    fn clip_preserves_integer_columns() {
        let data = dataset(vec![
            vec![Value::Int(-5)],
            vec![Value::Int(50)],
            vec![Value::Float(150.5)],
        ]);
        let spec = RangeCheck {
            min: Some(0.0),
            max: Some(100.0),
        };
        let candidate = fix_range(&data, 0, &spec).expect("fixable");
        assert_eq!(candidate.cells_changed, 2);
        assert_eq!(candidate.dataset.cell(0, 0), Some(&Value::Int(0)));
        assert_eq!(candidate.dataset.cell(1, 0), Some(&Value::Int(50)));
        assert_eq!(candidate.dataset.cell(2, 0), Some(&Value::Float(100.0)));
    }

    #[test]
    fn clip_to_a_bound_beyond_integer_range_falls_back_to_float() {
        let data = dataset(vec![vec![Value::Int(5)]]);
        let spec = RangeCheck {
            min: Some(1e19),
            max: None,
        };
        let candidate = fix_range(&data, 0, &spec).expect("fixable");
        assert_eq!(candidate.dataset.cell(0, 0), Some(&Value::Float(1e19)));
    }

    #[test]
    fn enum_fix_nulls_out_invalid_values_only() {
        let data = dataset(vec![
            vec![Value::Text("new".to_string())],
            vec![Value::Text("bogus".to_string())],
            vec![Value::Null],
        ]);
        let spec = EnumCheck {
            allowed: vec!["new".to_string()],
            allow_null: false,
        };
        let candidate = fix_enum(&data, 0, &spec).expect("fixable");
        assert_eq!(candidate.cells_changed, 1);
        assert_eq!(candidate.dataset.cell(1, 0), Some(&Value::Null));
        assert_eq!(candidate.dataset.cell(2, 0), Some(&Value::Null));
    }

    #[test]
    fn fill_median_uses_the_numeric_column_values() {
        let data = dataset(vec![
            vec![Value::Int(1)],
            vec![Value::Int(9)],
            vec![Value::Int(5)],
            vec![Value::Null],
        ]);
        let spec = NullRateCheck {
            fill_with: Some(FillStrategy::Median),
            ..NullRateCheck::default()
        };
        let candidate = fix_null_fill(&data, 0, &spec).expect("fixable");
        assert_eq!(candidate.cells_changed, 1);
        assert_eq!(candidate.dataset.cell(3, 0), Some(&Value::Float(5.0)));
    }

    #[test]
    fn fill_without_configuration_is_unfixable() {
        let data = dataset(vec![vec![Value::Null]]);
        let spec = NullRateCheck::default();
        assert!(fix_null_fill(&data, 0, &spec).is_err());
    }

    #[test]
    fn statistical_fill_needs_numeric_values() {
        let data = dataset(vec![
            vec![Value::Text("abc".to_string())],
            vec![Value::Null],
        ]);
        let spec = NullRateCheck {
            fill_with: Some(FillStrategy::Mean),
            ..NullRateCheck::default()
        };
        assert!(fix_null_fill(&data, 0, &spec).is_err());
    }

    #[test]
    fn trim_reports_cells_and_rows_separately() {
        let data = dataset(vec![
            vec![
                Value::Text(" a ".to_string()),
                Value::Text("b ".to_string()),
            ],
            vec![Value::Text("c".to_string()), Value::Int(1)],
        ]);
        let candidate = trim_strings(&data).expect("cells to trim");
        assert_eq!(candidate.cells_changed, 2);
        assert_eq!(candidate.rows_affected, 1);
        assert_eq!(
            candidate.dataset.cell(0, 0),
            Some(&Value::Text("a".to_string()))
        );
        assert!(trim_strings(&candidate.dataset).is_none());
    }

    #[test]
    fn normalize_converts_parseable_text_only() {
        let data = dataset(vec![
            vec![Value::Text("2026-08-01".to_string())],
            vec![Value::Text("not a date".to_string())],
        ]);
        let candidate = normalize_timestamps(&data, 0, None).expect("cells to parse");
        assert_eq!(candidate.cells_changed, 1);
        assert!(matches!(
            candidate.dataset.cell(0, 0),
            Some(Value::Timestamp(_))
        ));
        assert_eq!(
            candidate.dataset.cell(1, 0),
            Some(&Value::Text("not a date".to_string()))
        );
    }
}
