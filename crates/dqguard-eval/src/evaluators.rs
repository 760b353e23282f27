//! Pure check evaluators, one per rule variant.
//!
//! Every evaluator is deterministic and side-effect-free: it maps a dataset
//! snapshot and a check spec to the set of offending row indices in
//! original row order.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use dqguard_core::{Dataset, Value};
use dqguard_rules::{DuplicateCheck, EnumCheck, FreshnessCheck, NullRateCheck, RangeCheck};

/// Rows beyond the first occurrence of each duplicate group.
///
/// Groups by the subset columns, or by the full row when no subset is set.
/// Returns the name of the first missing subset column instead of a result.
pub fn duplicate_rows(dataset: &Dataset, spec: &DuplicateCheck) -> Result<Vec<usize>, String> {
    let indices: Vec<usize> = match &spec.subset {
        Some(subset) => {
            let mut resolved = Vec::with_capacity(subset.len());
            for name in subset {
                match dataset.column_index(name) {
                    Some(idx) => resolved.push(idx),
                    None => return Err(name.clone()),
                }
            }
            resolved
        }
        None => (0..dataset.column_count()).collect(),
    };

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut failing = Vec::new();
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let key = tuple_key(&indices, row);
        if seen.contains_key(&key) {
            failing.push(row_idx);
        } else {
            seen.insert(key, row_idx);
        }
    }
    Ok(failing)
}

/// Null rows plus the pass verdict under OR threshold semantics.
///
/// The check fails when the absolute count exceeds `max_nulls` or the
/// fraction exceeds `max_null_frac`; either threshold alone is enough.
pub fn null_rate_outcome(
    dataset: &Dataset,
    column: usize,
    spec: &NullRateCheck,
) -> (Vec<usize>, bool) {
    let failing: Vec<usize> = dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| row.get(column).is_some_and(Value::is_null))
        .map(|(idx, _)| idx)
        .collect();

    let count = failing.len() as u64;
    let frac = if dataset.row_count() == 0 {
        0.0
    } else {
        count as f64 / dataset.row_count() as f64
    };
    let over_count = spec.max_nulls.is_some_and(|max| count > max);
    let over_frac = spec.max_null_frac.is_some_and(|max| frac > max);
    (failing, !(over_count || over_frac))
}

/// Out-of-range rows and the count of values excluded from the verdict.
///
/// Bounds are inclusive. Non-numeric and missing values neither pass nor
/// fail; they are reported separately as a data-type note.
pub fn range_outcome(dataset: &Dataset, column: usize, spec: &RangeCheck) -> (Vec<usize>, u64) {
    let mut failing = Vec::new();
    let mut excluded = 0u64;
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let Some(value) = row.get(column) else {
            continue;
        };
        match value.as_numeric() {
            Some(number) => {
                let below = spec.min.is_some_and(|min| number < min);
                let above = spec.max.is_some_and(|max| number > max);
                if below || above {
                    failing.push(row_idx);
                }
            }
            None => excluded += 1,
        }
    }
    (failing, excluded)
}

/// Rows whose rendered value is not a member of the allowed set.
///
/// Nulls fail unless the allowed list carried an explicit null sentinel.
pub fn enum_outcome(dataset: &Dataset, column: usize, spec: &EnumCheck) -> Vec<usize> {
    let mut failing = Vec::new();
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let Some(value) = row.get(column) else {
            continue;
        };
        if value.is_null() {
            if !spec.allow_null {
                failing.push(row_idx);
            }
            continue;
        }
        if !spec.allowed.iter().any(|allowed| allowed == &value.to_field()) {
            failing.push(row_idx);
        }
    }
    failing
}

/// Rows older than `max_age_days` relative to `now`, plus unparseable ones.
///
/// Null cells are skipped; a non-null cell that cannot be read as a
/// timestamp is a failure in its own right.
pub fn freshness_outcome(
    dataset: &Dataset,
    column: usize,
    spec: &FreshnessCheck,
    now: NaiveDateTime,
) -> Vec<usize> {
    let mut failing = Vec::new();
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let Some(value) = row.get(column) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        match cell_timestamp(value, spec.parse_format.as_deref()) {
            Some(timestamp) => {
                if (now - timestamp).num_days() > spec.max_age_days {
                    failing.push(row_idx);
                }
            }
            None => failing.push(row_idx),
        }
    }
    failing
}

/// Read a cell as a timestamp, trying the configured format first.
pub fn cell_timestamp(value: &Value, format: Option<&str>) -> Option<NaiveDateTime> {
    if let Some(timestamp) = value.as_timestamp() {
        return Some(timestamp);
    }
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(format) = format {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(text, format) {
            return Some(timestamp);
        }
        // Date-only formats have no time component to parse.
        return NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0));
    }
    const FALLBACK_DATETIME: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    for candidate in FALLBACK_DATETIME {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(text, candidate) {
            return Some(timestamp);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn tuple_key(indices: &[usize], row: &[Value]) -> String {
    indices
        .iter()
        .map(|idx| {
            row.get(*idx)
                .map(|value| escape_key_component(&value.key_component()))
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("|")
}

fn escape_key_component(value: &str) -> String {
    value.replace('\\', "\\\\").replace('|', "\\|")
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
    fn duplicate_keeps_the_first_occurrence_per_group() {
        let data = dataset(vec![
            vec![Value::Text("a".to_string())],
            vec![Value::Text("b".to_string())],
            vec![Value::Text("a".to_string())],
            vec![Value::Text("a".to_string())],
        ]);
        let failing =
            duplicate_rows(&data, &DuplicateCheck::default()).expect("columns resolve");
        assert_eq!(failing, vec![2, 3]);
    }

    #[test]
    fn duplicate_reports_missing_subset_column() {
        let data = dataset(vec![vec![Value::Int(1)]]);
        let spec = DuplicateCheck {
            subset: Some(vec!["missing".to_string()]),
        };
        assert_eq!(duplicate_rows(&data, &spec), Err("missing".to_string()));
    }

    #[test]
    fn range_bounds_are_inclusive_and_nulls_excluded() {
        let data = dataset(vec![
            vec![Value::Int(-5)],
            vec![Value::Int(0)],
            vec![Value::Int(100)],
            vec![Value::Int(150)],
            vec![Value::Null],
        ]);
        let spec = RangeCheck {
            min: Some(0.0),
            max: Some(100.0),
        };
        let (failing, excluded) = range_outcome(&data, 0, &spec);
        assert_eq!(failing, vec![0, 3]);
        assert_eq!(excluded, 1);
    }

    #[test]
    fn null_rate_fails_when_either_threshold_is_exceeded() {
        let mut rows: Vec<Vec<Value>> = (0..42).map(|i| vec![Value::Int(i)]).collect();
        rows.extend((0..8).map(|_| vec![Value::Null]));
        let data = dataset(rows);
        let spec = NullRateCheck {
            max_nulls: Some(10),
            max_null_frac: Some(0.05),
            ..NullRateCheck::default()
        };
        let (failing, passed) = null_rate_outcome(&data, 0, &spec);
        assert_eq!(failing.len(), 8);
        // 8 <= 10 but 8/50 = 0.16 > 0.05: the fraction alone fails the check.
        assert!(!passed);
    }

    #[test]
    fn enum_nulls_fail_without_the_sentinel() {
        let data = dataset(vec![
            vec![Value::Text("new".to_string())],
            vec![Value::Null],
            vec![Value::Text("bogus".to_string())],
        ]);
        let spec = EnumCheck {
            allowed: vec!["new".to_string()],
            allow_null: false,
        };
        assert_eq!(enum_outcome(&data, 0, &spec), vec![1, 2]);

        let lenient = EnumCheck {
            allowed: vec!["new".to_string()],
            allow_null: true,
        };
        assert_eq!(enum_outcome(&data, 0, &lenient), vec![2]);
    }

    #[test]
    fn freshness_fails_stale_and_unparseable_rows() {
        let now = NaiveDate::from_ymd_opt(2026, 8, 26)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid now");
        let data = dataset(vec![
            vec![Value::Text("2026-08-25".to_string())],
            vec![Value::Text("2020-01-01".to_string())],
            vec![Value::Text("not a date".to_string())],
            vec![Value::Null],
        ]);
        let spec = FreshnessCheck {
            max_age_days: 30,
            parse_format: None,
            drop_stale: false,
        };
        assert_eq!(freshness_outcome(&data, 0, &spec, now), vec![1, 2]);
    }
}
