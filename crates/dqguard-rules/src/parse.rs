use std::collections::HashSet;

use serde::Deserialize;

use crate::errors::{IssueSeverity, Result, RulesError, ValidationIssue, ValidationReport};
use crate::model::{
    Check, ColumnRule, DuplicateCheck, EnumCheck, FreshnessCheck, NullRateCheck, RangeCheck,
    RuleSet, TableRule,
};

/// Raw rule set as authored, before compilation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRuleSet {
    #[serde(default)]
    pub tables: Vec<RawTableRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTableRule {
    pub name: String,
    #[serde(default)]
    pub checks: Vec<RawCheck>,
    #[serde(default)]
    pub columns: Vec<RawColumnRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawColumnRule {
    pub name: String,
    #[serde(default)]
    pub checks: Vec<RawCheck>,
}

/// One raw check: a type tag plus free-form parameters.
///
/// Keeping parameters loose here lets compilation report every problem in
/// one pass instead of failing on the first serde error.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCheck {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Parse a YAML document and compile it into a validated rule set.
pub fn parse_rules(yaml: &str) -> Result<RuleSet> {
    let raw: RawRuleSet = serde_yaml::from_str(yaml)?;
    compile(raw)
}

/// Compile a raw rule set, aggregating every structural problem found.
///
/// Succeeds fully or fails with `InvalidRuleSet`; a partially valid rule
/// set is never produced.
pub fn compile(raw: RawRuleSet) -> Result<RuleSet> {
    let mut report = ValidationReport::default();
    let mut tables = Vec::with_capacity(raw.tables.len());
    let mut seen_tables = HashSet::new();

    for (table_idx, raw_table) in raw.tables.into_iter().enumerate() {
        let table_path = format!("/tables/{table_idx}");

        if !seen_tables.insert(raw_table.name.to_lowercase()) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "duplicate_table",
                format!("{table_path}/name"),
                format!("table '{}' is declared more than once", raw_table.name),
                Some("merge the duplicate table entries".to_string()),
            ));
        }

        let mut checks = Vec::with_capacity(raw_table.checks.len());
        for (check_idx, raw_check) in raw_table.checks.into_iter().enumerate() {
            let path = format!("{table_path}/checks/{check_idx}");
            if let Some(check) = compile_check(raw_check, &path, &mut report) {
                if matches!(check, Check::Duplicate(_)) {
                    checks.push(check);
                } else {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "check_requires_column",
                        path,
                        format!(
                            "'{}' check must be declared under a column",
                            check.kind().as_str()
                        ),
                        Some("move the check into the table's columns list".to_string()),
                    ));
                }
            }
        }

        let mut columns = Vec::with_capacity(raw_table.columns.len());
        for (column_idx, raw_column) in raw_table.columns.into_iter().enumerate() {
            let column_path = format!("{table_path}/columns/{column_idx}");
            let mut column_checks = Vec::with_capacity(raw_column.checks.len());
            for (check_idx, raw_check) in raw_column.checks.into_iter().enumerate() {
                let path = format!("{column_path}/checks/{check_idx}");
                if let Some(check) = compile_check(raw_check, &path, &mut report) {
                    if matches!(check, Check::Duplicate(_)) {
                        report.push_error(ValidationIssue::new(
                            IssueSeverity::Error,
                            "duplicate_check_is_table_level",
                            path,
                            "'duplicate' check must be declared at table level".to_string(),
                            Some("use the table's checks list with an optional subset".to_string()),
                        ));
                    } else {
                        column_checks.push(check);
                    }
                }
            }
            columns.push(ColumnRule {
                name: raw_column.name,
                checks: column_checks,
            });
        }

        tables.push(TableRule {
            name: raw_table.name,
            checks,
            columns,
        });
    }

    if report.is_ok() {
        Ok(RuleSet { tables })
    } else {
        Err(RulesError::InvalidRuleSet(report))
    }
}

fn compile_check(
    raw: RawCheck,
    path: &str,
    report: &mut ValidationReport,
) -> Option<Check> {
    match raw.kind.as_str() {
        "duplicate" => parse_params::<DuplicateCheck>(raw.params, path, report)
            .map(Check::Duplicate),
        "null_rate" => parse_params::<NullRateCheck>(raw.params, path, report)
            .and_then(|check| validate_null_rate(check, path, report))
            .map(Check::NullRate),
        "range" => parse_params::<RangeCheck>(raw.params, path, report)
            .and_then(|check| validate_range(check, path, report))
            .map(Check::Range),
        "enum" => {
            let params = normalize_enum_params(raw.params);
            parse_params::<EnumCheck>(params, path, report)
                .and_then(|check| validate_enum(check, path, report))
                .map(Check::Enum)
        }
        "freshness" => parse_params::<FreshnessCheck>(raw.params, path, report)
            .and_then(|check| validate_freshness(check, path, report))
            .map(Check::Freshness),
        other => {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "unknown_check_type",
                format!("{path}/type"),
                format!("unknown check type '{other}'"),
                Some("expected one of: duplicate, null_rate, range, enum, freshness".to_string()),
            ));
            None
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: serde_json::Map<String, serde_json::Value>,
    path: &str,
    report: &mut ValidationReport,
) -> Option<T> {
    match serde_json::from_value(serde_json::Value::Object(params)) {
        Ok(value) => Some(value),
        Err(err) => {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_params",
                path.to_string(),
                err.to_string(),
                None,
            ));
            None
        }
    }
}

fn validate_null_rate(
    check: NullRateCheck,
    path: &str,
    report: &mut ValidationReport,
) -> Option<NullRateCheck> {
    let mut ok = true;
    if check.max_nulls.is_none() && check.max_null_frac.is_none() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "missing_threshold",
            path.to_string(),
            "null_rate requires max_nulls and/or max_null_frac".to_string(),
            None,
        ));
        ok = false;
    }
    if let Some(frac) = check.max_null_frac {
        if !(0.0..=1.0).contains(&frac) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "threshold_out_of_range",
                format!("{path}/max_null_frac"),
                format!("max_null_frac must be within [0, 1], got {frac}"),
                None,
            ));
            ok = false;
        }
    }
    if check.fill_value.is_some() && check.fill_with.is_some() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "conflicting_fill",
            path.to_string(),
            "fill_value and fill_with cannot both be set".to_string(),
            Some("keep either the constant or the statistical fill".to_string()),
        ));
        ok = false;
    }
    ok.then_some(check)
}

fn validate_range(
    check: RangeCheck,
    path: &str,
    report: &mut ValidationReport,
) -> Option<RangeCheck> {
    if check.min.is_none() && check.max.is_none() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "missing_bounds",
            path.to_string(),
            "range requires min and/or max".to_string(),
            None,
        ));
        return None;
    }
    if let (Some(min), Some(max)) = (check.min, check.max) {
        if min > max {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "conflicting_bounds",
                path.to_string(),
                format!("min {min} is greater than max {max}"),
                None,
            ));
            return None;
        }
    }
    Some(check)
}

fn validate_enum(
    check: EnumCheck,
    path: &str,
    report: &mut ValidationReport,
) -> Option<EnumCheck> {
    if check.allowed.is_empty() && !check.allow_null {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "empty_allowed",
            format!("{path}/allowed"),
            "enum requires a non-empty allowed list".to_string(),
            None,
        ));
        return None;
    }
    Some(check)
}

fn validate_freshness(
    check: FreshnessCheck,
    path: &str,
    report: &mut ValidationReport,
) -> Option<FreshnessCheck> {
    if check.max_age_days < 0 {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "negative_max_age",
            format!("{path}/max_age_days"),
            format!("max_age_days must be >= 0, got {}", check.max_age_days),
            None,
        ));
        return None;
    }
    Some(check)
}

/// A literal `null` entry in the allowed list is the explicit null sentinel.
fn normalize_enum_params(
    mut params: serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    let Some(serde_json::Value::Array(entries)) = params.remove("allowed") else {
        return params;
    };
    let mut allowed = Vec::with_capacity(entries.len());
    let mut allow_null = params
        .get("allow_null")
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    for entry in entries {
        match entry {
            serde_json::Value::Null => allow_null = true,
            serde_json::Value::String(value) => allowed.push(serde_json::Value::String(value)),
            other => allowed.push(serde_json::Value::String(render_scalar(&other))),
        }
    }
    params.insert("allowed".to_string(), serde_json::Value::Array(allowed));
    params.insert("allow_null".to_string(), serde_json::Value::Bool(allow_null));
    params
}

fn render_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Bool(v) => v.to_string(),
        serde_json::Value::Number(v) => v.to_string(),
        other => other.to_string(),
    }
}
