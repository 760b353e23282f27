use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Check categories supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Duplicate,
    NullRate,
    Range,
    Enum,
    Freshness,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Duplicate => "duplicate",
            CheckKind::NullRate => "null_rate",
            CheckKind::Range => "range",
            CheckKind::Enum => "enum",
            CheckKind::Freshness => "freshness",
        }
    }
}

/// Closed union of rule checks.
///
/// Adding a rule type means adding a variant here plus its evaluator and
/// (optional) fixer; the exhaustive matches in those crates keep the
/// registration honest at compile time.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    Duplicate(DuplicateCheck),
    NullRate(NullRateCheck),
    Range(RangeCheck),
    Enum(EnumCheck),
    Freshness(FreshnessCheck),
}

impl Check {
    pub fn kind(&self) -> CheckKind {
        match self {
            Check::Duplicate(_) => CheckKind::Duplicate,
            Check::NullRate(_) => CheckKind::NullRate,
            Check::Range(_) => CheckKind::Range,
            Check::Enum(_) => CheckKind::Enum,
            Check::Freshness(_) => CheckKind::Freshness,
        }
    }

    /// Parameters as a JSON object, without the variant tag.
    pub fn params_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.remove("type");
        }
        value
    }
}

/// Duplicate-row check; full-row equality when `subset` is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DuplicateCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subset: Option<Vec<String>>,
}

/// Null-rate check; either threshold being exceeded fails the check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NullRateCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nulls: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_null_frac: Option<f64>,
    /// Constant used by the fill fixer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_value: Option<serde_json::Value>,
    /// Statistical fill used by the fill fixer; conflicts with `fill_value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_with: Option<FillStrategy>,
}

/// Statistical fill strategies for null-rate fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FillStrategy {
    Mean,
    Median,
}

/// Numeric range check with inclusive bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RangeCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Allowed-value check; nulls fail unless `allow_null` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EnumCheck {
    pub allowed: Vec<String>,
    #[serde(default)]
    pub allow_null: bool,
}

/// Timestamp age check against the evaluation's reference "now".
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FreshnessCheck {
    pub max_age_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_format: Option<String>,
    /// Opt-in fix policy: stale and unparseable rows are dropped.
    #[serde(default)]
    pub drop_stale: bool,
}

/// Checks scoped to one column.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnRule {
    pub name: String,
    pub checks: Vec<Check>,
}

/// Table-level and column-level checks for one named table.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableRule {
    pub name: String,
    pub checks: Vec<Check>,
    pub columns: Vec<ColumnRule>,
}

/// Validated, read-only rule set; table names are unique.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RuleSet {
    pub tables: Vec<TableRule>,
}

/// One declared check with its table/column scope.
#[derive(Debug, Clone, Copy)]
pub struct CheckRef<'a> {
    pub table: &'a str,
    pub column: Option<&'a str>,
    pub check: &'a Check,
}

impl RuleSet {
    /// Iterate every declared check in declaration order.
    ///
    /// The engine and the fix controller both walk rules through this
    /// iterator, which pins the shared ordering contract: table-level checks
    /// first, then column rules, per table, in file order.
    pub fn iter_checks(&self) -> impl Iterator<Item = CheckRef<'_>> {
        self.tables.iter().flat_map(|table| {
            let table_level = table.checks.iter().map(move |check| CheckRef {
                table: table.name.as_str(),
                column: None,
                check,
            });
            let column_level = table.columns.iter().flat_map(move |column| {
                column.checks.iter().map(move |check| CheckRef {
                    table: table.name.as_str(),
                    column: Some(column.name.as_str()),
                    check,
                })
            });
            table_level.chain(column_level)
        })
    }

    /// Total number of declared checks.
    pub fn check_count(&self) -> usize {
        self.iter_checks().count()
    }
}
