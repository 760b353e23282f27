//! Rule contracts and validation for Dqguard.
//!
//! Raw rule configurations are parsed leniently, then compiled into the
//! typed [`RuleSet`] in a single all-or-nothing step that aggregates every
//! structural problem found.

pub mod errors;
pub mod model;
pub mod parse;
pub mod schema;

pub use errors::{IssueSeverity, RulesError, ValidationIssue, ValidationReport};
pub use model::{
    Check, CheckKind, CheckRef, ColumnRule, DuplicateCheck, EnumCheck, FillStrategy,
    FreshnessCheck, NullRateCheck, RangeCheck, RuleSet, TableRule,
};
pub use parse::{compile, parse_rules, RawCheck, RawColumnRule, RawRuleSet, RawTableRule};
pub use schema::rules_json_schema;
