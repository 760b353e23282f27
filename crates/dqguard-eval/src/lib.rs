//! Rule evaluation engine for Dqguard.
//!
//! Evaluators are pure functions over an owned dataset snapshot; the engine
//! walks a validated rule set in declaration order and always returns one
//! result per declared check.

pub mod engine;
pub mod evaluators;
pub mod model;

pub use engine::{CheckEngine, EvaluateOptions};
pub use model::{
    CheckResult, ColumnFailureCount, EvaluationResult, SampleRow, TablePassRate,
    COLUMN_NOT_FOUND, SAMPLE_ROW_CAP,
};
