//! Guardrailed fix pipeline for Dqguard.
//!
//! Fixes are applied as a left fold over the failed checks: each fixer
//! proposes a candidate dataset, the guardrail budget accepts or rejects it,
//! and every decision lands in the audit report. The input dataset is never
//! mutated.

pub mod errors;
pub mod fixers;
pub mod guardrail;
pub mod quarantine;
pub mod report;

pub use errors::{FixError, Result};
pub use guardrail::{apply_fixes, BudgetUsage, FixConfig, GuardrailBudget};
pub use quarantine::{MemorySink, QuarantineSink, QuarantinedRow};
pub use report::{FixAction, FixRecord, FixReport};
