use thiserror::Error;

/// Errors raised by the fix pipeline.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("invalid guardrail budget: {0}")]
    InvalidBudget(String),

    #[error("rule set and evaluation result disagree: {0}")]
    ResultMismatch(String),

    #[error(transparent)]
    Dataset(#[from] dqguard_core::Error),

    #[error("quarantine sink failed: {0}")]
    Quarantine(String),
}

pub type Result<T> = std::result::Result<T, FixError>;
