//! Command-line surface for Dqguard.
//!
//! The library target exists so the end-to-end flow behind `dqguard check`
//! can be driven from integration tests; the binary is a thin parser around
//! [`run::run_check`].

pub mod load;
pub mod output;
pub mod run;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("rules error: {0}")]
    Rules(#[from] dqguard_rules::RulesError),
    #[error("dataset error: {0}")]
    Core(#[from] dqguard_core::Error),
    #[error("fix error: {0}")]
    Fix(#[from] dqguard_fix::FixError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
