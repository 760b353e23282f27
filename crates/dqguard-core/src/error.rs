use thiserror::Error;

/// Core error type shared across Dqguard crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The dataset violates internal shape invariants.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
}

/// Convenience alias for results returned by Dqguard crates.
pub type Result<T> = std::result::Result<T, Error>;
