//! Core contracts for Dqguard.
//!
//! This crate defines the tabular dataset snapshot and the cell value union
//! shared by the evaluation engine and the fix pipeline.

pub mod dataset;
pub mod error;
pub mod value;

pub use dataset::Dataset;
pub use error::{Error, Result};
pub use value::Value;
