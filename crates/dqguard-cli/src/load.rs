//! CSV dataset loading with per-value type inference.

use std::path::Path;

use dqguard_core::{Dataset, Value};

use crate::CliError;

/// Read a CSV file into an owned dataset.
///
/// The first record is the header. Each field is inferred independently:
/// empty becomes null, then integer, float and boolean literals are tried,
/// and everything else stays text, whitespace included, so the trim fixer
/// has something to act on.
pub fn load_csv(path: &Path, delimiter: u8) -> Result<Dataset, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(false)
        .from_path(path)?;

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(infer_value).collect());
    }

    let dataset = Dataset::new(columns, rows)?;
    tracing::info!(
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        path = %path.display(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn infer_value(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = field.parse::<i64>() {
        return Value::Int(int);
    }
    if let Ok(float) = field.parse::<f64>() {
        return Value::Float(float);
    }
    match field {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Text(field.to_string()),
    }
}
