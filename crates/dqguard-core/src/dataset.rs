use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Owned tabular snapshot: ordered columns and row-major cell storage.
///
/// One dataset is evaluated per run. The fix pipeline derives new datasets
/// from it instead of mutating shared state, so concurrent runs over
/// different datasets never interact.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    column_lookup: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, verifying that every row matches the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut column_lookup = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if column_lookup.insert(name.to_lowercase(), idx).is_some() {
                return Err(Error::InvalidDataset(format!(
                    "duplicate column name '{name}'"
                )));
            }
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::InvalidDataset(format!(
                    "row {} has {} cells, expected {}",
                    idx,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self {
            columns,
            column_lookup,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_lookup.get(&name.to_lowercase()).copied()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&[Value]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    /// Iterate one column in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(column))
    }

    pub fn set_cell(&mut self, row: usize, column: usize, value: Value) -> Result<()> {
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(column))
            .ok_or_else(|| Error::InvalidDataset(format!("cell ({row}, {column}) out of bounds")))?;
        *cell = value;
        Ok(())
    }

    /// Derive a dataset without the given rows, preserving order.
    ///
    /// Indices refer to this dataset; returns the surviving dataset and the
    /// removed rows in original order.
    pub fn without_rows(&self, drop: &[usize]) -> (Dataset, Vec<(usize, Vec<Value>)>) {
        let drop_set: std::collections::HashSet<usize> = drop.iter().copied().collect();
        let mut kept = Vec::with_capacity(self.rows.len().saturating_sub(drop_set.len()));
        let mut removed = Vec::with_capacity(drop_set.len());
        for (idx, row) in self.rows.iter().enumerate() {
            if drop_set.contains(&idx) {
                removed.push((idx, row.clone()));
            } else {
                kept.push(row.clone());
            }
        }
        let survivor = Dataset {
            columns: self.columns.clone(),
            column_lookup: self.column_lookup.clone(),
            rows: kept,
        };
        (survivor, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["id".to_string(), "amount".to_string()],
            vec![
                vec![Value::Int(1), Value::Int(10)],
                vec![Value::Int(2), Value::Int(20)],
                vec![Value::Int(3), Value::Int(30)],
            ],
        )
        .expect("valid dataset")
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let dataset = sample();
        assert_eq!(dataset.column_index("Amount"), Some(1));
        assert_eq!(dataset.column_index("missing"), None);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let result = Dataset::new(
            vec!["id".to_string(), "amount".to_string()],
            vec![vec![Value::Int(1)]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn without_rows_preserves_order_and_reports_removed() {
        let dataset = sample();
        let (survivor, removed) = dataset.without_rows(&[1]);
        assert_eq!(survivor.row_count(), 2);
        assert_eq!(survivor.cell(1, 0), Some(&Value::Int(3)));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, 1);
    }
}
