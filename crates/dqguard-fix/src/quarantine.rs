use dqguard_core::Value;

use crate::errors::Result;

/// One row removed by a fix, captured before removal.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarantinedRow {
    /// Index of the row in the dataset it was removed from.
    pub source_row: u64,
    pub values: Vec<Value>,
}

impl QuarantinedRow {
    pub fn new(source_row: usize, values: Vec<Value>) -> Self {
        Self {
            source_row: source_row as u64,
            values,
        }
    }
}

/// Destination for rows removed by the fix pipeline.
///
/// Every dropped row is forwarded exactly once, tagged with the reason its
/// fix recorded, so nothing the pipeline removes is silently lost.
pub trait QuarantineSink {
    fn receive(&mut self, rows: &[QuarantinedRow], reason: &str) -> Result<()>;
}

/// In-memory sink, used by dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Vec<(String, Vec<QuarantinedRow>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[(String, Vec<QuarantinedRow>)] {
        &self.batches
    }

    pub fn row_count(&self) -> usize {
        self.batches.iter().map(|(_, rows)| rows.len()).sum()
    }
}

impl QuarantineSink for MemorySink {
    fn receive(&mut self, rows: &[QuarantinedRow], reason: &str) -> Result<()> {
        if !rows.is_empty() {
            self.batches.push((reason.to_string(), rows.to_vec()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_batches_with_reasons() {
        let mut sink = MemorySink::new();
        sink.receive(
            &[QuarantinedRow::new(2, vec![Value::Int(7)])],
            "duplicate rows",
        )
        .expect("receive");
        sink.receive(&[], "empty batch is not recorded").expect("receive");
        assert_eq!(sink.row_count(), 1);
        assert_eq!(sink.batches()[0].0, "duplicate rows");
        assert_eq!(sink.batches()[0].1[0].source_row, 2);
    }
}
