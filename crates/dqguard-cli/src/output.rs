//! Run artifacts: JSON reports, the cleaned dataset and quarantine files.

use std::collections::BTreeMap;
use std::fs::{create_dir_all, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;

use dqguard_core::Dataset;
use dqguard_eval::EvaluationResult;
use dqguard_fix::{FixReport, QuarantineSink, QuarantinedRow};

use crate::CliError;

/// Top-level `results.json` payload.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub run_id: String,
    pub started_at: String,
    pub rules: String,
    pub input: String,
    pub evaluation: &'a EvaluationResult,
}

/// Paths for the artifacts of one run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub results_path: PathBuf,
    pub fix_report_path: PathBuf,
    pub cleaned_path: PathBuf,
    pub quarantine_dir: PathBuf,
}

impl RunPaths {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            results_path: out_dir.join("results.json"),
            fix_report_path: out_dir.join("fix_report.json"),
            cleaned_path: out_dir.join("cleaned.csv"),
            quarantine_dir: out_dir.join("quarantine"),
        }
    }
}

pub fn prepare_out_dir(out_dir: &Path) -> Result<RunPaths, CliError> {
    create_dir_all(out_dir)?;
    Ok(RunPaths::new(out_dir))
}

pub fn write_results(paths: &RunPaths, summary: &RunSummary<'_>) -> Result<(), CliError> {
    write_json(&paths.results_path, summary)
}

pub fn write_fix_report(paths: &RunPaths, report: &FixReport) -> Result<(), CliError> {
    write_json(&paths.fix_report_path, report)
}

pub fn write_cleaned_csv(
    paths: &RunPaths,
    dataset: &Dataset,
    delimiter: u8,
) -> Result<(), CliError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(&paths.cleaned_path)?;
    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(|value| value.to_field()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Quarantine sink that buffers rows per reason and writes one CSV file per
/// reason on flush.
///
/// Buffering keeps the fix pass free of file I/O; nothing touches disk until
/// the pass has finished.
#[derive(Debug, Default)]
pub struct CsvQuarantineSink {
    buffered: BTreeMap<String, Vec<QuarantinedRow>>,
}

impl CsvQuarantineSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.buffered.values().map(Vec::len).sum()
    }

    /// Write the buffered rows under `quarantine/<reason>.csv`.
    ///
    /// No directory or file is created when nothing was quarantined.
    pub fn flush(
        &self,
        paths: &RunPaths,
        columns: &[String],
        delimiter: u8,
    ) -> Result<(), CliError> {
        if self.buffered.is_empty() {
            return Ok(());
        }
        create_dir_all(&paths.quarantine_dir)?;
        for (reason, rows) in &self.buffered {
            let file = paths
                .quarantine_dir
                .join(format!("{}.csv", slugify(reason)));
            let mut writer = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_path(&file)?;
            let mut header = vec!["source_row".to_string()];
            header.extend(columns.iter().cloned());
            writer.write_record(&header)?;
            for row in rows {
                let mut record = vec![row.source_row.to_string()];
                record.extend(row.values.iter().map(|value| value.to_field()));
                writer.write_record(&record)?;
            }
            writer.flush()?;
            tracing::info!(reason, rows = rows.len(), path = %file.display(), "quarantine written");
        }
        Ok(())
    }
}

impl QuarantineSink for CsvQuarantineSink {
    fn receive(&mut self, rows: &[QuarantinedRow], reason: &str) -> dqguard_fix::Result<()> {
        if !rows.is_empty() {
            self.buffered
                .entry(reason.to_string())
                .or_default()
                .extend_from_slice(rows);
        }
        Ok(())
    }
}

fn slugify(reason: &str) -> String {
    reason
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_filesystem_safe() {
        assert_eq!(slugify("duplicate rows"), "duplicate_rows");
        assert_eq!(
            slugify("stale or unparseable timestamps"),
            "stale_or_unparseable_timestamps"
        );
    }
}
