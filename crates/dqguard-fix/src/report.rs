use serde::Serialize;

use dqguard_rules::CheckKind;

/// Remediation applied (or proposed) for one failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixAction {
    /// Out-of-range values clamped to the nearest bound.
    Clip,
    /// Offending rows removed and quarantined.
    Drop,
    /// Null cells replaced by a constant or statistic.
    Fill,
    /// Leading and trailing whitespace removed from text cells.
    Trim,
    /// Text cells parsed into typed timestamps.
    Parse,
    /// Values outside the allowed set replaced by null.
    Enforce,
}

/// One audit entry: what was attempted, what it touched, and the verdict.
#[derive(Debug, Clone, Serialize)]
pub struct FixRecord {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_type: Option<CheckKind>,
    /// Absent when no fixer applies to the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<FixAction>,
    pub rows_affected: u64,
    pub cells_affected: u64,
    /// True when the candidate was rejected by the guardrail budget.
    pub budget_exceeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FixRecord {
    /// Entry for a failure no fixer can address.
    pub fn unfixable(
        table: &str,
        column: Option<&str>,
        check_type: CheckKind,
        note: impl Into<String>,
    ) -> Self {
        Self {
            table: table.to_string(),
            column: column.map(str::to_string),
            check_type: Some(check_type),
            action: None,
            rows_affected: 0,
            cells_affected: 0,
            budget_exceeded: false,
            quarantine_reason: None,
            note: Some(note.into()),
        }
    }
}

/// Full audit of one fix pass over a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    pub records: Vec<FixRecord>,
    pub rows_before: u64,
    pub rows_after: u64,
    pub total_rows_changed: u64,
    pub total_rows_dropped: u64,
    pub total_cells_changed: u64,
    pub row_change_fraction: f64,
    pub row_drop_fraction: f64,
    pub cell_change_fraction: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_the_audit_field_names() {
        let record = FixRecord {
            table: "orders".to_string(),
            column: Some("amount".to_string()),
            check_type: Some(CheckKind::Range),
            action: Some(FixAction::Clip),
            rows_affected: 3,
            cells_affected: 3,
            budget_exceeded: false,
            quarantine_reason: None,
            note: None,
        };
        let json = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(json["action"], "clip");
        assert_eq!(json["rows_affected"], 3);
        assert_eq!(json["cells_affected"], 3);
        assert_eq!(json["budget_exceeded"], false);
        assert!(json.get("note").is_none());
    }

    #[test]
    fn unfixable_record_has_no_action() {
        let record = FixRecord::unfixable("orders", Some("amount"), CheckKind::NullRate, "no fill");
        assert!(record.action.is_none());
        let json = serde_json::to_value(&record).expect("serialize record");
        assert!(json.get("action").is_none());
        assert_eq!(json["note"], "no fill");
    }
}
