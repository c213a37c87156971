//! Formatting for catch-up runs and the audit trail

use crate::audit::AuditEntry;
use crate::services::CatchUpReport;

/// One-paragraph outcome of a catch-up run
pub fn format_catch_up_report(report: &CatchUpReport) -> String {
    let mut output = format!(
        "Catch-up: {} generated, {} subscription payments booked ({} templates, {} subscriptions checked)\n",
        report.generated,
        report.subscription_payments,
        report.templates_checked,
        report.subscriptions_checked,
    );

    if report.cancelled {
        output.push_str("Run was cancelled before finishing.\n");
    }

    for failure in &report.failures {
        output.push_str(&format!(
            "  failed: {} '{}' ({}): {}\n",
            failure.entity_type, failure.name, failure.entity_id, failure.error
        ));
    }

    output
}

/// Audit entries, one per line, oldest first
pub fn format_audit_entries(entries: &[AuditEntry]) -> String {
    if entries.is_empty() {
        return "No audit entries.".to_string();
    }

    let mut output = String::new();
    for entry in entries {
        output.push_str(&entry.format_human_readable());
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::EntityType;
    use crate::services::EntityFailure;

    #[test]
    fn test_catch_up_report_lists_failures() {
        let report = CatchUpReport {
            generated: 3,
            failures: vec![EntityFailure {
                entity_type: EntityType::Transaction,
                entity_id: "txn-1234abcd".into(),
                name: "Rent".into(),
                error: "Validation error: title is empty".into(),
            }],
            ..Default::default()
        };

        let output = format_catch_up_report(&report);
        assert!(output.contains("3 generated"));
        assert!(output.contains("'Rent'"));
    }

    #[test]
    fn test_empty_audit() {
        assert_eq!(format_audit_entries(&[]), "No audit entries.");
    }
}
