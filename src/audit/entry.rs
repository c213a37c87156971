//! Audit entry data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of operations that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
    /// The whole ledger was replaced from a backup
    Restore,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
            Operation::Restore => write!(f, "RESTORE"),
        }
    }
}

/// Types of entities that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Transaction,
    Category,
    Subscription,
    Backup,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Transaction => write!(f, "Transaction"),
            EntityType::Category => write!(f, "Category"),
            EntityType::Subscription => write!(f, "Subscription"),
            EntityType::Backup => write!(f, "Backup"),
        }
    }
}

/// A single audit log entry
///
/// Before/after snapshots are stored as JSON values so the log stays
/// readable even after the model types change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation occurred (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    pub entity_type: EntityType,

    /// ID of the affected entity (short display form)
    pub entity_id: String,

    /// Human-readable label, e.g. the transaction title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,

    /// Human-readable diff or event summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

impl AuditEntry {
    fn base(
        operation: Operation,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            entity_type,
            entity_id: entity_id.into(),
            entity_name,
            before: None,
            after: None,
            diff_summary: None,
        }
    }

    /// Entry for a created entity
    pub fn create<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Self {
        Self {
            after: serde_json::to_value(entity).ok(),
            ..Self::base(Operation::Create, entity_type, entity_id, entity_name)
        }
    }

    /// Entry for an updated entity
    pub fn update<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
        diff_summary: Option<String>,
    ) -> Self {
        Self {
            before: serde_json::to_value(before).ok(),
            after: serde_json::to_value(after).ok(),
            diff_summary,
            ..Self::base(Operation::Update, entity_type, entity_id, entity_name)
        }
    }

    /// Entry for a deleted entity
    pub fn delete<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Self {
        Self {
            before: serde_json::to_value(entity).ok(),
            ..Self::base(Operation::Delete, entity_type, entity_id, entity_name)
        }
    }

    /// Entry for a full ledger replacement from `source`
    pub fn restore(source: impl Into<String>, summary: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            diff_summary: Some(summary.into()),
            ..Self::base(Operation::Restore, EntityType::Backup, source.clone(), Some(source))
        }
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.entity_type,
            self.entity_id
        );

        if let Some(name) = self.entity_name.as_ref().filter(|n| **n != self.entity_id) {
            output.push_str(&format!(" ({})", name));
        }

        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Create.to_string(), "CREATE");
        assert_eq!(Operation::Restore.to_string(), "RESTORE");
    }

    #[test]
    fn test_create_and_delete_entries() {
        let data = json!({"title": "Rent", "amount": 80000});
        let created = AuditEntry::create(
            EntityType::Transaction,
            "txn-12345678",
            Some("Rent".to_string()),
            &data,
        );
        assert_eq!(created.operation, Operation::Create);
        assert!(created.before.is_none());
        assert!(created.after.is_some());

        let deleted = AuditEntry::delete(EntityType::Transaction, "txn-12345678", None, &data);
        assert!(deleted.before.is_some());
        assert!(deleted.after.is_none());
    }

    #[test]
    fn test_restore_entry() {
        let entry = AuditEntry::restore("backup-2025-01-01T00-00-00-000Z.json", "3 transactions");
        assert_eq!(entry.entity_type, EntityType::Backup);
        let formatted = entry.format_human_readable();
        assert!(formatted.contains("RESTORE Backup backup-2025"));
        assert!(formatted.contains("3 transactions"));
    }

    #[test]
    fn test_serialization_round_trip() {
        let entry = AuditEntry::update(
            EntityType::Subscription,
            "sub-1",
            Some("Netflix".into()),
            &json!({"amount": 999}),
            &json!({"amount": 1299}),
            Some("amount: 999 -> 1299".into()),
        );

        let line = serde_json::to_string(&entry).unwrap();
        let back: AuditEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(back.operation, Operation::Update);
        assert_eq!(back.entity_type, EntityType::Subscription);
        assert_eq!(back.diff_summary.as_deref(), Some("amount: 999 -> 1299"));
    }
}
