//! Audit logging for FinanceTracker
//!
//! Every create, update and delete made through the services, and every
//! restore or import, is appended to `audit.log` as a JSON line.
//!
//! - `AuditEntry`: one operation with optional before/after values
//! - `AuditLogger`: JSONL writer and reader
//! - `generate_diff`: top-level field diff for update entries

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
