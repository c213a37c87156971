//! Signed backups for FinanceTracker
//!
//! - `snapshot`: the portable backup format and the builder that reads the ledger into it
//! - `signature`: SHA-256 over canonical JSON
//! - `BackupManager`: capped backup history, export and import
//! - `RestoreManager`: validation and all-or-nothing restore
//!
//! # Backup format
//!
//! ```json
//! {
//!   "version": 1,
//!   "exportedAt": "2025-03-04T05:06:07.089Z",
//!   "transactions": [ ... ],
//!   "categories": [ ... ],
//!   "subscriptions": [ ... ],
//!   "signature": "<64 hex chars>"
//! }
//! ```
//!
//! Amounts are integer cents. Records carry no ids; links are positions in
//! the arrays.

mod manager;
mod restore;
pub mod signature;
pub mod snapshot;

pub use manager::{backup_file_name, export_file_name, parse_backup_date, BackupInfo, BackupManager};
pub use restore::{RestoreManager, RestoreResult, ValidationResult};
pub use signature::{sign, verify};
pub use snapshot::{SnapshotBuilder, SnapshotPayload, SNAPSHOT_VERSION};
