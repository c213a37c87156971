//! Display formatting for terminal output
//!
//! Tables are rendered with `tabled`; detail views are plain aligned text.

pub mod backup;
pub mod category;
pub mod report;
pub mod subscription;
pub mod transaction;

pub use backup::format_backup_table;
pub use category::format_category_table;
pub use report::{format_audit_entries, format_catch_up_report};
pub use subscription::{format_subscription_details, format_subscription_table};
pub use transaction::{format_transaction_details, format_transaction_table};
