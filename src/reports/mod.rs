//! Reports module for FinanceTracker
//!
//! Dashboard figures: balance over a period, recent transactions and the
//! subscription cost summary.

pub mod summary;

pub use summary::{recent_transactions, LedgerSummary, SubscriptionSummary};
