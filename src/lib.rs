//! FinanceTracker - personal finance ledger
//!
//! This library provides the core of the FinanceTracker ledger: income and
//! expense transactions, recurring templates whose occurrences are generated
//! on catch-up, subscriptions that book their own payments, and signed JSON
//! backups of the whole ledger.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (transactions, categories, subscriptions, cycles)
//! - `storage`: JSON file storage layer
//! - `services`: Business logic layer, including the recurring catch-up engine
//! - `audit`: Audit logging system
//! - `backup`: Signed backups, export and import
//! - `reports`: Balance and subscription summaries
//! - `display`: Terminal formatting
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use financetracker::config::{LedgerPaths, Settings};
//! use financetracker::services::run_recurring_catch_up;
//! use financetracker::storage::Storage;
//!
//! let paths = LedgerPaths::new()?;
//! let storage = Storage::new(paths)?;
//! storage.load_all()?;
//! let report = run_recurring_catch_up(&storage, chrono::Local::now().date_naive())?;
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod reports;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
