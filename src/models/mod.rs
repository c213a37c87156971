//! Core data models for FinanceTracker
//!
//! This module contains the ledger domain: transactions (templates, generated
//! instances, one-offs), categories, subscriptions and the date cycle
//! calculator that drives recurrence.

pub mod category;
pub mod frequency;
pub mod ids;
pub mod money;
pub mod subscription;
pub mod transaction;

pub use category::{default_categories, Category, CategoryValidationError};
pub use frequency::{Frequency, Schedule};
pub use ids::{CategoryId, SubscriptionId, TransactionId};
pub use money::Money;
pub use subscription::{Subscription, SubscriptionStatus, SubscriptionValidationError};
pub use transaction::{
    Transaction, TransactionKind, TransactionType, TransactionValidationError,
};
