//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod backup;
pub mod category;
pub mod subscription;
pub mod transaction;

pub use backup::{handle_backup_command, BackupCommands};
pub use category::{handle_category_command, CategoryCommands};
pub use subscription::{handle_subscription_command, SubscriptionCommands};
pub use transaction::{handle_transaction_command, TransactionCommands};

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Frequency, Money, TransactionType};

/// Parse a `YYYY-MM-DD` argument
pub(crate) fn parse_date(value: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        LedgerError::Validation(format!("Invalid date format: '{}'. Use YYYY-MM-DD", value))
    })
}

/// Parse an optional date, defaulting to today
pub(crate) fn parse_date_or_today(value: Option<&str>) -> LedgerResult<NaiveDate> {
    match value {
        Some(v) => parse_date(v),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// Parse a positive money amount
pub(crate) fn parse_amount(value: &str) -> LedgerResult<Money> {
    let amount = Money::parse(value).map_err(|e| {
        LedgerError::Validation(format!(
            "Invalid amount: '{}'. Use a format like '12.50'. Error: {}",
            value, e
        ))
    })?;
    if amount.is_negative() {
        return Err(LedgerError::Validation(
            "Amounts are entered as positive numbers; use --type to choose income or expense"
                .into(),
        ));
    }
    Ok(amount)
}

pub(crate) fn parse_type(value: &str) -> LedgerResult<TransactionType> {
    value.parse().map_err(LedgerError::Validation)
}

pub(crate) fn parse_frequency(value: &str) -> LedgerResult<Frequency> {
    value.parse().map_err(LedgerError::Validation)
}
