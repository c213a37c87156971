//! Transaction CLI commands
//!
//! Implements CLI commands for transaction management.

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_transaction_details, format_transaction_table};
use crate::error::{LedgerError, LedgerResult};
use crate::models::TransactionKind;
use crate::services::{
    CreateTransactionInput, DeleteScope, EditScope, RecurrenceInput, TransactionFilter,
    TransactionService, UpdateTransactionInput,
};
use crate::storage::Storage;

use super::{parse_amount, parse_date, parse_date_or_today, parse_frequency, parse_type};

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Add a new transaction
    Add {
        /// Title
        title: String,
        /// Amount (e.g. "12.50"); the sign comes from --type
        amount: String,
        /// income or expense
        #[arg(short, long, default_value = "expense")]
        r#type: String,
        /// Category name
        #[arg(short, long)]
        category: String,
        /// Transaction date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Make this a recurring template (weekly, monthly, quarterly, yearly)
        #[arg(short, long)]
        repeat: Option<String>,
        /// Last date a recurrence may fall on (YYYY-MM-DD)
        #[arg(long, requires = "repeat")]
        until: Option<String>,
        /// Total occurrences including this one
        #[arg(long, requires = "repeat")]
        installments: Option<u32>,
    },
    /// List transactions
    List {
        /// income or expense
        #[arg(short, long)]
        r#type: Option<String>,
        /// template, generated, subscription or one-off
        #[arg(short, long)]
        kind: Option<String>,
        /// Filter by category name
        #[arg(short, long)]
        category: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show transaction details
    Show {
        /// Transaction ID
        id: String,
    },
    /// Edit a transaction
    Edit {
        /// Transaction ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        amount: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        /// New recurrence frequency (templates only)
        #[arg(short, long)]
        repeat: Option<String>,
        /// New end date (templates only)
        #[arg(long, conflicts_with = "no_end")]
        until: Option<String>,
        /// Remove the end date
        #[arg(long)]
        no_end: bool,
        /// New total occurrences (templates only)
        #[arg(long, conflicts_with = "no_limit")]
        installments: Option<u32>,
        /// Remove the installment limit
        #[arg(long)]
        no_limit: bool,
        /// Also rewrite the template's instances dated after it
        #[arg(long)]
        future: bool,
    },
    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: String,
        /// For a template, also delete every instance generated from it
        #[arg(long)]
        all: bool,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a transaction command
pub fn handle_transaction_command(
    storage: &Storage,
    settings: &Settings,
    cmd: TransactionCommands,
) -> LedgerResult<()> {
    let service = TransactionService::new(storage);
    let currency = settings.currency_symbol.as_str();

    match cmd {
        TransactionCommands::Add {
            title,
            amount,
            r#type,
            category,
            date,
            description,
            repeat,
            until,
            installments,
        } => {
            let recurrence = match repeat {
                Some(freq) => Some(RecurrenceInput {
                    frequency: parse_frequency(&freq)?,
                    end_date: until.as_deref().map(parse_date).transpose()?,
                    installments,
                }),
                None => None,
            };

            let txn = service.create(CreateTransactionInput {
                title,
                amount: parse_amount(&amount)?,
                transaction_type: parse_type(&r#type)?,
                category,
                date: parse_date_or_today(date.as_deref())?,
                description,
                recurrence,
            })?;

            println!("Created transaction:");
            println!("  ID:       {}", txn.id);
            println!("  Date:     {}", txn.date);
            println!("  Amount:   {}", txn.signed_amount().format_with_symbol(currency));
            println!("  Category: {}", txn.category);
            if let Some(freq) = &txn.recurring_frequency {
                println!("  Repeats:  {}", freq);
            }
        }

        TransactionCommands::List {
            r#type,
            kind,
            category,
            from,
            to,
            limit,
        } => {
            let mut filter = TransactionFilter::new().limit(limit);

            if let Some(t) = r#type {
                filter = filter.transaction_type(parse_type(&t)?);
            }
            if let Some(k) = kind {
                filter = filter.kind(parse_kind(&k)?);
            }
            if let Some(c) = category {
                filter = filter.category(c);
            }
            filter.start_date = from.as_deref().map(parse_date).transpose()?;
            filter.end_date = to.as_deref().map(parse_date).transpose()?;

            let transactions = service.list(filter)?;
            println!("{}", format_transaction_table(&transactions, currency));
            println!("\nShowing {} transactions", transactions.len());
        }

        TransactionCommands::Show { id } => {
            let txn = service
                .find(&id)?
                .ok_or_else(|| LedgerError::transaction_not_found(&id))?;

            print!("{}", format_transaction_details(&txn, currency));

            if txn.kind() == TransactionKind::Template {
                let instances = service.instances_of(txn.id)?;
                println!("Instances:   {}", instances.len());
                if let Some(last) = instances.last() {
                    println!("Latest:      {}", last.date);
                }
            }
        }

        TransactionCommands::Edit {
            id,
            title,
            amount,
            description,
            category,
            date,
            repeat,
            until,
            no_end,
            installments,
            no_limit,
            future,
        } => {
            let txn = service
                .find(&id)?
                .ok_or_else(|| LedgerError::transaction_not_found(&id))?;

            let end_date = if no_end {
                Some(None)
            } else {
                until.as_deref().map(parse_date).transpose()?.map(Some)
            };
            let installments = if no_limit {
                Some(None)
            } else {
                installments.map(Some)
            };

            let input = UpdateTransactionInput {
                title,
                amount: amount.as_deref().map(parse_amount).transpose()?,
                description,
                category,
                date: date.as_deref().map(parse_date).transpose()?,
                frequency: repeat.as_deref().map(parse_frequency).transpose()?,
                end_date,
                installments,
            };

            let scope = if future {
                EditScope::ThisAndFuture
            } else {
                EditScope::ThisOnly
            };

            let outcome = service.update(txn.id, input, scope)?;
            println!("Updated transaction: {}", outcome.transaction.id);
            if outcome.cascaded > 0 {
                println!("  Also updated {} future instance(s)", outcome.cascaded);
            }
        }

        TransactionCommands::Delete { id, all, force } => {
            let txn = service
                .find(&id)?
                .ok_or_else(|| LedgerError::transaction_not_found(&id))?;

            if !force {
                println!("About to delete: {} {} ({})", txn.date, txn.title, txn.id);
                if all && txn.is_template() {
                    println!(
                        "Together with {} generated instance(s).",
                        service.instances_of(txn.id)?.len()
                    );
                }
                println!("Run again with --force to confirm.");
                return Ok(());
            }

            let scope = if all {
                DeleteScope::ThisAndLinked
            } else {
                DeleteScope::ThisOnly
            };

            let removed = service.delete(txn.id, scope)?;
            println!("Deleted {} transaction(s)", removed.len());
        }
    }

    Ok(())
}

fn parse_kind(value: &str) -> LedgerResult<TransactionKind> {
    match value.trim().to_lowercase().as_str() {
        "template" | "recurring" => Ok(TransactionKind::Template),
        "generated" | "instance" => Ok(TransactionKind::Generated),
        "subscription" => Ok(TransactionKind::SubscriptionInstance),
        "one-off" | "oneoff" | "single" => Ok(TransactionKind::OneOff),
        other => Err(LedgerError::Validation(format!(
            "Invalid kind: '{}'. Use template, generated, subscription or one-off",
            other
        ))),
    }
}
