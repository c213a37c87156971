//! Subscription CLI commands

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_subscription_details, format_subscription_table};
use crate::error::{LedgerError, LedgerResult};
use crate::models::Subscription;
use crate::reports::SubscriptionSummary;
use crate::services::{CreateSubscriptionInput, SubscriptionService, UpdateSubscriptionInput};
use crate::storage::Storage;

use super::{parse_amount, parse_date, parse_date_or_today, parse_frequency};

/// Subscription subcommands
#[derive(Subcommand)]
pub enum SubscriptionCommands {
    /// Add a subscription
    Add {
        /// Subscription name
        name: String,
        /// Amount charged each cycle
        amount: String,
        /// Expense category name
        #[arg(short, long)]
        category: String,
        /// Next payment date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        next: Option<String>,
        /// weekly, monthly, quarterly or yearly
        #[arg(short, long, default_value = "monthly")]
        frequency: String,
        /// Display color (e.g. "#e50914")
        #[arg(long)]
        color: Option<String>,
    },

    /// List subscriptions
    List,

    /// Show subscription details
    Show {
        /// Subscription name or ID
        subscription: String,
    },

    /// Edit a subscription
    Edit {
        /// Subscription name or ID
        subscription: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        amount: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        next: Option<String>,
        #[arg(short, long)]
        frequency: Option<String>,
        #[arg(long, conflicts_with = "clear_color")]
        color: Option<String>,
        #[arg(long)]
        clear_color: bool,
    },

    /// Stop booking payments for a subscription
    Pause {
        subscription: String,
    },

    /// Resume a paused subscription
    Resume {
        subscription: String,
    },

    /// Delete a subscription (booked payments are kept)
    Delete {
        subscription: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Monthly cost and next payment
    Summary,
}

/// Handle a subscription command
pub fn handle_subscription_command(
    storage: &Storage,
    settings: &Settings,
    cmd: SubscriptionCommands,
) -> LedgerResult<()> {
    let service = SubscriptionService::new(storage);
    let currency = settings.currency_symbol.as_str();

    match cmd {
        SubscriptionCommands::Add {
            name,
            amount,
            category,
            next,
            frequency,
            color,
        } => {
            let subscription = service.create(CreateSubscriptionInput {
                name,
                amount: parse_amount(&amount)?,
                category,
                next_payment: parse_date_or_today(next.as_deref())?,
                frequency: parse_frequency(&frequency)?,
                color,
            })?;

            println!("Created subscription:");
            println!("  ID:           {}", subscription.id);
            println!("  Name:         {}", subscription.name);
            println!(
                "  Amount:       {} {}",
                subscription.amount.format_with_symbol(currency),
                subscription.frequency
            );
            println!("  Next payment: {}", subscription.next_payment);
        }

        SubscriptionCommands::List => {
            let subscriptions = service.list()?;
            println!("{}", format_subscription_table(&subscriptions, currency));
        }

        SubscriptionCommands::Show { subscription } => {
            let found = resolve(&service, &subscription)?;
            print!("{}", format_subscription_details(&found, currency));
        }

        SubscriptionCommands::Edit {
            subscription,
            name,
            amount,
            category,
            next,
            frequency,
            color,
            clear_color,
        } => {
            let found = resolve(&service, &subscription)?;

            let color = if clear_color {
                Some(None)
            } else {
                color.map(Some)
            };

            let updated = service.update(
                found.id,
                UpdateSubscriptionInput {
                    name,
                    amount: amount.as_deref().map(parse_amount).transpose()?,
                    category,
                    next_payment: next.as_deref().map(parse_date).transpose()?,
                    frequency: frequency.as_deref().map(parse_frequency).transpose()?,
                    color,
                },
            )?;
            println!("Updated subscription: {}", updated.name);
        }

        SubscriptionCommands::Pause { subscription } => {
            let found = resolve(&service, &subscription)?;
            let paused = service.pause(found.id)?;
            println!("Paused subscription: {}", paused.name);
        }

        SubscriptionCommands::Resume { subscription } => {
            let found = resolve(&service, &subscription)?;
            let resumed = service.resume(found.id)?;
            println!(
                "Resumed subscription: {} (next payment {})",
                resumed.name, resumed.next_payment
            );
        }

        SubscriptionCommands::Delete {
            subscription,
            force,
        } => {
            let found = resolve(&service, &subscription)?;

            if !force {
                println!(
                    "About to delete subscription '{}'. Payments already booked are kept.",
                    found.name
                );
                println!("Run again with --force to confirm.");
                return Ok(());
            }

            let deleted = service.delete(found.id)?;
            println!("Deleted subscription: {}", deleted.name);
        }

        SubscriptionCommands::Summary => {
            let summary = SubscriptionSummary::generate(storage)?;
            print!("{}", summary.format_terminal(currency));
        }
    }

    Ok(())
}

fn resolve(service: &SubscriptionService, identifier: &str) -> LedgerResult<Subscription> {
    service
        .find(identifier)?
        .ok_or_else(|| LedgerError::subscription_not_found(identifier))
}
