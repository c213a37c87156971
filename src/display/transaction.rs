//! Transaction display formatting
//!
//! Register table and detail view for transactions.

use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use crate::models::{Transaction, TransactionKind};

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "")]
    marker: &'static str,
}

/// Format transactions as a register table
pub fn format_transaction_table(transactions: &[Transaction], currency: &str) -> String {
    if transactions.is_empty() {
        return "No transactions found.".to_string();
    }

    let rows = transactions.iter().map(|txn| TransactionRow {
        id: txn.id.to_string(),
        date: txn.date.format("%Y-%m-%d").to_string(),
        title: truncate(&txn.title, 30),
        category: txn.category.clone(),
        amount: txn.signed_amount().format_with_symbol(currency),
        marker: kind_marker(txn.kind()),
    });

    let mut table = Table::new(rows);
    table
        .with(Style::psql())
        .modify(Columns::single(4), Alignment::right());
    table.to_string()
}

/// Format transaction details for display
pub fn format_transaction_details(txn: &Transaction, currency: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Transaction: {}\n", txn.id));
    output.push_str(&format!("Title:       {}\n", txn.title));
    output.push_str(&format!("Date:        {}\n", txn.date.format("%Y-%m-%d")));
    output.push_str(&format!(
        "Amount:      {}\n",
        txn.amount.format_with_symbol(currency)
    ));
    output.push_str(&format!("Type:        {}\n", txn.transaction_type));
    output.push_str(&format!("Category:    {}\n", txn.category));

    if !txn.description.is_empty() {
        output.push_str(&format!("Description: {}\n", txn.description));
    }

    output.push_str(&format!("Kind:        {}\n", txn.kind()));

    if let Some(frequency) = &txn.recurring_frequency {
        output.push_str(&format!("Repeats:     {}\n", frequency));
        if let Some(end) = txn.recurring_end_date {
            output.push_str(&format!("Until:       {}\n", end));
        }
        if let Some(installments) = txn.installments {
            output.push_str(&format!("Installments: {}\n", installments));
        }
    }

    if let Some(parent) = txn.parent_id {
        output.push_str(&format!("Template:    {}\n", parent));
    }
    if let Some(subscription) = txn.subscription_id {
        output.push_str(&format!("Subscription: {}\n", subscription));
    }

    output
}

fn kind_marker(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Template => "↻",
        TransactionKind::Generated => "·",
        TransactionKind::SubscriptionInstance => "$",
        TransactionKind::OneOff => "",
    }
}

/// Truncate a string to at most `max_len` characters
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
