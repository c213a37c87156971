//! Ledger and subscription summaries
//!
//! The figures shown on the dashboard: balance, income and expense over a
//! period, the most recent rows, and what the active subscriptions cost.

use chrono::{Datelike, NaiveDate};

use crate::error::LedgerResult;
use crate::models::{Money, Subscription, Transaction, TransactionType};
use crate::storage::Storage;

/// Income, expense and balance over a period (or all time)
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSummary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub income: Money,
    pub expense: Money,
    /// Income minus expense
    pub balance: Money,
    pub transaction_count: usize,
}

impl LedgerSummary {
    /// Summarize every row in the ledger
    pub fn all_time(storage: &Storage) -> LedgerResult<Self> {
        Ok(Self::from_transactions(
            &storage.transactions.get_all()?,
            None,
            None,
        ))
    }

    /// Summarize rows dated within `start..=end`
    pub fn for_range(storage: &Storage, start: NaiveDate, end: NaiveDate) -> LedgerResult<Self> {
        Ok(Self::from_transactions(
            &storage.transactions.get_by_date_range(start, end)?,
            Some(start),
            Some(end),
        ))
    }

    /// Summarize the calendar month containing `day`
    pub fn for_month(storage: &Storage, day: NaiveDate) -> LedgerResult<Self> {
        let (start, end) = month_bounds(day);
        Self::for_range(storage, start, end)
    }

    fn from_transactions(
        transactions: &[Transaction],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Self {
        let mut income = Money::zero();
        let mut expense = Money::zero();

        for txn in transactions {
            match txn.transaction_type {
                TransactionType::Income => income += txn.amount,
                TransactionType::Expense => expense += txn.amount,
            }
        }

        Self {
            start_date,
            end_date,
            income,
            expense,
            balance: income - expense,
            transaction_count: transactions.len(),
        }
    }

    /// Format the summary for terminal display
    pub fn format_terminal(&self, currency: &str) -> String {
        let period = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => format!("{} to {}", start, end),
            _ => "All time".to_string(),
        };

        let mut output = String::new();
        output.push_str(&format!("{}\n", period));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!(
            "{:<20} {:>19}\n",
            "Income",
            self.income.format_with_symbol(currency)
        ));
        output.push_str(&format!(
            "{:<20} {:>19}\n",
            "Expense",
            self.expense.format_with_symbol(currency)
        ));
        output.push_str(&format!(
            "{:<20} {:>19}\n",
            "Balance",
            self.balance.format_with_symbol(currency)
        ));
        output.push_str(&format!(
            "{:<20} {:>19}\n",
            "Transactions", self.transaction_count
        ));
        output
    }
}

/// The `limit` most recent rows, newest first
pub fn recent_transactions(storage: &Storage, limit: usize) -> LedgerResult<Vec<Transaction>> {
    let mut transactions = storage.transactions.get_all()?;
    transactions.truncate(limit);
    Ok(transactions)
}

/// What the active subscriptions cost and when the next one is due
#[derive(Debug, Clone)]
pub struct SubscriptionSummary {
    pub active_count: usize,
    pub paused_count: usize,
    /// Sum of active subscriptions normalized to one month
    pub monthly_cost: Money,
    /// Earliest payment date among active subscriptions
    pub next_due: Option<NaiveDate>,
    /// Active subscriptions due on `next_due`
    pub due_next: Vec<Subscription>,
}

impl SubscriptionSummary {
    pub fn generate(storage: &Storage) -> LedgerResult<Self> {
        let all = storage.subscriptions.get_all()?;
        let (active, paused): (Vec<_>, Vec<_>) = all.into_iter().partition(|s| s.is_active());

        let monthly_cost = active.iter().filter_map(Subscription::monthly_cost).sum();
        let next_due = active.iter().map(|s| s.next_payment).min();
        let due_next = match next_due {
            Some(day) => active
                .iter()
                .filter(|s| s.next_payment == day)
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        Ok(Self {
            active_count: active.len(),
            paused_count: paused.len(),
            monthly_cost,
            next_due,
            due_next,
        })
    }

    /// Total of the payments due on `next_due`
    pub fn due_next_total(&self) -> Money {
        self.due_next.iter().map(|s| s.amount).sum()
    }

    pub fn format_terminal(&self, currency: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Active subscriptions: {} ({} paused)\n",
            self.active_count, self.paused_count
        ));
        output.push_str(&format!(
            "Monthly cost:         {}\n",
            self.monthly_cost.format_with_symbol(currency)
        ));

        match self.next_due {
            Some(day) => {
                output.push_str(&format!(
                    "Next payment:         {} ({})\n",
                    day,
                    self.due_next_total().format_with_symbol(currency)
                ));
                for sub in &self.due_next {
                    output.push_str(&format!(
                        "  - {} {}\n",
                        sub.name,
                        sub.amount.format_with_symbol(currency)
                    ));
                }
            }
            None => output.push_str("Next payment:         none\n"),
        }
        output
    }
}

/// First and last day of the month containing `day`
fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day.with_day(1).unwrap_or(day);
    let next_month = if day.month() == 12 {
        NaiveDate::from_ymd_opt(day.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(day.year(), day.month() + 1, 1)
    };
    let end = next_month.and_then(|d| d.pred_opt()).unwrap_or(day);
    (start, end)
}
