//! Subscription display formatting

use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use crate::models::Subscription;

#[derive(Tabled)]
struct SubscriptionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Frequency")]
    frequency: String,
    #[tabled(rename = "Next payment")]
    next_payment: String,
    #[tabled(rename = "Status")]
    status: String,
}

pub fn format_subscription_table(subscriptions: &[Subscription], currency: &str) -> String {
    if subscriptions.is_empty() {
        return "No subscriptions found.".to_string();
    }

    let rows = subscriptions.iter().map(|s| SubscriptionRow {
        id: s.id.to_string(),
        name: s.name.clone(),
        category: s.category.clone(),
        amount: s.amount.format_with_symbol(currency),
        frequency: s.frequency.to_string(),
        next_payment: s.next_payment.format("%Y-%m-%d").to_string(),
        status: s.status.to_string(),
    });

    let mut table = Table::new(rows);
    table
        .with(Style::psql())
        .modify(Columns::single(3), Alignment::right());
    table.to_string()
}

pub fn format_subscription_details(subscription: &Subscription, currency: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("Subscription: {}\n", subscription.id));
    output.push_str(&format!("Name:         {}\n", subscription.name));
    output.push_str(&format!(
        "Amount:       {} {}\n",
        subscription.amount.format_with_symbol(currency),
        subscription.frequency
    ));
    if let Some(monthly) = subscription.monthly_cost() {
        output.push_str(&format!(
            "Per month:    {}\n",
            monthly.format_with_symbol(currency)
        ));
    }
    output.push_str(&format!("Category:     {}\n", subscription.category));
    output.push_str(&format!("Next payment: {}\n", subscription.next_payment));
    output.push_str(&format!("Status:       {}\n", subscription.status));
    if let Some(color) = &subscription.color {
        output.push_str(&format!("Color:        {}\n", color));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, Money};
    use chrono::NaiveDate;

    fn netflix() -> Subscription {
        Subscription::new(
            "Netflix",
            Money::from_cents(1299),
            "Leisure",
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            Frequency::Monthly,
        )
    }

    #[test]
    fn test_table() {
        let output = format_subscription_table(&[netflix()], "€");
        assert!(output.contains("Netflix"));
        assert!(output.contains("€12.99"));
        assert!(output.contains("2025-03-10"));
    }

    #[test]
    fn test_details() {
        let mut sub = netflix();
        sub.frequency = Frequency::Yearly;
        let output = format_subscription_details(&sub, "€");
        assert!(output.contains("Per month:    €1.08"));
    }
}
