//! Subscription service

use chrono::{NaiveDate, Utc};

use crate::audit::{generate_diff, EntityType};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Frequency, Money, Subscription, SubscriptionId, TransactionType};
use crate::storage::Storage;

/// Input for creating a subscription
#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    pub name: String,
    pub amount: Money,
    pub category: String,
    pub next_payment: NaiveDate,
    pub frequency: Frequency,
    pub color: Option<String>,
}

/// Field changes for a subscription update
#[derive(Debug, Clone, Default)]
pub struct UpdateSubscriptionInput {
    pub name: Option<String>,
    pub amount: Option<Money>,
    pub category: Option<String>,
    pub next_payment: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub color: Option<Option<String>>,
}

/// Service for subscription management
pub struct SubscriptionService<'a> {
    storage: &'a Storage,
}

impl<'a> SubscriptionService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, input: CreateSubscriptionInput) -> LedgerResult<Subscription> {
        let category = self.require_category(&input.category)?;
        require_known(&input.frequency)?;

        let mut subscription = Subscription::new(
            input.name.trim(),
            input.amount,
            category,
            input.next_payment,
            input.frequency,
        );
        subscription.color = input.color;

        subscription
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.subscriptions.upsert(subscription.clone())?;
        self.storage.subscriptions.save()?;

        self.storage.log_create(
            EntityType::Subscription,
            subscription.id.to_string(),
            Some(subscription.name.clone()),
            &subscription,
        )?;

        Ok(subscription)
    }

    pub fn get(&self, id: SubscriptionId) -> LedgerResult<Option<Subscription>> {
        self.storage.subscriptions.get(id)
    }

    /// Find a subscription by name (case-insensitive) or id
    pub fn find(&self, identifier: &str) -> LedgerResult<Option<Subscription>> {
        let all = self.storage.subscriptions.get_all()?;

        if let Some(sub) = all
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(identifier.trim()))
        {
            return Ok(Some(sub.clone()));
        }

        if let Ok(id) = identifier.parse::<SubscriptionId>() {
            return self.storage.subscriptions.get(id);
        }

        Ok(all.into_iter().find(|s| s.id.matches(identifier)))
    }

    /// All subscriptions, soonest payment first
    pub fn list(&self) -> LedgerResult<Vec<Subscription>> {
        self.storage.subscriptions.get_all()
    }

    pub fn update(
        &self,
        id: SubscriptionId,
        input: UpdateSubscriptionInput,
    ) -> LedgerResult<Subscription> {
        let before = self.load(id)?;
        let mut subscription = before.clone();

        if let Some(name) = input.name {
            subscription.name = name.trim().to_string();
        }
        if let Some(amount) = input.amount {
            subscription.amount = amount;
        }
        if let Some(category) = input.category {
            subscription.category = self.require_category(&category)?;
        }
        if let Some(next_payment) = input.next_payment {
            subscription.reschedule(next_payment);
        }
        if let Some(frequency) = input.frequency {
            require_known(&frequency)?;
            subscription.frequency = frequency;
        }
        if let Some(color) = input.color {
            subscription.color = color;
        }
        subscription.updated_at = Utc::now();

        subscription
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.save_update(&before, &subscription)?;
        Ok(subscription)
    }

    /// Stop the engine from booking payments for this subscription
    pub fn pause(&self, id: SubscriptionId) -> LedgerResult<Subscription> {
        let before = self.load(id)?;
        let mut subscription = before.clone();
        subscription.pause();
        self.save_update(&before, &subscription)?;
        Ok(subscription)
    }

    pub fn resume(&self, id: SubscriptionId) -> LedgerResult<Subscription> {
        let before = self.load(id)?;
        let mut subscription = before.clone();
        subscription.resume();
        self.save_update(&before, &subscription)?;
        Ok(subscription)
    }

    /// Delete a subscription; payments already booked stay in the ledger
    pub fn delete(&self, id: SubscriptionId) -> LedgerResult<Subscription> {
        let subscription = self.load(id)?;

        self.storage.subscriptions.delete(id)?;
        self.storage.subscriptions.save()?;

        self.storage.log_delete(
            EntityType::Subscription,
            subscription.id.to_string(),
            Some(subscription.name.clone()),
            &subscription,
        )?;

        Ok(subscription)
    }

    fn load(&self, id: SubscriptionId) -> LedgerResult<Subscription> {
        self.storage
            .subscriptions
            .get(id)?
            .ok_or_else(|| LedgerError::subscription_not_found(id.to_string()))
    }

    fn save_update(&self, before: &Subscription, after: &Subscription) -> LedgerResult<()> {
        self.storage.subscriptions.upsert(after.clone())?;
        self.storage.subscriptions.save()?;

        let diff = match (serde_json::to_value(before), serde_json::to_value(after)) {
            (Ok(b), Ok(a)) => generate_diff(&b, &a),
            _ => None,
        };

        self.storage.log_update(
            EntityType::Subscription,
            after.id.to_string(),
            Some(after.name.clone()),
            before,
            after,
            diff,
        )
    }

    fn require_category(&self, name: &str) -> LedgerResult<String> {
        match self
            .storage
            .categories
            .find_by_name(TransactionType::Expense, name)?
        {
            Some(category) => Ok(category.name),
            None => Err(LedgerError::Validation(format!(
                "No expense category named '{}'",
                name.trim()
            ))),
        }
    }
}

fn require_known(frequency: &Frequency) -> LedgerResult<()> {
    if frequency.is_known() {
        Ok(())
    } else {
        Err(LedgerError::Validation(format!(
            "Unknown frequency: {}",
            frequency
        )))
    }
}
