//! Subscription repository for JSON storage

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::LedgerError;
use crate::models::{Subscription, SubscriptionId};

use super::file_io::{read_json, write_json_atomic};
use super::poisoned;

/// On-disk layout of subscriptions.json
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct SubscriptionData {
    subscriptions: Vec<Subscription>,
}

/// Soonest payment first
fn sort_by_due_date(subscriptions: &mut [Subscription]) {
    subscriptions.sort_by(|a, b| {
        a.next_payment
            .cmp(&b.next_payment)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Repository for subscription persistence
pub struct SubscriptionRepository {
    path: PathBuf,
    data: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl SubscriptionRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), LedgerError> {
        let file_data: SubscriptionData = read_json(&self.path)?;
        self.replace(file_data.subscriptions)
    }

    pub fn save(&self) -> Result<(), LedgerError> {
        let subscriptions = self.get_all()?;
        self.persist(&subscriptions)
    }

    pub(crate) fn persist(&self, subscriptions: &[Subscription]) -> Result<(), LedgerError> {
        let mut sorted = subscriptions.to_vec();
        sort_by_due_date(&mut sorted);
        write_json_atomic(&self.path, &SubscriptionData { subscriptions: sorted })
    }

    pub(crate) fn replace(&self, subscriptions: Vec<Subscription>) -> Result<(), LedgerError> {
        let map: HashMap<_, _> = subscriptions.into_iter().map(|s| (s.id, s)).collect();
        let mut data = self.data.write().map_err(poisoned)?;
        *data = map;
        Ok(())
    }

    pub fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.get(&id).cloned())
    }

    /// All subscriptions, soonest payment first
    pub fn get_all(&self) -> Result<Vec<Subscription>, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        let mut list: Vec<_> = data.values().cloned().collect();
        sort_by_due_date(&mut list);
        Ok(list)
    }

    pub fn get_active(&self) -> Result<Vec<Subscription>, LedgerError> {
        Ok(self.get_all()?.into_iter().filter(|s| s.is_active()).collect())
    }

    pub fn upsert(&self, subscription: Subscription) -> Result<(), LedgerError> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.insert(subscription.id, subscription);
        Ok(())
    }

    pub fn delete(&self, id: SubscriptionId) -> Result<Option<Subscription>, LedgerError> {
        let mut data = self.data.write().map_err(poisoned)?;
        Ok(data.remove(&id))
    }

    pub fn count(&self) -> Result<usize, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, Money};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sub(name: &str, day: u32) -> Subscription {
        Subscription::new(
            name,
            Money::from_cents(999),
            "Leisure",
            NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            Frequency::Monthly,
        )
    }

    #[test]
    fn test_active_filter_and_order() {
        let temp_dir = TempDir::new().unwrap();
        let repo = SubscriptionRepository::new(temp_dir.path().join("subscriptions.json"));

        let mut paused = sub("Gym", 1);
        paused.pause();
        repo.upsert(paused).unwrap();
        repo.upsert(sub("Spotify", 20)).unwrap();
        repo.upsert(sub("Netflix", 3)).unwrap();

        let active = repo.get_active().unwrap();
        let names: Vec<_> = active.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Netflix", "Spotify"]);
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("subscriptions.json");
        let repo = SubscriptionRepository::new(path.clone());
        let netflix = sub("Netflix", 3);
        let id = netflix.id;
        repo.upsert(netflix).unwrap();
        repo.save().unwrap();

        let reloaded = SubscriptionRepository::new(path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.get(id).unwrap().unwrap().name, "Netflix");
    }
}
