//! Category service
//!
//! Category names are unique per transaction type and are what transactions
//! and subscriptions point at, so a category cannot be deleted while any row
//! still uses its name.

use tracing::info;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{default_categories, Category, CategoryId, TransactionType};
use crate::storage::Storage;

/// Service for category management
pub struct CategoryService<'a> {
    storage: &'a Storage,
}

impl<'a> CategoryService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new category
    pub fn create(
        &self,
        name: &str,
        category_type: TransactionType,
        icon: &str,
    ) -> LedgerResult<Category> {
        let name = name.trim();

        if self
            .storage
            .categories
            .find_by_name(category_type, name)?
            .is_some()
        {
            return Err(LedgerError::Duplicate {
                entity_type: "Category",
                identifier: format!("{} ({})", name, category_type.as_str()),
            });
        }

        let category = Category::new(name, category_type, icon.trim());
        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.categories.upsert(category.clone())?;
        self.storage.categories.save()?;

        self.storage.log_create(
            EntityType::Category,
            category.id.to_string(),
            Some(category.name.clone()),
            &category,
        )?;

        Ok(category)
    }

    /// Add any default category that is missing; returns how many were added
    pub fn seed_defaults(&self) -> LedgerResult<usize> {
        let mut added = 0;
        for category in default_categories() {
            if self
                .storage
                .categories
                .find_by_name(category.category_type, &category.name)?
                .is_none()
            {
                self.storage.categories.upsert(category)?;
                added += 1;
            }
        }
        if added > 0 {
            self.storage.categories.save()?;
            info!(added, "default categories seeded");
        }
        Ok(added)
    }

    pub fn get(&self, id: CategoryId) -> LedgerResult<Option<Category>> {
        self.storage.categories.get(id)
    }

    /// Find a category by name (optionally within one type) or by id
    ///
    /// A bare name shared by an income and an expense category is ambiguous
    /// and must be qualified with a type.
    pub fn find(
        &self,
        identifier: &str,
        category_type: Option<TransactionType>,
    ) -> LedgerResult<Option<Category>> {
        let mut by_name: Vec<_> = self
            .storage
            .categories
            .get_all()?
            .into_iter()
            .filter(|c| c.has_name(identifier))
            .filter(|c| category_type.map_or(true, |t| c.category_type == t))
            .collect();

        match by_name.len() {
            1 => return Ok(by_name.pop()),
            n if n > 1 => {
                return Err(LedgerError::Validation(format!(
                    "'{}' exists for both income and expense, pass a type",
                    identifier.trim()
                )))
            }
            _ => {}
        }

        if let Ok(id) = identifier.parse::<CategoryId>() {
            return self.storage.categories.get(id);
        }

        Ok(self
            .storage
            .categories
            .get_all()?
            .into_iter()
            .find(|c| c.id.matches(identifier)))
    }

    /// List categories, optionally only one type
    pub fn list(&self, category_type: Option<TransactionType>) -> LedgerResult<Vec<Category>> {
        match category_type {
            Some(kind) => self.storage.categories.get_by_type(kind),
            None => self.storage.categories.get_all(),
        }
    }

    /// Change a category's icon
    pub fn set_icon(&self, id: CategoryId, icon: &str) -> LedgerResult<Category> {
        let mut category = self
            .storage
            .categories
            .get(id)?
            .ok_or_else(|| LedgerError::category_not_found(id.to_string()))?;

        let before = category.clone();
        category.set_icon(icon.trim());
        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.categories.upsert(category.clone())?;
        self.storage.categories.save()?;

        self.storage.log_update(
            EntityType::Category,
            category.id.to_string(),
            Some(category.name.clone()),
            &before,
            &category,
            Some(format!("icon: {} -> {}", before.icon, category.icon)),
        )?;

        Ok(category)
    }

    /// Delete a category that nothing references
    pub fn delete(&self, id: CategoryId) -> LedgerResult<Category> {
        let category = self
            .storage
            .categories
            .get(id)?
            .ok_or_else(|| LedgerError::category_not_found(id.to_string()))?;

        let mut in_use = self
            .storage
            .transactions
            .count_by_category(&category.name, category.category_type)?;
        if category.category_type == TransactionType::Expense {
            in_use += self
                .storage
                .subscriptions
                .get_all()?
                .iter()
                .filter(|s| category.has_name(&s.category))
                .count();
        }

        if in_use > 0 {
            return Err(LedgerError::Conflict(format!(
                "Category '{}' is used by {} record(s)",
                category.name, in_use
            )));
        }

        self.storage.categories.delete(id)?;
        self.storage.categories.save()?;

        self.storage.log_delete(
            EntityType::Category,
            category.id.to_string(),
            Some(category.name.clone()),
            &category,
        )?;

        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerPaths;
    use crate::models::{Frequency, Money, Subscription, Transaction};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_duplicate_name_per_type() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage);

        service.create("Other", TransactionType::Expense, "Dots").unwrap();
        service.create("Other", TransactionType::Income, "Dots").unwrap();

        let err = service
            .create("other", TransactionType::Expense, "Dots")
            .unwrap_err();
        assert!(matches!(err, LedgerError::Duplicate { .. }));
    }

    #[test]
    fn test_seed_defaults_is_idempotent() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage);

        assert_eq!(service.seed_defaults().unwrap(), 12);
        assert_eq!(service.seed_defaults().unwrap(), 0);
        assert_eq!(service.list(Some(TransactionType::Income)).unwrap().len(), 5);
    }

    #[test]
    fn test_find_ambiguous_name_needs_type() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage);
        service.seed_defaults().unwrap();

        assert!(service.find("Other", None).is_err());
        let income = service
            .find("Other", Some(TransactionType::Income))
            .unwrap()
            .unwrap();
        assert_eq!(income.category_type, TransactionType::Income);

        let by_id = service.find(&income.id.to_string(), None).unwrap().unwrap();
        assert_eq!(by_id.id, income.id);
    }

    #[test]
    fn test_delete_referenced_category_conflicts() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage);
        let home = service.create("Home", TransactionType::Expense, "Home").unwrap();

        storage
            .transactions
            .upsert(Transaction::new(
                "Rent",
                Money::from_cents(80000),
                TransactionType::Expense,
                "Home",
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            ))
            .unwrap();

        let err = service.delete(home.id).unwrap_err();
        assert!(err.is_conflict());
        assert!(storage.categories.get(home.id).unwrap().is_some());
    }

    #[test]
    fn test_delete_category_used_by_subscription_conflicts() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage);
        let leisure = service
            .create("Leisure", TransactionType::Expense, "Gamepad2")
            .unwrap();

        storage
            .subscriptions
            .upsert(Subscription::new(
                "Netflix",
                Money::from_cents(1299),
                "Leisure",
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                Frequency::Monthly,
            ))
            .unwrap();

        assert!(service.delete(leisure.id).unwrap_err().is_conflict());
    }

    #[test]
    fn test_references_match_regardless_of_case() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage);
        let home = service.create("Home", TransactionType::Expense, "Home").unwrap();
        let leisure = service
            .create("Leisure", TransactionType::Expense, "Gamepad2")
            .unwrap();

        storage
            .transactions
            .upsert(Transaction::new(
                "Rent",
                Money::from_cents(80000),
                TransactionType::Expense,
                "home",
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            ))
            .unwrap();
        storage
            .subscriptions
            .upsert(Subscription::new(
                "Netflix",
                Money::from_cents(1299),
                " LEISURE",
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                Frequency::Monthly,
            ))
            .unwrap();

        assert!(service.delete(home.id).unwrap_err().is_conflict());
        assert!(service.delete(leisure.id).unwrap_err().is_conflict());
    }

    #[test]
    fn test_delete_and_icon() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage);
        let gifts = service.create("Gifts", TransactionType::Expense, "Gift").unwrap();

        let updated = service.set_icon(gifts.id, "Star").unwrap();
        assert_eq!(updated.icon, "Star");

        service.delete(gifts.id).unwrap();
        assert!(service.get(gifts.id).unwrap().is_none());
        assert!(service.delete(gifts.id).unwrap_err().is_not_found());
    }
}
