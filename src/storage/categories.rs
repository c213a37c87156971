//! Category repository for JSON storage
//!
//! Manages loading and saving categories to categories.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::LedgerError;
use crate::models::{Category, CategoryId, TransactionType};

use super::file_io::{read_json, write_json_atomic};
use super::poisoned;

/// On-disk layout of categories.json
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CategoryData {
    pub categories: Vec<Category>,
}

fn sort_for_display(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        a.category_type
            .as_str()
            .cmp(b.category_type.as_str())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// Repository for category persistence
pub struct CategoryRepository {
    path: PathBuf,
    categories: RwLock<HashMap<CategoryId, Category>>,
}

impl CategoryRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            categories: RwLock::new(HashMap::new()),
        }
    }

    /// Load categories from disk
    pub fn load(&self) -> Result<(), LedgerError> {
        let file_data: CategoryData = read_json(&self.path)?;
        self.replace(file_data.categories)
    }

    /// Save categories to disk
    pub fn save(&self) -> Result<(), LedgerError> {
        let categories = self.get_all()?;
        self.persist(&categories)
    }

    pub(crate) fn persist(&self, categories: &[Category]) -> Result<(), LedgerError> {
        let mut sorted = categories.to_vec();
        sort_for_display(&mut sorted);
        write_json_atomic(&self.path, &CategoryData { categories: sorted })
    }

    pub(crate) fn replace(&self, categories: Vec<Category>) -> Result<(), LedgerError> {
        let map: HashMap<_, _> = categories.into_iter().map(|c| (c.id, c)).collect();
        let mut current = self.categories.write().map_err(poisoned)?;
        *current = map;
        Ok(())
    }

    pub fn get(&self, id: CategoryId) -> Result<Option<Category>, LedgerError> {
        let categories = self.categories.read().map_err(poisoned)?;
        Ok(categories.get(&id).cloned())
    }

    /// All categories, expense before income, then by name
    pub fn get_all(&self) -> Result<Vec<Category>, LedgerError> {
        let categories = self.categories.read().map_err(poisoned)?;
        let mut list: Vec<_> = categories.values().cloned().collect();
        sort_for_display(&mut list);
        Ok(list)
    }

    pub fn get_by_type(&self, kind: TransactionType) -> Result<Vec<Category>, LedgerError> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|c| c.category_type == kind)
            .collect())
    }

    /// Find a category by name within a type (case-insensitive)
    pub fn find_by_name(
        &self,
        kind: TransactionType,
        name: &str,
    ) -> Result<Option<Category>, LedgerError> {
        let categories = self.categories.read().map_err(poisoned)?;
        Ok(categories
            .values()
            .find(|c| c.category_type == kind && c.has_name(name))
            .cloned())
    }

    /// Insert or update a category
    pub fn upsert(&self, category: Category) -> Result<(), LedgerError> {
        let mut categories = self.categories.write().map_err(poisoned)?;
        categories.insert(category.id, category);
        Ok(())
    }

    pub fn delete(&self, id: CategoryId) -> Result<Option<Category>, LedgerError> {
        let mut categories = self.categories.write().map_err(poisoned)?;
        Ok(categories.remove(&id))
    }

    pub fn count(&self) -> Result<usize, LedgerError> {
        let categories = self.categories.read().map_err(poisoned)?;
        Ok(categories.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, CategoryRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = CategoryRepository::new(temp_dir.path().join("categories.json"));
        (temp_dir, repo)
    }

    #[test]
    fn test_find_by_name_is_scoped_to_type() {
        let (_temp_dir, repo) = create_test_repo();
        repo.upsert(Category::new("Other", TransactionType::Expense, "MoreHorizontal"))
            .unwrap();

        assert!(repo
            .find_by_name(TransactionType::Expense, "other")
            .unwrap()
            .is_some());
        assert!(repo
            .find_by_name(TransactionType::Income, "Other")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, repo) = create_test_repo();
        let salary = Category::new("Salary", TransactionType::Income, "Briefcase");
        let id = salary.id;
        repo.upsert(salary).unwrap();
        repo.upsert(Category::new("Car", TransactionType::Expense, "Car"))
            .unwrap();
        repo.save().unwrap();

        let reloaded = CategoryRepository::new(temp_dir.path().join("categories.json"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.count().unwrap(), 2);
        assert_eq!(reloaded.get(id).unwrap().unwrap().icon, "Briefcase");

        let all = reloaded.get_all().unwrap();
        assert_eq!(all[0].category_type, TransactionType::Expense);
    }

    #[test]
    fn test_delete() {
        let (_temp_dir, repo) = create_test_repo();
        let cat = Category::new("Gifts", TransactionType::Expense, "Gift");
        let id = cat.id;
        repo.upsert(cat).unwrap();

        assert!(repo.delete(id).unwrap().is_some());
        assert!(repo.delete(id).unwrap().is_none());
        assert_eq!(repo.count().unwrap(), 0);
    }
}
