//! Category model
//!
//! Categories are labels scoped to a transaction type. Transactions refer to
//! them by name, so a name must be unique within its type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::CategoryId;
use super::transaction::TransactionType;

/// Icon used when none is given
pub const DEFAULT_ICON: &str = "MoreHorizontal";

/// A transaction category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,

    /// Category name
    pub name: String,

    /// Which kind of transaction this category labels
    #[serde(rename = "type")]
    pub category_type: TransactionType,

    /// Icon name shown next to the category
    #[serde(default = "default_icon")]
    pub icon: String,

    /// When the category was created
    pub created_at: DateTime<Utc>,

    /// When the category was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

impl Category {
    /// Create a new category
    pub fn new(
        name: impl Into<String>,
        category_type: TransactionType,
        icon: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            name: name.into(),
            category_type,
            icon: icon.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Change the icon
    pub fn set_icon(&mut self, icon: impl Into<String>) {
        self.icon = icon.into();
        self.updated_at = Utc::now();
    }

    /// Case-insensitive name comparison used for uniqueness checks
    pub fn has_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }

    /// Validate the category
    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        if self.name.trim().is_empty() {
            return Err(CategoryValidationError::EmptyName);
        }

        if self.name.len() > 50 {
            return Err(CategoryValidationError::NameTooLong(self.name.len()));
        }

        if self.icon.trim().is_empty() {
            return Err(CategoryValidationError::EmptyIcon);
        }

        Ok(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Categories seeded into a fresh ledger
pub fn default_categories() -> Vec<Category> {
    use TransactionType::{Expense, Income};

    [
        ("Groceries", Expense, "ShoppingCart"),
        ("Transport", Expense, "Car"),
        ("Leisure", Expense, "Gamepad2"),
        ("Home", Expense, "Home"),
        ("Health", Expense, "Heart"),
        ("Shopping", Expense, "ShoppingBag"),
        ("Other", Expense, DEFAULT_ICON),
        ("Salary", Income, "Briefcase"),
        ("Freelance", Income, "Laptop"),
        ("Investments", Income, "TrendingUp"),
        ("Bonus", Income, "Gift"),
        ("Other", Income, DEFAULT_ICON),
    ]
    .into_iter()
    .map(|(name, kind, icon)| Category::new(name, kind, icon))
    .collect()
}

/// Validation errors for categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryValidationError {
    EmptyName,
    NameTooLong(usize),
    EmptyIcon,
}

impl fmt::Display for CategoryValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Category name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Category name too long ({} chars, max 50)", len)
            }
            Self::EmptyIcon => write!(f, "Category icon cannot be empty"),
        }
    }
}

impl std::error::Error for CategoryValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category() {
        let category = Category::new("Rent", TransactionType::Expense, "Home");
        assert_eq!(category.name, "Rent");
        assert_eq!(category.category_type, TransactionType::Expense);
        assert_eq!(category.icon, "Home");
    }

    #[test]
    fn test_validation() {
        let mut category = Category::new("Valid", TransactionType::Income, "Gift");
        assert!(category.validate().is_ok());

        category.name = String::new();
        assert_eq!(category.validate(), Err(CategoryValidationError::EmptyName));

        category.name = "a".repeat(51);
        assert!(matches!(
            category.validate(),
            Err(CategoryValidationError::NameTooLong(51))
        ));
    }

    #[test]
    fn test_defaults_are_unique_per_type() {
        let defaults = default_categories();
        assert_eq!(defaults.len(), 12);
        for (i, a) in defaults.iter().enumerate() {
            for b in defaults.iter().skip(i + 1) {
                assert!(!(a.category_type == b.category_type && a.has_name(&b.name)));
            }
        }
    }

    #[test]
    fn test_missing_icon_defaults() {
        let json = serde_json::json!({
            "id": CategoryId::new(),
            "name": "Gifts",
            "type": "expense",
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });
        let category: Category = serde_json::from_value(json).unwrap();
        assert_eq!(category.icon, DEFAULT_ICON);
    }
}
