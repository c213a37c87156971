//! Storage initialization
//!
//! First-run setup: directories, settings file and default categories.

use tracing::info;

use crate::config::{LedgerPaths, Settings};
use crate::error::LedgerError;
use crate::models::default_categories;

use super::categories::CategoryData;
use super::file_io::write_json_atomic;

/// Initialize storage for a fresh installation
///
/// Existing files are left untouched, so running this twice is harmless.
pub fn initialize_storage(paths: &LedgerPaths) -> Result<(), LedgerError> {
    paths.ensure_directories()?;

    if !paths.categories_file().exists() {
        let data = CategoryData {
            categories: default_categories(),
        };
        write_json_atomic(paths.categories_file(), &data)?;
        info!(count = data.categories.len(), "seeded default categories");
    }

    if !paths.settings_file().exists() {
        Settings::default().save(paths)?;
    }

    Ok(())
}

/// Check if storage needs initialization
pub fn needs_initialization(paths: &LedgerPaths) -> bool {
    !paths.is_initialized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, TransactionType};
    use tempfile::TempDir;

    #[test]
    fn test_initialize_storage() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert!(needs_initialization(&paths));
        initialize_storage(&paths).unwrap();
        assert!(!needs_initialization(&paths));

        let content = std::fs::read_to_string(paths.categories_file()).unwrap();
        let data: CategoryData = serde_json::from_str(&content).unwrap();
        assert_eq!(data.categories.len(), 12);
        assert!(data
            .categories
            .iter()
            .any(|c| c.name == "Salary" && c.category_type == TransactionType::Income));
    }

    #[test]
    fn test_doesnt_overwrite_existing() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        initialize_storage(&paths).unwrap();

        let custom = CategoryData {
            categories: vec![Category::new("Custom", TransactionType::Expense, "Star")],
        };
        write_json_atomic(paths.categories_file(), &custom).unwrap();

        initialize_storage(&paths).unwrap();

        let content = std::fs::read_to_string(paths.categories_file()).unwrap();
        let data: CategoryData = serde_json::from_str(&content).unwrap();
        assert_eq!(data.categories.len(), 1);
        assert_eq!(data.categories[0].name, "Custom");
    }
}
