//! Category CLI commands
//!
//! Implements CLI commands for category management.

use clap::Subcommand;

use crate::display::format_category_table;
use crate::error::{LedgerError, LedgerResult};
use crate::models::category::DEFAULT_ICON;
use crate::models::{Category, TransactionType};
use crate::services::CategoryService;
use crate::storage::Storage;

use super::parse_type;

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        /// Only income or only expense categories
        #[arg(short, long)]
        r#type: Option<String>,
    },

    /// Create a new category
    Add {
        /// Category name
        name: String,
        /// income or expense
        #[arg(short, long, default_value = "expense")]
        r#type: String,
        /// Icon name
        #[arg(short, long, default_value = DEFAULT_ICON)]
        icon: String,
    },

    /// Delete a category
    Delete {
        /// Category name or ID
        category: String,
        /// Disambiguates a name used by both types
        #[arg(short, long)]
        r#type: Option<String>,
    },

    /// Change a category's icon
    Icon {
        /// Category name or ID
        category: String,
        /// New icon name
        icon: String,
        #[arg(short, long)]
        r#type: Option<String>,
    },

    /// Add any missing default category
    Defaults,
}

/// Handle a category command
pub fn handle_category_command(storage: &Storage, cmd: CategoryCommands) -> LedgerResult<()> {
    let service = CategoryService::new(storage);

    match cmd {
        CategoryCommands::List { r#type } => {
            let filter = optional_type(r#type.as_deref())?;
            let categories = service.list(filter)?;
            println!("{}", format_category_table(&categories));
        }

        CategoryCommands::Add {
            name,
            r#type,
            icon,
        } => {
            let category = service.create(&name, parse_type(&r#type)?, &icon)?;
            println!(
                "Created {} category: {} ({})",
                category.category_type.as_str(),
                category.name,
                category.id
            );
        }

        CategoryCommands::Delete { category, r#type } => {
            let found = resolve(&service, &category, r#type.as_deref())?;
            let deleted = service.delete(found.id)?;
            println!("Deleted category: {}", deleted.name);
        }

        CategoryCommands::Icon {
            category,
            icon,
            r#type,
        } => {
            let found = resolve(&service, &category, r#type.as_deref())?;
            let updated = service.set_icon(found.id, &icon)?;
            println!("Icon for '{}' set to {}", updated.name, updated.icon);
        }

        CategoryCommands::Defaults => {
            let added = service.seed_defaults()?;
            if added == 0 {
                println!("All default categories already exist.");
            } else {
                println!("Added {} default categories.", added);
            }
        }
    }

    Ok(())
}

fn optional_type(value: Option<&str>) -> LedgerResult<Option<TransactionType>> {
    value.map(parse_type).transpose()
}

fn resolve(
    service: &CategoryService,
    identifier: &str,
    category_type: Option<&str>,
) -> LedgerResult<Category> {
    service
        .find(identifier, optional_type(category_type)?)?
        .ok_or_else(|| LedgerError::category_not_found(identifier))
}
