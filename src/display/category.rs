//! Category display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::Category;

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    category_type: String,
    #[tabled(rename = "Icon")]
    icon: String,
    #[tabled(rename = "ID")]
    id: String,
}

/// Format categories as a table, grouped by type through their ordering
pub fn format_category_table(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories found.\n\nRun 'financetracker init' to create default categories."
            .to_string();
    }

    let rows = categories.iter().map(|c| CategoryRow {
        name: c.name.clone(),
        category_type: c.category_type.to_string(),
        icon: c.icon.clone(),
        id: c.id.to_string(),
    });

    Table::new(rows).with(Style::psql()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_categories;

    #[test]
    fn test_category_table() {
        let output = format_category_table(&default_categories());
        assert!(output.contains("Groceries"));
        assert!(output.contains("Income"));
        assert!(output.contains("ShoppingCart"));
    }

    #[test]
    fn test_empty_hint() {
        assert!(format_category_table(&[]).contains("financetracker init"));
    }
}
