//! Backup listing

use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use crate::backup::BackupInfo;

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "Backup")]
    filename: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Size")]
    size: String,
}

pub fn format_backup_table(backups: &[BackupInfo]) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let rows = backups.iter().map(|b| BackupRow {
        filename: b.filename.clone(),
        created: b
            .created_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string()),
        size: format_size(b.size_bytes),
    });

    let mut table = Table::new(rows);
    table
        .with(Style::psql())
        .modify(Columns::single(2), Alignment::right());
    table.to_string()
}

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}
