use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use financetracker::cli::{
    handle_backup_command, handle_category_command, handle_subscription_command,
    handle_transaction_command, BackupCommands, CategoryCommands, SubscriptionCommands,
    TransactionCommands,
};
use financetracker::config::{LedgerPaths, Settings};
use financetracker::display::{
    format_audit_entries, format_catch_up_report, format_transaction_table,
};
use financetracker::reports::{recent_transactions, LedgerSummary, SubscriptionSummary};
use financetracker::services::run_recurring_catch_up;
use financetracker::storage::init::{initialize_storage, needs_initialization};
use financetracker::storage::Storage;

/// Environment variable holding the log filter
const LOG_ENV: &str = "FINANCETRACKER_LOG";

#[derive(Parser)]
#[command(
    name = "financetracker",
    version,
    about = "Personal finance ledger with recurring transactions and signed backups",
    long_about = "FinanceTracker keeps a ledger of income and expenses, generates the \
                  occurrences of recurring transactions and subscriptions that fell due \
                  since the last run, and keeps signed JSON backups of everything."
)]
struct Cli {
    /// Skip the automatic recurring catch-up for this invocation
    #[arg(long, global = true)]
    no_catch_up: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and default categories
    Init,

    /// Show current configuration and paths
    Config,

    /// Generate every recurring occurrence due up to today
    #[command(name = "catch-up")]
    CatchUp,

    /// Balance, this month's figures and upcoming subscription payments
    Stats {
        /// Number of recent transactions to show
        #[arg(short, long, default_value = "5")]
        recent: usize,
    },

    /// Show the most recent audit log entries
    Audit {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Transaction management commands
    #[command(subcommand, alias = "txn")]
    Transaction(TransactionCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Subscription management commands
    #[command(subcommand, alias = "sub")]
    Subscription(SubscriptionCommands),

    /// Backup, export and import commands
    #[command(subcommand)]
    Backup(BackupCommands),
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| EnvFilter::new("financetracker=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    if let Some(Commands::Init) = cli.command {
        println!("Initializing FinanceTracker at: {}", paths.base_dir().display());
        initialize_storage(&paths)?;
        settings.save(&paths)?;
        println!("Initialization complete!");
        println!();
        println!("Default income and expense categories have been created.");
        println!("Run 'financetracker category list' to see them.");
        return Ok(());
    }

    if needs_initialization(&paths) {
        info!(path = %paths.base_dir().display(), "first run, initializing data directory");
        initialize_storage(&paths)?;
    }

    // Initialize storage
    let storage = Storage::new(paths.clone())?;
    storage.load_all()?;

    let today = chrono::Local::now().date_naive();

    let explicit_catch_up = matches!(cli.command, Some(Commands::CatchUp));
    if settings.auto_catch_up && !cli.no_catch_up && !explicit_catch_up {
        match run_recurring_catch_up(&storage, today) {
            Ok(report) => {
                if report.inserted() > 0 || !report.is_clean() {
                    eprint!("{}", format_catch_up_report(&report));
                }
            }
            Err(e) => warn!(error = %e, "automatic catch-up failed"),
        }
    }

    let currency = settings.currency_symbol.as_str();

    match cli.command {
        Some(Commands::Init) => {}
        Some(Commands::Config) => {
            println!("FinanceTracker Configuration");
            println!("============================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Currency:       {}", settings.currency_symbol);
            println!("  Date format:    {}", settings.date_format);
            println!("  Auto catch-up:  {}", settings.auto_catch_up);
            println!("  Max backups:    {}", settings.backup.max_backups);
        }
        Some(Commands::CatchUp) => {
            let report = run_recurring_catch_up(&storage, today)?;
            print!("{}", format_catch_up_report(&report));
        }
        Some(Commands::Stats { recent }) => {
            println!("{}", LedgerSummary::all_time(&storage)?.format_terminal(currency));
            println!("{}", LedgerSummary::for_month(&storage, today)?.format_terminal(currency));
            println!("{}", SubscriptionSummary::generate(&storage)?.format_terminal(currency));
            println!("Recent transactions:");
            println!(
                "{}",
                format_transaction_table(&recent_transactions(&storage, recent)?, currency)
            );
        }
        Some(Commands::Audit { limit }) => {
            let entries = storage.audit().read_recent(limit)?;
            println!("{}", format_audit_entries(&entries).trim_end());
        }
        Some(Commands::Transaction(cmd)) => {
            handle_transaction_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Category(cmd)) => {
            handle_category_command(&storage, cmd)?;
        }
        Some(Commands::Subscription(cmd)) => {
            handle_subscription_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&storage, &settings, cmd)?;
        }
        None => {
            println!("FinanceTracker - personal finance ledger");
            println!();
            println!("Run 'financetracker --help' for usage information.");
        }
    }

    Ok(())
}
