//! Service layer for FinanceTracker
//!
//! Services sit on top of the storage layer and own validation, audit
//! logging and the operations that touch more than one row.

pub mod category;
pub mod recurring;
pub mod subscription;
pub mod transaction;

pub use category::CategoryService;
pub use recurring::{
    run_recurring_catch_up, CancelFlag, CatchUpReport, CycleIter, EntityFailure, RecurringEngine,
};
pub use subscription::{CreateSubscriptionInput, SubscriptionService, UpdateSubscriptionInput};
pub use transaction::{
    CreateTransactionInput, DeleteScope, EditScope, RecurrenceInput, TransactionFilter,
    TransactionService, UpdateOutcome, UpdateTransactionInput,
};
