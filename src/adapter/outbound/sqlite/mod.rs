//! SQLite persistence adapters.
//!
//! Provides the durable settlement ledger using Diesel ORM.

pub mod database;
pub mod ledger;

pub use database::connection::{create_pool, open, open_read_only, run_migrations, DbPool};
pub use ledger::SqliteLedger;
