mod error;
mod queries;
mod store;

pub use error::*;
pub use queries::*;
pub use store::*;

/// SQL migration for the accounts, entries and transfers tables
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
