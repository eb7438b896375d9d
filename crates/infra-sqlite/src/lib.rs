// Migrate Task Infrastructure - SQLite Adapter
// Implements: Connector, MigrationRunner

mod connection;
mod migration;

pub use connection::{create_pool, PoolSettings, SqliteConnector};
pub use migration::{SqliteMigrationRunner, DEFAULT_COLUMN, DEFAULT_TABLE};

// Handle type used by the adapters above
pub use sqlx::SqlitePool;

// Note: sqlx::Error is converted to the port error types by helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for them here)
