// Port Layer - Interfaces for external collaborators

pub mod connector; // Optional: build a handle from connection parameters
pub mod database_provider;
pub mod migration_runner;

// Re-exports
pub use connector::{ConnectionError, ConnectionParams, Connector};
pub use database_provider::{DatabaseProvider, DefaultDatabase, NoDefaultDatabase};
pub use migration_runner::{MigrationError, MigrationRunner};
