// Domain Layer - Configuration values and task arguments

pub mod config;
pub mod options;
pub mod task;

// Re-exports
pub use config::{MigrationTaskConfig, MigrationTaskOptions, TaskArg};
pub use options::MigrationOptions;
pub use task::{TaskArgs, TaskInfo};
