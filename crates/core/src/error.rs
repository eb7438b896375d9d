// Central Error Type for the Task Layer

use crate::port::{ConnectionError, MigrationError};
use thiserror::Error;

/// Remediation text for an unresolvable database handle
pub const MISSING_DATABASE_MESSAGE: &str = "No database has been defined. Either register a \
     default database in your environment task or set the database on the migration task \
     definition.";

/// Task-level error type
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{}", MISSING_DATABASE_MESSAGE)]
    MissingDatabase,

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Engine failures pass through untouched
    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Circular dependency: {0}")]
    CircularDependency(String),

    #[error("Task {task} failed: {message}")]
    Execution { task: String, message: String },
}

/// Result type alias using TaskError
pub type Result<T> = std::result::Result<T, TaskError>;
