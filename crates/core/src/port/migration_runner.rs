// Migration Runner Port
// Abstraction over the engine that actually applies migration files

use crate::domain::MigrationOptions;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Failed to read migrations: {0}")]
    Source(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unknown target version: {0}")]
    UnknownTarget(i64),

    #[error("Database is at version {0}, which has no migration file")]
    MissingFile(i64),

    #[error("Migration {0} has no down script")]
    Irreversible(i64),

    #[error("Migration {version} failed: {message}")]
    Apply { version: i64, message: String },
}

/// Migration Runner trait
///
/// Implementations:
/// - SqliteMigrationRunner: applies sqlx-style migration files to SQLite
#[async_trait]
pub trait MigrationRunner<D>: Send + Sync {
    /// Migrate `database` using the scripts found in `directory`
    ///
    /// # Errors
    /// Any engine failure. Callers propagate it without translation.
    async fn run(
        &self,
        database: &D,
        directory: &Path,
        options: &MigrationOptions,
    ) -> Result<(), MigrationError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// One recorded `run` call
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRun<D> {
        pub database: D,
        pub directory: PathBuf,
        pub options: MigrationOptions,
    }

    /// Mock runner that records every call
    pub struct RecordingMigrationRunner<D> {
        calls: Arc<Mutex<Vec<RecordedRun<D>>>>,
        failure: Option<String>,
    }

    impl<D> RecordingMigrationRunner<D> {
        pub fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                failure: None,
            }
        }

        /// Every call fails with `MigrationError::Database(message)`
        pub fn new_fail(message: impl Into<String>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                failure: Some(message.into()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl<D: Clone> RecordingMigrationRunner<D> {
        pub fn calls(&self) -> Vec<RecordedRun<D>> {
            self.calls.lock().unwrap().clone()
        }

        pub fn last_call(&self) -> Option<RecordedRun<D>> {
            self.calls.lock().unwrap().last().cloned()
        }
    }

    impl<D> Default for RecordingMigrationRunner<D> {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl<D> MigrationRunner<D> for RecordingMigrationRunner<D>
    where
        D: Clone + Send + Sync,
    {
        async fn run(
            &self,
            database: &D,
            directory: &Path,
            options: &MigrationOptions,
        ) -> Result<(), MigrationError> {
            self.calls.lock().unwrap().push(RecordedRun {
                database: database.clone(),
                directory: directory.to_path_buf(),
                options: options.clone(),
            });

            match &self.failure {
                Some(message) => Err(MigrationError::Database(message.clone())),
                None => Ok(()),
            }
        }
    }
}
