//! Migration Task Adapter
//!
//! Registers two tasks on a [`TaskGraph`]:
//! - `environment`: empty hook; consumers enhance it with setup actions
//! - `migrate[version]`: depends on `environment`, resolves the database and
//!   hands `(database, directory, options)` to the [`MigrationRunner`]

mod builder;

#[cfg(test)]
mod tests;

pub use builder::MigrationTaskBuilder;

use crate::application::task_graph::{TaskAction, TaskDefinition, TaskGraph};
use crate::domain::{MigrationOptions, MigrationTaskConfig, TaskArgs};
use crate::error::{Result, TaskError};
use crate::port::{DatabaseProvider, MigrationRunner};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const ENVIRONMENT_TASK: &str = "environment";
pub const MIGRATE_TASK: &str = "migrate";
pub const VERSION_PARAM: &str = "version";

const ENVIRONMENT_DESCRIPTION: &str = "Sets up the environment for the migration task";
const MIGRATE_DESCRIPTION: &str = "Migrates the database to [version] or the latest version";

/// Configured migration task
///
/// Built and validated by [`MigrationTaskBuilder`]; read-only afterwards.
pub struct MigrationTask<D> {
    directory: PathBuf,
    database: Option<D>,
    table: Option<String>,
    column: Option<String>,
    runner: Arc<dyn MigrationRunner<D>>,
    fallback: Arc<dyn DatabaseProvider<D>>,
}

impl<D> MigrationTask<D>
where
    D: Clone + Send + Sync + 'static,
{
    pub fn builder(runner: Arc<dyn MigrationRunner<D>>) -> MigrationTaskBuilder<D> {
        MigrationTaskBuilder::new(runner)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn database(&self) -> Option<&D> {
        self.database.as_ref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Snapshot of the resolved configuration
    pub fn config(&self) -> MigrationTaskConfig<D> {
        MigrationTaskConfig {
            directory: Some(self.directory.clone()),
            database: self.database.clone(),
            table: self.table.clone(),
            column: self.column.clone(),
        }
    }

    /// Register `environment` and `migrate` on `graph`
    ///
    /// Safe to call when `environment` already exists: its actions are kept.
    pub fn define_tasks(self: &Arc<Self>, graph: &mut TaskGraph) {
        graph.define(TaskDefinition::new(ENVIRONMENT_TASK).describe(ENVIRONMENT_DESCRIPTION));

        graph.define(
            TaskDefinition::new(MIGRATE_TASK)
                .describe(MIGRATE_DESCRIPTION)
                .depends_on(ENVIRONMENT_TASK)
                .param(VERSION_PARAM)
                .action(Arc::new(MigrateAction {
                    task: Arc::clone(self),
                })),
        );

        debug!(directory = %self.directory.display(), "Migration tasks defined");
    }

    /// Instance handle first, then the registered default
    pub fn resolve_database(&self) -> Result<D> {
        if let Some(database) = &self.database {
            return Ok(database.clone());
        }

        match self.fallback.database() {
            Some(database) => {
                debug!("Using default database");
                Ok(database)
            }
            None => Err(TaskError::MissingDatabase),
        }
    }

    /// Runner options: only keys that carry a value
    pub fn migration_options(&self, version: Option<i64>) -> MigrationOptions {
        MigrationOptions::new()
            .table(self.table.as_deref())
            .column(self.column.as_deref())
            .target(version)
    }

    /// Migrate to `version`, or to the latest version when `None`
    pub async fn migrate(&self, version: Option<i64>) -> Result<()> {
        let database = self.resolve_database()?;
        let options = self.migration_options(version);

        info!(
            directory = %self.directory.display(),
            target = ?options.target,
            table = ?options.table,
            column = ?options.column,
            "Running migrations"
        );

        self.runner
            .run(&database, &self.directory, &options)
            .await?;

        info!(directory = %self.directory.display(), "Migrations finished");
        Ok(())
    }
}

impl<D: fmt::Debug> fmt::Debug for MigrationTask<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationTask")
            .field("directory", &self.directory)
            .field("database", &self.database)
            .field("table", &self.table)
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// Parse the optional `version` task argument
pub fn parse_version(arg: Option<&str>) -> Result<Option<i64>> {
    match arg.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<i64>()
            .map(Some)
            .map_err(|_| TaskError::Config(format!("Invalid migration version: {:?}", v))),
    }
}

/// Body of the `migrate` task
struct MigrateAction<D> {
    task: Arc<MigrationTask<D>>,
}

#[async_trait]
impl<D> TaskAction for MigrateAction<D>
where
    D: Clone + Send + Sync + 'static,
{
    async fn execute(&self, args: &TaskArgs) -> Result<()> {
        let version = parse_version(args.get(VERSION_PARAM))?;
        self.task.migrate(version).await
    }
}
