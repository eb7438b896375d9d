// Migration Task Builder
//
// Precedence, lowest first:
//   1. positional arguments (first value of each kind wins)
//   2. options (later options override earlier ones)
//   3. configuration callbacks (in order)
// Connection parameters are opened after validation, and only if no
// database was set by any of the above.

use super::MigrationTask;
use crate::application::task_graph::TaskGraph;
use crate::domain::{MigrationTaskConfig, MigrationTaskOptions, TaskArg};
use crate::error::{Result, TaskError};
use crate::port::{
    ConnectionParams, Connector, DatabaseProvider, MigrationRunner, NoDefaultDatabase,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

type ConfigureFn<D> = Box<dyn FnOnce(&mut MigrationTaskConfig<D>) + Send>;

/// Builder for [`MigrationTask`]
pub struct MigrationTaskBuilder<D> {
    runner: Arc<dyn MigrationRunner<D>>,
    fallback: Arc<dyn DatabaseProvider<D>>,
    connector: Option<Arc<dyn Connector<D>>>,
    positional: MigrationTaskConfig<D>,
    connection: Option<ConnectionParams>,
    options: Vec<MigrationTaskOptions<D>>,
    callbacks: Vec<ConfigureFn<D>>,
}

impl<D> MigrationTaskBuilder<D>
where
    D: Clone + Send + Sync + 'static,
{
    pub fn new(runner: Arc<dyn MigrationRunner<D>>) -> Self {
        Self {
            runner,
            fallback: Arc::new(NoDefaultDatabase),
            connector: None,
            positional: MigrationTaskConfig::new(),
            connection: None,
            options: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    /// Positional argument; options are pulled out wherever they appear
    pub fn arg(mut self, arg: TaskArg<D>) -> Self {
        match arg {
            TaskArg::Directory(directory) => {
                if self.positional.directory.is_none() {
                    self.positional.directory = Some(directory);
                }
            }
            TaskArg::Database(database) => {
                if self.positional.database.is_none() {
                    self.positional.database = Some(database);
                }
            }
            TaskArg::Connection(params) => {
                if self.connection.is_none() {
                    self.connection = Some(params);
                }
            }
            TaskArg::Options(options) => self.options.push(options),
        }
        self
    }

    pub fn args(self, args: impl IntoIterator<Item = TaskArg<D>>) -> Self {
        args.into_iter().fold(self, Self::arg)
    }

    /// Positional directory (ignored if one was already given)
    pub fn directory(self, directory: impl Into<PathBuf>) -> Self {
        self.arg(TaskArg::Directory(directory.into()))
    }

    /// Positional database handle (ignored if one was already given)
    pub fn database(self, database: D) -> Self {
        self.arg(TaskArg::Database(database))
    }

    /// Connection parameters, opened at build time when no handle is given
    pub fn connection(self, params: ConnectionParams) -> Self {
        self.arg(TaskArg::Connection(params))
    }

    pub fn options(self, options: MigrationTaskOptions<D>) -> Self {
        self.arg(TaskArg::Options(options))
    }

    /// Mutate the configuration after positional arguments and options
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut MigrationTaskConfig<D>) + Send + 'static,
    {
        self.callbacks.push(Box::new(f));
        self
    }

    /// Default database consulted when the task has no handle of its own
    pub fn fallback(mut self, provider: Arc<dyn DatabaseProvider<D>>) -> Self {
        self.fallback = provider;
        self
    }

    pub fn connector(mut self, connector: Arc<dyn Connector<D>>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Resolve and validate the configuration
    ///
    /// # Errors
    /// - TaskError::Config if no directory is set, or connection parameters
    ///   need opening and no connector is configured
    /// - TaskError::Connection if the connector fails (only reached once the
    ///   configuration is valid)
    pub async fn build(self) -> Result<MigrationTask<D>> {
        let mut config = self.positional;
        for options in self.options {
            config.apply_options(options);
        }

        for callback in self.callbacks {
            callback(&mut config);
        }

        let directory = config
            .directory()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                TaskError::Config("Migration directory 'directory' must be defined".to_string())
            })?;

        match self.connection {
            Some(params) if config.database.is_none() => {
                let connector = self.connector.ok_or_else(|| {
                    TaskError::Config(
                        "Connection parameters given but no connector is configured".to_string(),
                    )
                })?;
                info!(kind = connection_kind(&params), "Opening database connection");
                config.database = Some(connector.connect(&params).await?);
            }
            Some(_) => {
                debug!("Database handle given, connection parameters ignored");
            }
            None => {}
        }

        Ok(MigrationTask {
            directory,
            database: config.database,
            table: config.table,
            column: config.column,
            runner: self.runner,
            fallback: self.fallback,
        })
    }

    /// Build, then register the tasks on `graph`
    ///
    /// Nothing is registered when the build fails.
    pub async fn install(self, graph: &mut TaskGraph) -> Result<Arc<MigrationTask<D>>> {
        let task = Arc::new(self.build().await?);
        task.define_tasks(graph);
        Ok(task)
    }
}

fn connection_kind(params: &ConnectionParams) -> &'static str {
    match params {
        ConnectionParams::Url { .. } => "url",
        ConnectionParams::Map(_) => "map",
    }
}
