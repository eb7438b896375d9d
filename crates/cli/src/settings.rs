// Settings - file + environment layer
//
// Sources, lowest precedence first:
//   1. TOML file (optional, default `migrate-task.toml`)
//   2. MIGRATE_TASK_* environment variables

use anyhow::{Context, Result};
use migrate_task_core::domain::MigrationTaskOptions;
use migrate_task_core::port::ConnectionParams;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "migrate-task.toml";
pub const ENV_PREFIX: &str = "MIGRATE_TASK";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub directory: Option<PathBuf>,

    #[serde(default, alias = "db", alias = "database")]
    pub database_url: Option<String>,

    pub table: Option<String>,
    pub column: Option<String>,

    /// Extra driver options (busy_timeout, foreign_keys, ...)
    #[serde(default)]
    pub connection: BTreeMap<String, String>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        config
            .try_deserialize()
            .context("Invalid migrate-task settings")
    }

    /// Options layer for the migration task builder
    pub fn options<D>(&self) -> MigrationTaskOptions<D> {
        MigrationTaskOptions {
            directory: self.directory.clone(),
            database: None,
            table: self.table.clone(),
            column: self.column.clone(),
        }
    }

    /// Connection parameters for `url`, carrying the configured driver options
    pub fn connection_params(&self, url: &str) -> ConnectionParams {
        ConnectionParams::Url {
            url: url.to_string(),
            options: self.connection.clone(),
        }
    }
}
