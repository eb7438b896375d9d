// Migration Task Configuration

use crate::port::ConnectionParams;
use std::path::{Path, PathBuf};

/// Resolved configuration of a migration task
///
/// Configuration callbacks receive this by `&mut` and may overwrite any field.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationTaskConfig<D> {
    /// Directory holding the migration scripts (required)
    pub directory: Option<PathBuf>,
    /// Handle used when no default database is consulted
    pub database: Option<D>,
    /// Table persisting the applied version
    pub table: Option<String>,
    /// Column persisting the applied version
    pub column: Option<String>,
}

impl<D> MigrationTaskConfig<D> {
    pub fn new() -> Self {
        Self {
            directory: None,
            database: None,
            table: None,
            column: None,
        }
    }

    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) -> &mut Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn set_database(&mut self, database: D) -> &mut Self {
        self.database = Some(database);
        self
    }

    pub fn set_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    pub fn set_column(&mut self, column: impl Into<String>) -> &mut Self {
        self.column = Some(column.into());
        self
    }

    /// Directory, if set and non-empty
    pub fn directory(&self) -> Option<&Path> {
        self.directory
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Overlay every value present in `options`
    pub fn apply_options(&mut self, options: MigrationTaskOptions<D>) {
        if let Some(directory) = options.directory {
            self.directory = Some(directory);
        }
        if let Some(database) = options.database {
            self.database = Some(database);
        }
        if let Some(table) = options.table {
            self.table = Some(table);
        }
        if let Some(column) = options.column {
            self.column = Some(column);
        }
    }
}

impl<D> Default for MigrationTaskConfig<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Options structure: every recognized key is optional
///
/// Values present here override positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationTaskOptions<D> {
    pub directory: Option<PathBuf>,
    pub database: Option<D>,
    pub table: Option<String>,
    pub column: Option<String>,
}

impl<D> MigrationTaskOptions<D> {
    pub fn new() -> Self {
        Self {
            directory: None,
            database: None,
            table: None,
            column: None,
        }
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn database(mut self, database: D) -> Self {
        self.database = Some(database);
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl<D> Default for MigrationTaskOptions<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// One positional construction argument
#[derive(Debug, Clone, PartialEq)]
pub enum TaskArg<D> {
    Directory(PathBuf),
    Database(D),
    Connection(ConnectionParams),
    Options(MigrationTaskOptions<D>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_directory_is_unset() {
        let mut config: MigrationTaskConfig<()> = MigrationTaskConfig::new();
        assert!(config.directory().is_none());

        config.set_directory("");
        assert!(config.directory().is_none());

        config.set_directory("migrations");
        assert_eq!(config.directory(), Some(Path::new("migrations")));
    }

    #[test]
    fn test_apply_options_overrides_only_present_keys() {
        let mut config = MigrationTaskConfig::new();
        config.set_directory("positional").set_database("db-a");

        config.apply_options(MigrationTaskOptions::new().database("db-b").table("schema"));

        assert_eq!(config.directory(), Some(Path::new("positional")));
        assert_eq!(config.database, Some("db-b"));
        assert_eq!(config.table.as_deref(), Some("schema"));
        assert!(config.column.is_none());
    }
}
