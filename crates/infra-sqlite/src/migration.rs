// Migration Runner
//
// Scripts are discovered and parsed by sqlx (`<version>_<name>.sql`, or
// `.up.sql` / `.down.sql` pairs). This runner only decides which of them to
// apply and records the applied version in a single-row version table.

use async_trait::async_trait;
use migrate_task_core::domain::MigrationOptions;
use migrate_task_core::port::{MigrationError, MigrationRunner};
use sqlx::migrate::{Migration, MigrationSource};
use sqlx::{Executor, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_TABLE: &str = "schema_info";
pub const DEFAULT_COLUMN: &str = "version";

/// Applies a directory of migrations to SQLite
#[derive(Debug, Default, Clone)]
pub struct SqliteMigrationRunner;

impl SqliteMigrationRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MigrationRunner<SqlitePool> for SqliteMigrationRunner {
    async fn run(
        &self,
        pool: &SqlitePool,
        directory: &Path,
        options: &MigrationOptions,
    ) -> Result<(), MigrationError> {
        let tracker = VersionTable::new(
            options.table.as_deref().unwrap_or(DEFAULT_TABLE),
            options.column.as_deref().unwrap_or(DEFAULT_COLUMN),
        )?;
        let set = MigrationSet::load(directory).await?;

        tracker.ensure(pool).await?;
        let current = tracker.current(pool).await?;
        set.check_current(current)?;

        let target = match options.target {
            Some(target) => set.check_target(target)?,
            None => set.latest(),
        };

        info!(
            table = %tracker.table,
            column = %tracker.column,
            current,
            target,
            "Current schema version"
        );

        if target > current {
            for migration in set.ups_between(current, target) {
                info!(
                    version = migration.version,
                    description = %migration.description,
                    "Applying migration"
                );
                apply_migration(
                    pool,
                    &tracker,
                    migration.version,
                    &migration.sql,
                    migration.version,
                )
                .await?;
            }
        } else if target < current {
            let reverts = set.reverts_between(target, current)?;
            for (up, down) in reverts {
                let previous = set.previous(up.version);
                info!(
                    version = up.version,
                    description = %up.description,
                    "Reverting migration"
                );
                apply_migration(pool, &tracker, up.version, &down.sql, previous).await?;
            }
        } else {
            info!("No migrations needed, already at target version");
            return Ok(());
        }

        info!(version = target, "All migrations applied successfully");
        Ok(())
    }
}

fn db_error(e: sqlx::Error) -> MigrationError {
    MigrationError::Database(e.to_string())
}

/// Validated table/column pair
struct VersionTable {
    table: String,
    column: String,
}

impl VersionTable {
    fn new(table: &str, column: &str) -> Result<Self, MigrationError> {
        Ok(Self {
            table: identifier(table)?,
            column: identifier(column)?,
        })
    }

    /// Create the table with a single zero row if needed
    async fn ensure(&self, pool: &SqlitePool) -> Result<(), MigrationError> {
        let create = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\"{}\" INTEGER NOT NULL DEFAULT 0)",
            self.table, self.column
        );
        sqlx::query(&create)
            .execute(pool)
            .await
            .map_err(db_error)?;

        let count_sql = format!("SELECT COUNT(*) FROM \"{}\"", self.table);
        let rows: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(pool)
            .await
            .map_err(db_error)?;

        if rows == 0 {
            let insert = format!("INSERT INTO \"{}\" (\"{}\") VALUES (0)", self.table, self.column);
            sqlx::query(&insert)
                .execute(pool)
                .await
                .map_err(db_error)?;
        }

        Ok(())
    }

    async fn current(&self, pool: &SqlitePool) -> Result<i64, MigrationError> {
        let select = format!(
            "SELECT \"{}\" FROM \"{}\" LIMIT 1",
            self.column, self.table
        );
        let version: Option<i64> = sqlx::query_scalar(&select)
            .fetch_optional(pool)
            .await
            .map_err(db_error)?;
        Ok(version.unwrap_or(0))
    }

    fn update_sql(&self) -> String {
        format!("UPDATE \"{}\" SET \"{}\" = ?", self.table, self.column)
    }
}

/// SQL identifiers are limited to `[A-Za-z_][A-Za-z0-9_]*`
fn identifier(name: &str) -> Result<String, MigrationError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(name.to_string())
    } else {
        Err(MigrationError::InvalidIdentifier(name.to_string()))
    }
}

/// Migrations resolved from one directory
struct MigrationSet {
    ups: Vec<Migration>,
    downs: Vec<Migration>,
}

impl MigrationSet {
    async fn load(directory: &Path) -> Result<Self, MigrationError> {
        let resolved = directory
            .resolve()
            .await
            .map_err(|e| MigrationError::Source(format!("{}: {}", directory.display(), e)))?;

        let (mut downs, mut ups): (Vec<_>, Vec<_>) = resolved
            .into_iter()
            .partition(|m| m.migration_type.is_down_migration());
        ups.sort_by_key(|m| m.version);
        downs.sort_by_key(|m| m.version);

        debug!(
            directory = %directory.display(),
            up = ups.len(),
            down = downs.len(),
            "Resolved migrations"
        );
        Ok(Self { ups, downs })
    }

    fn latest(&self) -> i64 {
        self.ups.last().map(|m| m.version).unwrap_or(0)
    }

    fn contains(&self, version: i64) -> bool {
        self.ups.iter().any(|m| m.version == version)
    }

    /// Target must be 0 or the version of an existing migration
    fn check_target(&self, target: i64) -> Result<i64, MigrationError> {
        if target == 0 || self.contains(target) {
            Ok(target)
        } else {
            Err(MigrationError::UnknownTarget(target))
        }
    }

    fn check_current(&self, current: i64) -> Result<(), MigrationError> {
        if current == 0 || self.contains(current) {
            Ok(())
        } else {
            Err(MigrationError::MissingFile(current))
        }
    }

    /// Up migrations in `(from, to]`, ascending
    fn ups_between(&self, from: i64, to: i64) -> impl Iterator<Item = &Migration> {
        self.ups
            .iter()
            .filter(move |m| m.version > from && m.version <= to)
    }

    /// Applied migrations in `(to, from]` with their down scripts, descending
    ///
    /// Fails before anything runs if one of them cannot be reverted.
    fn reverts_between(
        &self,
        to: i64,
        from: i64,
    ) -> Result<Vec<(&Migration, &Migration)>, MigrationError> {
        self.ups
            .iter()
            .rev()
            .filter(|m| m.version > to && m.version <= from)
            .map(|up| {
                self.downs
                    .iter()
                    .find(|down| down.version == up.version)
                    .map(|down| (up, down))
                    .ok_or(MigrationError::Irreversible(up.version))
            })
            .collect()
    }

    /// Version recorded after reverting `version`
    fn previous(&self, version: i64) -> i64 {
        self.ups
            .iter()
            .map(|m| m.version)
            .filter(|v| *v < version)
            .max()
            .unwrap_or(0)
    }
}

/// Apply a single migration script and record `new_version` in one transaction
async fn apply_migration(
    pool: &SqlitePool,
    tracker: &VersionTable,
    version: i64,
    sql: &str,
    new_version: i64,
) -> Result<(), MigrationError> {
    let failed = |e: sqlx::Error| MigrationError::Apply {
        version,
        message: e.to_string(),
    };

    let mut tx = pool.begin().await.map_err(failed)?;

    // Whole script at once; sqlite parses triggers and quoted ';' itself
    (&mut *tx)
        .execute(sqlx::raw_sql(sql))
        .await
        .map_err(failed)?;

    sqlx::query(&tracker.update_sql())
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;

    tx.commit().await.map_err(failed)?;
    Ok(())
}
