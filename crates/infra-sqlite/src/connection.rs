// SQLite Connection Pool Setup

use async_trait::async_trait;
use migrate_task_core::port::{ConnectionError, ConnectionParams, Connector};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Pool tuning accepted as connection options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub create_if_missing: bool,
    pub foreign_keys: bool,
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            foreign_keys: true,
            busy_timeout: Duration::from_secs(5),
            max_connections: 10,
        }
    }
}

impl PoolSettings {
    /// Parse driver options; unknown keys are rejected
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self, ConnectionError> {
        let mut settings = Self::default();

        for (key, value) in options {
            match key.as_str() {
                "create_if_missing" => settings.create_if_missing = parse_option(key, value)?,
                "foreign_keys" => settings.foreign_keys = parse_option(key, value)?,
                "busy_timeout" => {
                    settings.busy_timeout = Duration::from_secs(parse_option(key, value)?)
                }
                "max_connections" => settings.max_connections = parse_option(key, value)?,
                other => {
                    return Err(ConnectionError::InvalidParams(format!(
                        "unknown option '{}'",
                        other
                    )))
                }
            }
        }

        Ok(settings)
    }
}

fn parse_option<T: FromStr>(key: &str, value: &str) -> Result<T, ConnectionError> {
    value.trim().parse().map_err(|_| {
        ConnectionError::InvalidParams(format!("invalid value for '{}': {:?}", key, value))
    })
}

/// Expand `~` in the path part of a SQLite URL
fn expand_url(url: &str) -> String {
    for prefix in ["sqlite://", "sqlite:"] {
        if let Some(rest) = url.strip_prefix(prefix) {
            return format!("{}{}", prefix, shellexpand::tilde(rest));
        }
    }
    shellexpand::tilde(url).into_owned()
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Create SQLite connection pool with WAL mode
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, ConnectionError> {
    connect_with(database_url, &PoolSettings::default()).await
}

async fn connect_with(
    database_url: &str,
    settings: &PoolSettings,
) -> Result<SqlitePool, ConnectionError> {
    let url = expand_url(database_url);
    let options = SqliteConnectOptions::from_str(&url)
        .map_err(|e| ConnectionError::InvalidParams(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(settings.busy_timeout)
        .foreign_keys(settings.foreign_keys)
        .create_if_missing(settings.create_if_missing);

    // Every connection to a private in-memory database sees its own data
    let max_connections = if is_in_memory(&url) {
        1
    } else {
        settings.max_connections
    };

    debug!(max_connections, "Opening SQLite pool");

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| ConnectionError::Failed(e.to_string()))
}

/// Opens a [`SqlitePool`] from connection parameters
///
/// - `Url`: any URL accepted by sqlx, options as in [`PoolSettings`]
/// - `Map`: requires `database`; `adapter`, when given, must be `sqlite`
#[derive(Debug, Default, Clone)]
pub struct SqliteConnector;

impl SqliteConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector<SqlitePool> for SqliteConnector {
    async fn connect(&self, params: &ConnectionParams) -> Result<SqlitePool, ConnectionError> {
        let (url, options) = match params {
            ConnectionParams::Url { url, options } => (url.clone(), options.clone()),
            ConnectionParams::Map(map) => {
                let mut options = map.clone();
                if let Some(adapter) = options.remove("adapter") {
                    if adapter != "sqlite" {
                        return Err(ConnectionError::UnsupportedAdapter(adapter));
                    }
                }
                let database = options.remove("database").ok_or_else(|| {
                    ConnectionError::InvalidParams("missing 'database'".to_string())
                })?;
                (database, options)
            }
        };

        let settings = PoolSettings::from_options(&options)?;
        let pool = connect_with(&url, &settings).await?;
        info!("SQLite connection established");
        Ok(pool)
    }
}
