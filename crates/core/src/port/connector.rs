// Connector Port
// Builds a database handle from raw connection parameters

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Raw connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionParams {
    /// Connection URL plus extra driver options
    Url {
        url: String,
        #[serde(default)]
        options: BTreeMap<String, String>,
    },
    /// Parameter mapping (adapter, database, ...)
    Map(BTreeMap<String, String>),
}

impl ConnectionParams {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url {
            url: url.into(),
            options: BTreeMap::new(),
        }
    }

    /// Add a driver option (URL form) or a parameter (map form)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            Self::Url { options, .. } => options.insert(key.into(), value.into()),
            Self::Map(params) => params.insert(key.into(), value.into()),
        };
        self
    }

    pub fn map<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Map(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Connection errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid connection parameters: {0}")]
    InvalidParams(String),

    #[error("Unsupported adapter: {0}")]
    UnsupportedAdapter(String),

    #[error("Connect failed: {0}")]
    Failed(String),
}

/// Connector trait
///
/// Implementations:
/// - SqliteConnector: opens a SqlitePool
#[async_trait]
pub trait Connector<D>: Send + Sync {
    /// Open a database handle
    ///
    /// # Errors
    /// - ConnectionError::InvalidParams if required keys are missing or malformed
    /// - ConnectionError::Failed if the driver cannot connect
    async fn connect(&self, params: &ConnectionParams) -> Result<D, ConnectionError>;
}
