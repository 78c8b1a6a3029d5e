use std::time::Duration;

use crate::types::RepairReport;

/// Top-level depgraph error type.
///
/// All fallible operations in `depgraph-core` return [`Result<T, DepgraphError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum DepgraphError {
    /// Error from the graph store layer (`SQLite` operations, migrations).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error talking to the remote metadata source.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Type discovery failed; nothing can be harvested without it.
    #[error("Type discovery failed: {0}")]
    Catalog(#[source] FetchError),

    /// A repair run stopped part-way.
    #[error("Repair error: {0}")]
    Repair(#[from] RepairError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the SQLite-backed graph store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying `SQLite` operation failed. Batch writes roll back on this.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed (version mismatch or DDL error).
    #[error("Migration failed: {0}")]
    Migration(String),

    /// JSON serialization/deserialization of metadata failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from a single call against the remote metadata source.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// Network-level failure (connection reset, DNS, TLS).
    #[error("Network error: {0}")]
    Transient(String),

    /// The call did not finish within its deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The remote API returned a non-success HTTP status.
    #[error("Remote API error (HTTP {status}): {body}")]
    Api {
        /// HTTP status code from the source.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The requested scope does not exist on the remote.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl FetchError {
    /// Whether retrying the same call later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) | Self::NotFound(_) => false,
        }
    }
}

/// Errors that stop a repair run.
#[derive(thiserror::Error, Debug)]
pub enum RepairError {
    /// A by-id batch call failed. Earlier batches remain committed.
    #[error("Repair batch {batch} failed: {source}")]
    BatchFailed {
        /// Zero-based index of the failing batch.
        batch: usize,
        /// The remote failure.
        #[source]
        source: FetchError,
        /// What had been resolved before the failure.
        partial: Box<RepairReport>,
    },
}

/// Errors in depgraph configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, DepgraphError>`.
pub type Result<T> = std::result::Result<T, DepgraphError>;
