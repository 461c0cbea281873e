//! Crate-level error type
//!
//! Subsystems keep their own error enums; this type is what the knowledge
//! store surfaces to callers.

use crate::embed::EmbedError;
use crate::query::ExecutionError;
use crate::vector::VectorError;
use thiserror::Error;

/// Knowledge store errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed caller input (bad settings path, missing search input, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Settings document does not have the shape of the bundled default
    #[error("Loaded settings are structurally different from the default settings.")]
    ConfigStructureMismatch,

    /// Update of a record that does not exist
    #[error("No record with key {key} in table {table}")]
    NotFound { table: String, key: String },

    /// Create with a key some stored entity already has
    #[error("Key {key} is already used in table {table}")]
    DuplicateKey { table: String, key: String },

    #[error("Store lock poisoned")]
    LockPoisoned,

    /// The graph engine did not return a single tabular result
    #[error("Unexpected result type: {0}")]
    UnexpectedResultType(String),

    /// The graph engine rejected or could not complete an operation
    #[error("Execution error: {0}")]
    Execution(String),

    /// Schema registry declarations are inconsistent
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Vector store error: {0}")]
    Vector(#[from] VectorError),

    #[error("Graph store error: {0}")]
    Graph(#[from] ExecutionError),

    #[error("Embedding error: {0}")]
    Embed(#[from] EmbedError),

    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
