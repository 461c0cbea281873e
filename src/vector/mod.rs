//! Embedded vector store
//!
//! Tables of JSON rows with a declared column schema, persisted in RocksDB.
//! Rows can be scanned with equality filters or ranked by distance to a
//! query vector (exact search over the table's vector column).

pub mod database;
pub mod distance;
pub mod filter;
pub mod schema;

pub use database::{Query, Table, VectorDatabase};
pub use distance::DistanceMetric;
pub use filter::Filter;
pub use schema::{Field, FieldType, Row, TableSchema};

use crate::persistence::StorageError;
use thiserror::Error;

/// Column added to nearest-neighbour results
pub const DISTANCE_COLUMN: &str = "_distance";

/// Vector store errors
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Table {0} does not exist")]
    TableNotFound(String),

    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("Schema violation in table {table}: {reason}")]
    SchemaViolation { table: String, reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Vector store lock poisoned")]
    LockPoisoned,
}

pub type VectorResult<T> = Result<T, VectorError>;
