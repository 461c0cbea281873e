//! Persistence layer
//!
//! Both embedded stores keep their data in RocksDB, one column family per
//! record kind. This module owns the shared open options and error type.

pub mod storage;

pub use storage::GraphStorage;

use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Column family error
    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// I/O error while preparing the store directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Open (or create) a RocksDB instance with the given column families
pub fn open_db(path: &Path, column_families: &[&str]) -> StorageResult<DB> {
    info!("Opening persistent storage at: {}", path.display());
    std::fs::create_dir_all(path)?;

    let mut opts = Options::default();
    opts.create_if_missing(true);
    opts.create_missing_column_families(true);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);

    let mut descriptors = vec![ColumnFamilyDescriptor::new("default", Options::default())];
    descriptors.extend(
        column_families
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, column_family_options())),
    );

    let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
    info!("Persistent storage opened successfully");
    Ok(db)
}

fn column_family_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts
}
