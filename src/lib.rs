//! BlueprintFlow knowledge store
//!
//! Persists the knowledge base behind LLM-assisted code generation:
//! language contexts and the preferences, rules, guidelines, source
//! structures, abstractions and code snippets that belong to them.
//!
//! # Architecture
//!
//! - [`vector`]: embedded vector store (RocksDB), one table per entity kind,
//!   exact nearest-neighbour search
//! - [`graph`], [`query`], [`persistence`]: embedded property graph with a
//!   Cypher dialect, used to relate a language context to its entities
//! - [`schema`]: the tables both stores are initialized with
//! - [`statement`]: statement text generation for the graph store
//! - [`store`]: adapters over both stores and the [`StoreManager`] task
//!   pipeline
//! - [`settings`]: model settings with structural validation
//! - [`embed`]: embedding client
//!
//! ## Example Usage
//!
//! ```no_run
//! use blueprintflow::model::{CreateLanguageContextTask, Task};
//! use blueprintflow::{load_settings, StoreManager, UserPaths};
//!
//! # fn main() -> blueprintflow::Result<()> {
//! let settings = load_settings(None)?;
//! let manager = StoreManager::open(&UserPaths::from_system()?, &settings)?;
//!
//! let (status, entity) = manager.create(Task::from(CreateLanguageContextTask {
//!     language: "rust".to_string(),
//!     context: "cli".to_string(),
//!     description: "Command line tools".to_string(),
//!     ..Default::default()
//! }));
//! assert!(status.is_success());
//! assert!(entity.is_some());
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod embed;
pub mod error;
pub mod graph;
pub mod logging;
pub mod model;
pub mod paths;
pub mod persistence;
pub mod query;
pub mod schema;
pub mod settings;
pub mod statement;
pub mod store;
pub mod vector;

// Re-export main types for convenience
pub use embed::{EmbedError, EmbedResult, Embedder, EmbeddingClient};
pub use error::{Error, Result};
pub use model::{Entity, QueryFilter, Task, TaskStatus};
pub use paths::UserPaths;
pub use schema::TableName;
pub use settings::{eq_struct, load_settings, load_user_settings, ModelConfig, ModelTask, Settings};
pub use store::{GraphStoreHandler, StoreManager, VectorStoreHandler};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.1.0");
    }
}
