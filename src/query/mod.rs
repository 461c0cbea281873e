//! Query processing for the embedded graph store
//!
//! A [`Database`] owns the on-disk storage and the in-memory graph. Callers
//! open a short-lived [`Connection`] per unit of work and submit statement
//! text, optionally with `$name` parameters.

pub mod ast;
pub mod executor;
pub mod parser;

// Re-export main types
pub use ast::Statement;
pub use executor::{
    ExecutionError, ExecutionResult, Parameters, QueryExecutor, QueryOutput, Record, RecordBatch, Value,
};
pub use parser::{parse_statements, ParseError, ParseResult};

use crate::graph::GraphStore;
use crate::persistence::GraphStorage;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

/// An embedded graph database rooted at one directory
pub struct Database {
    storage: GraphStorage,
    store: RwLock<GraphStore>,
}

impl Database {
    /// Open or create the database at `path` and load it into memory
    pub fn open(path: impl AsRef<Path>) -> ExecutionResult<Self> {
        let storage = GraphStorage::open(path)?;
        let store = storage.load()?;
        info!(
            "Graph database ready at {} ({} tables)",
            storage.path().display(),
            store.catalog().len()
        );
        Ok(Self {
            storage,
            store: RwLock::new(store),
        })
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    /// Number of nodes across all tables
    pub fn node_count(&self) -> ExecutionResult<usize> {
        Ok(self.store.read().map_err(|_| ExecutionError::LockPoisoned)?.node_count())
    }

    /// Number of edges across all tables
    pub fn edge_count(&self) -> ExecutionResult<usize> {
        Ok(self.store.read().map_err(|_| ExecutionError::LockPoisoned)?.edge_count())
    }
}

/// A connection to a [`Database`]
pub struct Connection<'a> {
    db: &'a Database,
}

impl<'a> Connection<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Execute one or more `;`-separated statements.
    ///
    /// Each statement commits on its own; if a later statement fails, the
    /// earlier ones stay applied.
    pub fn execute(&self, text: &str, params: Option<&Parameters>) -> ExecutionResult<QueryOutput> {
        let statements = parse_statements(text)?;
        let mut batches = Vec::with_capacity(statements.len());
        for statement in &statements {
            batches.push(self.execute_statement(statement, params)?);
        }

        if batches.len() == 1 {
            Ok(QueryOutput::Single(batches.remove(0)))
        } else {
            Ok(QueryOutput::Multiple(batches))
        }
    }

    fn execute_statement(&self, statement: &Statement, params: Option<&Parameters>) -> ExecutionResult<RecordBatch> {
        if statement.is_read_only() {
            let store = self.db.store.read().map_err(|_| ExecutionError::LockPoisoned)?;
            return QueryExecutor::new(&store, params).execute_read(statement);
        }

        let mut store = self.db.store.write().map_err(|_| ExecutionError::LockPoisoned)?;
        let mutations = QueryExecutor::new(&store, params).plan_write(statement)?;
        self.db.storage.persist(&mutations, store.catalog().len())?;
        debug!("Applying {} mutations", mutations.len());
        store.apply(mutations);
        Ok(RecordBatch::empty())
    }
}
