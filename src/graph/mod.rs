//! Embedded property graph
//!
//! Schema-first graph model used by the graph store:
//! - Node tables with typed columns and a primary key
//! - Relationship tables connecting one node table to another
//! - In-memory storage with a per-table index and outgoing adjacency lists

pub mod catalog;
pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use catalog::{Catalog, ColumnDef, ColumnKind, NodeTableDef, RelTableDef, TableDef};
pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore, Mutation, WritePlan};
pub use types::{EdgeId, NodeId};
