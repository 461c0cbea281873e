//! Schema registry
//!
//! Static declarations of every knowledge-base table: the columns of each
//! vector store table ([`TableName`]) and the node and relationship tables
//! of the graph store ([`graph`]).

pub mod graph;
pub mod tables;

pub use graph::{
    DataType, GraphNode, GraphRel, MatchCondition, MatchOp, NodeTable, NodeTableName, Property, PropertyName,
    RelTable, RelTableName, TableProperty,
};
pub use tables::TableName;
