//! Tabular query results

use crate::graph::{Edge, Node, PropertyValue};
use indexmap::IndexMap;

/// A value in a result cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A node with all its properties
    Node(Node),
    /// An edge with all its properties
    Edge(Edge),
    /// A scalar property value
    Property(PropertyValue),
}

impl Value {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Value::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyValue> {
        match self {
            Value::Property(value) => Some(value),
            _ => None,
        }
    }

    /// Integer cell, e.g. the result of `count(*)`
    pub fn as_integer(&self) -> Option<i64> {
        self.as_property().and_then(PropertyValue::as_integer)
    }

    pub fn as_string(&self) -> Option<&str> {
        self.as_property().and_then(PropertyValue::as_string)
    }
}

/// One result row, keyed by column name in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    /// Get a value by column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Get a value by column position
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get_index(index).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The tabular result of one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordBatch {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    /// A result with no columns and no rows, as returned by writes
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of one column across all rows
    pub fn column(&self, name: &str) -> Vec<&Value> {
        self.records.iter().filter_map(|r| r.get(name)).collect()
    }
}

/// Result of executing a statement string
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Exactly one statement was executed
    Single(RecordBatch),
    /// Several `;`-separated statements were executed, one batch each
    Multiple(Vec<RecordBatch>),
}
