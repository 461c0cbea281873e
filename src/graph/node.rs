//! Node records of the embedded graph store

use super::property::{PropertyMap, PropertyValue};
use super::types::NodeId;
use serde::{Deserialize, Serialize};

/// A node stored in one node table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Name of the node table this node belongs to
    pub table: String,

    /// Column values; every declared column is present (null when unset)
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Node {
    pub fn new(id: NodeId, table: impl Into<String>, properties: PropertyMap) -> Self {
        Node {
            id,
            table: table.into(),
            properties,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn is_in_table(&self, table: &str) -> bool {
        self.table == table
    }
}
