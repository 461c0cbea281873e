//! Edge records of the embedded graph store

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// A directed edge stored in one relationship table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,

    /// Name of the relationship table
    pub table: String,

    pub source: NodeId,

    pub target: NodeId,

    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        table: impl Into<String>,
        source: NodeId,
        target: NodeId,
        properties: PropertyMap,
    ) -> Self {
        Edge {
            id,
            table: table.into(),
            source,
            target,
            properties,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}
