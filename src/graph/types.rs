//! Identifier types for the embedded graph store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal identifier of a node, unique across all node tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Internal identifier of an edge, unique across all relationship tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_by_value() {
        assert!(NodeId(1) < NodeId(2));
        assert_eq!(EdgeId(7).as_u64(), 7);
        assert_eq!(NodeId(3).to_string(), "node#3");
        assert_eq!(EdgeId(4).to_string(), "edge#4");
    }
}
