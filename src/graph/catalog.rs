//! Table catalog of the embedded graph store
//!
//! Every node belongs to exactly one node table and every edge to exactly one
//! relationship table. Tables declare their columns up front; writes that
//! reference undeclared columns are rejected.

use super::property::PropertyValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data types understood by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Auto-incrementing integer assigned by the store
    Serial,
    String,
    UInt8,
    Int64,
    Double,
    Boolean,
}

impl ColumnKind {
    /// Parse a type keyword (case-insensitive)
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "SERIAL" => Some(ColumnKind::Serial),
            "STRING" => Some(ColumnKind::String),
            "UINT8" => Some(ColumnKind::UInt8),
            "INT64" => Some(ColumnKind::Int64),
            "DOUBLE" => Some(ColumnKind::Double),
            "BOOLEAN" => Some(ColumnKind::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Serial => "SERIAL",
            ColumnKind::String => "STRING",
            ColumnKind::UInt8 => "UINT8",
            ColumnKind::Int64 => "INT64",
            ColumnKind::Double => "DOUBLE",
            ColumnKind::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    /// Value used when a write omits the column
    pub default: Option<PropertyValue>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn with_default(mut self, default: PropertyValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// Node table declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
}

/// Relationship table declaration; edges run from `from` to `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelTableDef {
    pub name: String,
    pub from: String,
    pub to: String,
    pub columns: Vec<ColumnDef>,
}

/// Either kind of table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableDef {
    Node(NodeTableDef),
    Rel(RelTableDef),
}

impl TableDef {
    pub fn name(&self) -> &str {
        match self {
            TableDef::Node(def) => &def.name,
            TableDef::Rel(def) => &def.name,
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        match self {
            TableDef::Node(def) => &def.columns,
            TableDef::Rel(def) => &def.columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns().iter().find(|c| c.name == name)
    }

    /// `NODE` or `REL`, as reported by `SHOW_TABLES`
    pub fn kind_str(&self) -> &'static str {
        match self {
            TableDef::Node(_) => "NODE",
            TableDef::Rel(_) => "REL",
        }
    }

    pub fn as_node(&self) -> Option<&NodeTableDef> {
        match self {
            TableDef::Node(def) => Some(def),
            TableDef::Rel(_) => None,
        }
    }

    pub fn as_rel(&self) -> Option<&RelTableDef> {
        match self {
            TableDef::Rel(def) => Some(def),
            TableDef::Node(_) => None,
        }
    }
}

/// All tables, in creation order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<TableDef>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn node_table(&self, name: &str) -> Option<&NodeTableDef> {
        self.get(name).and_then(TableDef::as_node)
    }

    pub fn rel_table(&self, name: &str) -> Option<&RelTableDef> {
        self.get(name).and_then(TableDef::as_rel)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub(crate) fn insert(&mut self, def: TableDef) {
        self.tables.push(def);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kind_parse_is_case_insensitive() {
        assert_eq!(ColumnKind::parse("serial"), Some(ColumnKind::Serial));
        assert_eq!(ColumnKind::parse("UInt8"), Some(ColumnKind::UInt8));
        assert_eq!(ColumnKind::parse("VARCHAR"), None);
        assert_eq!(ColumnKind::String.to_string(), "STRING");
    }

    #[test]
    fn test_catalog_lookup_by_kind() {
        let mut catalog = Catalog::new();
        catalog.insert(TableDef::Node(NodeTableDef {
            name: "Person".to_string(),
            columns: vec![ColumnDef::new("id", ColumnKind::Serial)],
            primary_key: vec!["id".to_string()],
        }));
        catalog.insert(TableDef::Rel(RelTableDef {
            name: "KNOWS".to_string(),
            from: "Person".to_string(),
            to: "Person".to_string(),
            columns: vec![],
        }));

        assert!(catalog.node_table("Person").is_some());
        assert!(catalog.rel_table("Person").is_none());
        assert_eq!(catalog.rel_table("KNOWS").map(|r| r.to.as_str()), Some("Person"));
        let kinds: Vec<_> = catalog.tables().map(TableDef::kind_str).collect();
        assert_eq!(kinds, vec!["NODE", "REL"]);
    }
}
