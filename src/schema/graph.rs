//! Graph store node and relationship tables
//!
//! Every node table has a `n_id SERIAL` primary key plus a `key STRING`
//! property holding the knowledge-base key of the entity it mirrors.
//! Relationship tables all originate from `LanguageContext`.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTableName {
    LanguageContext,
    Preference,
    Guideline,
    Rule,
    SourceStructure,
}

impl NodeTableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeTableName::LanguageContext => "LanguageContext",
            NodeTableName::Preference => "Preference",
            NodeTableName::Guideline => "Guideline",
            NodeTableName::Rule => "Rule",
            NodeTableName::SourceStructure => "SourceStructure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelTableName {
    PrefersTool,
    FollowsGuideline,
    EnforcesRule,
    ContainsStructure,
}

impl RelTableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelTableName::PrefersTool => "PREFERS_TOOL",
            RelTableName::FollowsGuideline => "FOLLOWS_GUIDELINE",
            RelTableName::EnforcesRule => "ENFORCES_RULE",
            RelTableName::ContainsStructure => "CONTAINS_STRUCTURE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyName {
    NId,
    RId,
    Key,
    Language,
    Context,
    Description,
    Name,
    Path,
    EnforcementLevel,
}

impl PropertyName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyName::NId => "n_id",
            PropertyName::RId => "r_id",
            PropertyName::Key => "key",
            PropertyName::Language => "language",
            PropertyName::Context => "context",
            PropertyName::Description => "description",
            PropertyName::Name => "name",
            PropertyName::Path => "path",
            PropertyName::EnforcementLevel => "enforcement_level",
        }
    }
}

/// Graph column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Serial,
    String,
    UInt8,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Serial => "SERIAL",
            DataType::String => "STRING",
            DataType::UInt8 => "UINT8",
        }
    }
}

/// Comparison operators usable in match conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl MatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOp::Eq => "=",
            MatchOp::Ne => "<>",
            MatchOp::Lt => "<",
            MatchOp::Le => "<=",
            MatchOp::Gt => ">",
            MatchOp::Ge => ">=",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(NodeTableName, RelTableName, PropertyName, DataType, MatchOp);

/// A declared column of a node or relationship table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableProperty {
    pub name: PropertyName,
    pub data_type: DataType,
    /// Literal DEFAULT expression, rendered as-is
    pub default: Option<String>,
}

impl TableProperty {
    pub fn new(name: PropertyName, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTable {
    pub name: NodeTableName,
    pub properties: Vec<TableProperty>,
    pub primary_key: PropertyName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelTable {
    pub name: RelTableName,
    pub from: NodeTableName,
    pub to: NodeTableName,
    pub properties: Vec<TableProperty>,
}

/// A property value to write; always rendered as a quoted literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: PropertyName,
    pub value: String,
}

impl Property {
    pub fn new(name: PropertyName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// `property OP 'value'` on one side of a relationship match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCondition {
    pub property: PropertyName,
    pub op: MatchOp,
    pub value: String,
}

impl MatchCondition {
    pub fn new(property: PropertyName, op: MatchOp, value: impl Into<String>) -> Self {
        Self {
            property,
            op,
            value: value.into(),
        }
    }

    /// `property = 'value'`
    pub fn equals(property: PropertyName, value: impl Into<String>) -> Self {
        Self::new(property, MatchOp::Eq, value)
    }
}

/// A node to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub table: NodeTableName,
    pub properties: Option<Vec<Property>>,
}

/// A relationship to create between two existing nodes, each located by
/// its match conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRel {
    pub table: RelTableName,
    pub from_table: NodeTableName,
    pub to_table: NodeTableName,
    pub from_conditions: Vec<MatchCondition>,
    pub to_conditions: Vec<MatchCondition>,
    pub properties: Option<Vec<Property>>,
}

fn entity_node(name: NodeTableName, mut properties: Vec<TableProperty>) -> NodeTable {
    let mut columns = vec![
        TableProperty::new(PropertyName::NId, DataType::Serial),
        TableProperty::new(PropertyName::Key, DataType::String),
    ];
    columns.append(&mut properties);
    NodeTable {
        name,
        properties: columns,
        primary_key: PropertyName::NId,
    }
}

/// Declared node tables
pub fn node_tables() -> Vec<NodeTable> {
    use DataType::{String, UInt8};
    use PropertyName::*;

    vec![
        entity_node(
            NodeTableName::LanguageContext,
            vec![
                TableProperty::new(Language, String),
                TableProperty::new(Context, String),
                TableProperty::new(Description, String),
            ],
        ),
        entity_node(
            NodeTableName::Preference,
            vec![TableProperty::new(Name, String), TableProperty::new(Description, String)],
        ),
        entity_node(
            NodeTableName::Guideline,
            vec![TableProperty::new(Name, String), TableProperty::new(Description, String)],
        ),
        entity_node(
            NodeTableName::Rule,
            vec![
                TableProperty::new(Name, String),
                TableProperty::new(Description, String),
                TableProperty::new(EnforcementLevel, UInt8),
            ],
        ),
        entity_node(
            NodeTableName::SourceStructure,
            vec![TableProperty::new(Path, String), TableProperty::new(Description, String)],
        ),
    ]
}

/// Declared relationship tables, all leaving a language context
pub fn rel_tables() -> Vec<RelTable> {
    [
        (RelTableName::PrefersTool, NodeTableName::Preference),
        (RelTableName::FollowsGuideline, NodeTableName::Guideline),
        (RelTableName::EnforcesRule, NodeTableName::Rule),
        (RelTableName::ContainsStructure, NodeTableName::SourceStructure),
    ]
    .into_iter()
    .map(|(name, to)| RelTable {
        name,
        from: NodeTableName::LanguageContext,
        to,
        properties: vec![TableProperty::new(PropertyName::RId, DataType::Serial)],
    })
    .collect()
}

fn find_node<'a>(nodes: &'a [NodeTable], name: NodeTableName) -> Option<&'a NodeTable> {
    nodes.iter().find(|n| n.name == name)
}

fn declares(table: &NodeTable, property: PropertyName) -> bool {
    table.properties.iter().any(|p| p.name == property)
}

/// Check that the declarations are consistent: unique table names, primary
/// keys among the declared properties, relationship endpoints declared
pub fn validate(nodes: &[NodeTable], rels: &[RelTable]) -> Result<()> {
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.name) {
            return Err(Error::Schema(format!("node table {} declared twice", node.name)));
        }
        if !declares(node, node.primary_key) {
            return Err(Error::Schema(format!(
                "primary key {} of {} is not a declared property",
                node.primary_key, node.name
            )));
        }
    }

    let mut seen = HashSet::new();
    for rel in rels {
        if !seen.insert(rel.name) {
            return Err(Error::Schema(format!("relationship table {} declared twice", rel.name)));
        }
        for endpoint in [rel.from, rel.to] {
            if find_node(nodes, endpoint).is_none() {
                return Err(Error::Schema(format!(
                    "relationship {} references undeclared node table {}",
                    rel.name, endpoint
                )));
            }
        }
    }
    Ok(())
}

/// Check a relationship against the declarations: the relationship table
/// connects the given endpoint tables, and every matched property exists on
/// its endpoint
pub fn check_relationship(rel: &GraphRel, nodes: &[NodeTable], rels: &[RelTable]) -> Result<()> {
    let declared = rels
        .iter()
        .find(|r| r.name == rel.table)
        .ok_or_else(|| Error::Schema(format!("relationship table {} is not declared", rel.table)))?;
    if declared.from != rel.from_table || declared.to != rel.to_table {
        return Err(Error::Schema(format!(
            "{} connects {} to {}, not {} to {}",
            rel.table, declared.from, declared.to, rel.from_table, rel.to_table
        )));
    }

    let sides = [
        (rel.from_table, &rel.from_conditions),
        (rel.to_table, &rel.to_conditions),
    ];
    for (table, conditions) in sides {
        let node = find_node(nodes, table)
            .ok_or_else(|| Error::Schema(format!("node table {} is not declared", table)))?;
        if let Some(unknown) = conditions.iter().find(|c| !declares(node, c.property)) {
            return Err(Error::Schema(format!("{} has no property {}", table, unknown.property)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declarations_are_consistent() {
        let nodes = node_tables();
        let rels = rel_tables();
        assert_eq!(nodes.len(), 5);
        assert_eq!(rels.len(), 4);
        validate(&nodes, &rels).unwrap();

        for node in &nodes {
            assert_eq!(node.primary_key, PropertyName::NId);
            assert!(declares(node, PropertyName::Key));
        }
    }

    #[test]
    fn test_validate_reports_bad_declarations() {
        let mut nodes = node_tables();
        nodes[0].primary_key = PropertyName::Path;
        assert!(matches!(validate(&nodes, &rel_tables()), Err(Error::Schema(_))));

        let nodes: Vec<NodeTable> = node_tables()
            .into_iter()
            .filter(|n| n.name != NodeTableName::Rule)
            .collect();
        assert!(matches!(validate(&nodes, &rel_tables()), Err(Error::Schema(_))));
    }

    #[test]
    fn test_check_relationship() {
        let rel = GraphRel {
            table: RelTableName::EnforcesRule,
            from_table: NodeTableName::LanguageContext,
            to_table: NodeTableName::Rule,
            from_conditions: vec![MatchCondition::equals(PropertyName::Language, "rust")],
            to_conditions: vec![MatchCondition::equals(PropertyName::Name, "no-unwrap")],
            properties: None,
        };
        check_relationship(&rel, &node_tables(), &rel_tables()).unwrap();

        let wrong_property = GraphRel {
            to_conditions: vec![MatchCondition::equals(PropertyName::Path, "src")],
            ..rel.clone()
        };
        assert!(check_relationship(&wrong_property, &node_tables(), &rel_tables()).is_err());

        let wrong_endpoint = GraphRel {
            to_table: NodeTableName::Guideline,
            ..rel
        };
        assert!(check_relationship(&wrong_endpoint, &node_tables(), &rel_tables()).is_err());
    }
}
