//! Graph statement generation
//!
//! Pure functions that turn schema declarations, nodes and relationships
//! into statement text for the embedded graph store. Generation never
//! fails; string values are always quoted with [`quote_literal`].

pub mod render;

pub use render::{quote_literal, render_match_condition, render_properties_for_schema, render_properties_for_value};

use crate::schema::{GraphNode, GraphRel, MatchCondition, NodeTable, NodeTableName, RelTable};

const FROM_ALIAS: &str = "n1";
const TO_ALIAS: &str = "n2";
const NODE_ALIAS: &str = "n";

/// Properties map preceded by a space, or nothing when there are none
fn property_map(properties: Option<&[crate::schema::Property]>) -> String {
    match properties {
        Some(properties) if !properties.is_empty() => {
            format!(" {}", render_properties_for_value(Some(properties), true))
        }
        _ => String::new(),
    }
}

pub fn create_node_table(table: &NodeTable) -> String {
    format!(
        "CREATE NODE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}));",
        table.name,
        render_properties_for_schema(&table.properties),
        table.primary_key
    )
}

pub fn create_rel_table(table: &RelTable) -> String {
    let properties = if table.properties.is_empty() {
        String::new()
    } else {
        format!(", {}", render_properties_for_schema(&table.properties))
    };
    format!(
        "CREATE REL TABLE IF NOT EXISTS {} (FROM {} TO {}{});",
        table.name, table.from, table.to, properties
    )
}

pub fn create_node(node: &GraphNode) -> String {
    format!(
        "CREATE ({}:{}{});",
        NODE_ALIAS,
        node.table,
        property_map(node.properties.as_deref())
    )
}

/// Match one node on each side and connect them
pub fn create_relationship(rel: &GraphRel) -> String {
    let condition = render_match_condition(FROM_ALIAS, TO_ALIAS, &rel.from_conditions, &rel.to_conditions);
    let where_clause = if condition.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", condition)
    };
    format!(
        "MATCH ({f}:{}), ({t}:{}){} CREATE ({f})-[:{}{}]->({t});",
        rel.from_table,
        rel.to_table,
        where_clause,
        rel.table,
        property_map(rel.properties.as_deref()),
        f = FROM_ALIAS,
        t = TO_ALIAS,
    )
}

/// Create `node` and connect it from every node matching `rel`'s `from`
/// side, as a single statement. `rel.to_conditions` are ignored; the new
/// node is the target.
pub fn create_linked_node(node: &GraphNode, rel: &GraphRel) -> String {
    let condition = render_match_condition(FROM_ALIAS, TO_ALIAS, &rel.from_conditions, &[]);
    let where_clause = if condition.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", condition)
    };
    format!(
        "MATCH ({f}:{}){} CREATE ({f})-[:{}{}]->({t}:{}{});",
        rel.from_table,
        where_clause,
        rel.table,
        property_map(rel.properties.as_deref()),
        node.table,
        property_map(node.properties.as_deref()),
        f = FROM_ALIAS,
        t = TO_ALIAS,
    )
}

/// Count the nodes of `table` satisfying `conditions`
pub fn count_matches(table: NodeTableName, conditions: &[MatchCondition]) -> String {
    let condition = render::render_conditions(NODE_ALIAS, conditions)
        .collect::<Vec<_>>()
        .join(" AND ");
    if condition.is_empty() {
        format!("MATCH ({}:{}) RETURN count(*);", NODE_ALIAS, table)
    } else {
        format!("MATCH ({}:{}) WHERE {} RETURN count(*);", NODE_ALIAS, table, condition)
    }
}

pub fn show_tables() -> &'static str {
    "CALL SHOW_TABLES() RETURN *;"
}
