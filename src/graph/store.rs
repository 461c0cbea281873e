//! In-memory graph storage with schema enforcement
//!
//! Writes are two-phase: a [`WritePlan`] validates a statement's effects
//! against the current state and collects [`Mutation`]s, and
//! [`GraphStore::apply`] installs them. Planning never touches the store, so
//! a statement that fails validation leaves no trace.

use super::catalog::{Catalog, ColumnKind, TableDef};
use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, NodeId};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Graph store errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Table {0} does not exist")]
    TableNotFound(String),

    #[error("Table {0} already exists")]
    TableAlreadyExists(String),

    #[error("Table {table} has no column {column}")]
    ColumnNotFound { table: String, column: String },

    #[error("Invalid table definition for {table}: {reason}")]
    InvalidDefinition { table: String, reason: String },

    #[error("Value {value} is not valid for column {table}.{column} of type {kind}")]
    TypeMismatch {
        table: String,
        column: String,
        kind: ColumnKind,
        value: String,
    },

    #[error("Column {table}.{column} is SERIAL and cannot be assigned")]
    SerialAssignment { table: String, column: String },

    #[error("Duplicate primary key {key} in table {table}")]
    DuplicatePrimaryKey { table: String, key: String },

    #[error("Primary key of table {0} cannot be null")]
    NullPrimaryKey(String),

    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Relationship {rel} connects {expected}, got {found}")]
    EndpointMismatch {
        rel: String,
        expected: String,
        found: String,
    },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// A validated change to the store
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateTable(TableDef),
    CreateNode(Node),
    CreateEdge(Edge),
}

/// In-memory graph storage
///
/// - nodes: NodeId -> Node
/// - edges: EdgeId -> Edge
/// - outgoing: NodeId -> Vec<EdgeId> (adjacency list)
/// - table_index: table name -> node ids, in id order
#[derive(Debug, Default)]
pub struct GraphStore {
    catalog: Catalog,
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    table_index: HashMap<String, BTreeSet<NodeId>>,
    /// Primary-key tuples in use, per node table
    primary_keys: HashMap<String, HashSet<String>>,
    /// Next value per SERIAL column, keyed `table.column`
    serials: HashMap<String, i64>,
    next_node_id: u64,
    next_edge_id: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Nodes of one table in creation order
    pub fn nodes_in_table<'a>(&'a self, table: &str) -> impl Iterator<Item = &'a Node> + 'a {
        self.table_index
            .get(table)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(move |id| self.nodes.get(id))
    }

    /// All nodes in id order
    pub fn all_nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    pub fn outgoing_edges(&self, id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(&id)
            .map(|ids| ids.iter().filter_map(|e| self.edges.get(e)).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Install validated mutations. Also used when replaying persisted state,
    /// so id and SERIAL counters are advanced past every applied record.
    pub fn apply(&mut self, mutations: impl IntoIterator<Item = Mutation>) {
        for mutation in mutations {
            match mutation {
                Mutation::CreateTable(def) => {
                    if let TableDef::Node(node_def) = &def {
                        self.primary_keys.entry(node_def.name.clone()).or_default();
                    }
                    self.catalog.insert(def);
                }
                Mutation::CreateNode(node) => {
                    self.next_node_id = self.next_node_id.max(node.id.0 + 1);
                    if let Some(TableDef::Node(def)) = self.catalog.get(&node.table) {
                        let key = primary_key_of(&def.primary_key, &node.properties);
                        self.primary_keys.entry(node.table.clone()).or_default().insert(key);
                        bump_serials(&mut self.serials, &node.table, def.columns.iter().map(|c| (c.name.as_str(), c.kind)), &node.properties);
                    }
                    self.table_index.entry(node.table.clone()).or_default().insert(node.id);
                    self.nodes.insert(node.id, node);
                }
                Mutation::CreateEdge(edge) => {
                    self.next_edge_id = self.next_edge_id.max(edge.id.0 + 1);
                    if let Some(TableDef::Rel(def)) = self.catalog.get(&edge.table) {
                        bump_serials(&mut self.serials, &edge.table, def.columns.iter().map(|c| (c.name.as_str(), c.kind)), &edge.properties);
                    }
                    self.outgoing.entry(edge.source).or_default().push(edge.id);
                    self.edges.insert(edge.id, edge);
                }
            }
        }
    }
}

fn bump_serials<'a>(
    serials: &mut HashMap<String, i64>,
    table: &str,
    columns: impl Iterator<Item = (&'a str, ColumnKind)>,
    properties: &PropertyMap,
) {
    for (name, kind) in columns {
        if kind != ColumnKind::Serial {
            continue;
        }
        if let Some(PropertyValue::Integer(value)) = properties.get(name) {
            let next = serials.entry(format!("{}.{}", table, name)).or_insert(0);
            *next = (*next).max(value + 1);
        }
    }
}

fn primary_key_of(columns: &[String], properties: &PropertyMap) -> String {
    columns
        .iter()
        .map(|c| properties.get(c).map(PropertyValue::index_key).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

/// Validates one statement's writes against a store snapshot
pub struct WritePlan<'a> {
    store: &'a GraphStore,
    serials: HashMap<String, i64>,
    pending_keys: HashSet<(String, String)>,
    pending_nodes: HashMap<NodeId, String>,
    next_node_id: u64,
    next_edge_id: u64,
    mutations: Vec<Mutation>,
}

impl<'a> WritePlan<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self {
            store,
            serials: HashMap::new(),
            pending_keys: HashSet::new(),
            pending_nodes: HashMap::new(),
            next_node_id: store.next_node_id,
            next_edge_id: store.next_edge_id,
            mutations: Vec::new(),
        }
    }

    /// Plan a table creation. Returns `false` when the table already exists
    /// and `if_not_exists` was requested.
    pub fn create_table(&mut self, def: TableDef, if_not_exists: bool) -> GraphResult<bool> {
        let name = def.name().to_string();
        let pending = self.mutations.iter().any(|m| matches!(m, Mutation::CreateTable(t) if t.name() == name));
        if self.store.catalog.contains(&name) || pending {
            return if if_not_exists {
                Ok(false)
            } else {
                Err(GraphError::TableAlreadyExists(name))
            };
        }

        let mut seen = HashSet::new();
        for column in def.columns() {
            if !seen.insert(column.name.as_str()) {
                return Err(invalid(&name, format!("column {} declared twice", column.name)));
            }
        }

        match &def {
            TableDef::Node(node_def) => {
                if node_def.primary_key.is_empty() {
                    return Err(invalid(&name, "missing primary key".to_string()));
                }
                for pk in &node_def.primary_key {
                    if def.column(pk).is_none() {
                        return Err(invalid(&name, format!("primary key {} is not a column", pk)));
                    }
                }
            }
            TableDef::Rel(rel_def) => {
                for endpoint in [&rel_def.from, &rel_def.to] {
                    if self.store.catalog.node_table(endpoint).is_none() {
                        return Err(invalid(&name, format!("endpoint {} is not a node table", endpoint)));
                    }
                }
            }
        }

        for column in def.columns() {
            if let Some(default) = &column.default {
                if default.coerce_to(column.kind).is_none() {
                    return Err(GraphError::TypeMismatch {
                        table: name.clone(),
                        column: column.name.clone(),
                        kind: column.kind,
                        value: default.to_string(),
                    });
                }
            }
        }

        self.mutations.push(Mutation::CreateTable(def));
        Ok(true)
    }

    /// Plan a node creation and return the id it will receive
    pub fn create_node(&mut self, table: &str, properties: PropertyMap) -> GraphResult<NodeId> {
        let def = self
            .store
            .catalog
            .node_table(table)
            .ok_or_else(|| GraphError::TableNotFound(table.to_string()))?
            .clone();
        let row = self.complete_row(table, &TableDef::Node(def.clone()), properties)?;

        if def.primary_key.iter().any(|pk| row.get(pk).map_or(true, PropertyValue::is_null)) {
            return Err(GraphError::NullPrimaryKey(table.to_string()));
        }
        let key = primary_key_of(&def.primary_key, &row);
        let taken = self
            .store
            .primary_keys
            .get(table)
            .is_some_and(|keys| keys.contains(&key));
        if taken || !self.pending_keys.insert((table.to_string(), key.clone())) {
            return Err(GraphError::DuplicatePrimaryKey {
                table: table.to_string(),
                key: key.replace('\u{1f}', ", "),
            });
        }

        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.pending_nodes.insert(id, table.to_string());
        self.mutations.push(Mutation::CreateNode(Node::new(id, table, row)));
        Ok(id)
    }

    /// Plan an edge creation between existing or planned nodes
    pub fn create_edge(
        &mut self,
        table: &str,
        source: NodeId,
        target: NodeId,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        let def = self
            .store
            .catalog
            .rel_table(table)
            .ok_or_else(|| GraphError::TableNotFound(table.to_string()))?
            .clone();
        let source_table = self.table_of(source)?;
        let target_table = self.table_of(target)?;
        if source_table != def.from || target_table != def.to {
            return Err(GraphError::EndpointMismatch {
                rel: table.to_string(),
                expected: format!("{} -> {}", def.from, def.to),
                found: format!("{} -> {}", source_table, target_table),
            });
        }

        let row = self.complete_row(table, &TableDef::Rel(def), properties)?;
        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        self.mutations
            .push(Mutation::CreateEdge(Edge::new(id, table, source, target, row)));
        Ok(id)
    }

    /// Finish planning and hand over the mutations
    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }

    fn table_of(&self, id: NodeId) -> GraphResult<String> {
        if let Some(node) = self.store.nodes.get(&id) {
            return Ok(node.table.clone());
        }
        self.pending_nodes
            .get(&id)
            .cloned()
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Check assigned values against the table and fill SERIAL, DEFAULT
    /// and null for the rest
    fn complete_row(&mut self, table: &str, def: &TableDef, mut given: PropertyMap) -> GraphResult<PropertyMap> {
        if let Some(unknown) = given.keys().find(|k| def.column(k).is_none()) {
            return Err(GraphError::ColumnNotFound {
                table: table.to_string(),
                column: unknown.clone(),
            });
        }

        let mut row = PropertyMap::new();
        for column in def.columns() {
            let value = match (column.kind, given.remove(&column.name)) {
                (ColumnKind::Serial, Some(_)) => {
                    return Err(GraphError::SerialAssignment {
                        table: table.to_string(),
                        column: column.name.clone(),
                    });
                }
                (ColumnKind::Serial, None) => PropertyValue::Integer(self.next_serial(table, &column.name)),
                (kind, Some(value)) => value.coerce_to(kind).ok_or_else(|| GraphError::TypeMismatch {
                    table: table.to_string(),
                    column: column.name.clone(),
                    kind,
                    value: value.to_string(),
                })?,
                (kind, None) => column
                    .default
                    .as_ref()
                    .and_then(|d| d.coerce_to(kind))
                    .unwrap_or(PropertyValue::Null),
            };
            row.insert(column.name.clone(), value);
        }
        Ok(row)
    }

    fn next_serial(&mut self, table: &str, column: &str) -> i64 {
        let key = format!("{}.{}", table, column);
        let start = self.store.serials.get(&key).copied().unwrap_or(0);
        let next = self.serials.entry(key).or_insert(start);
        let value = *next;
        *next += 1;
        value
    }
}

fn invalid(table: &str, reason: String) -> GraphError {
    GraphError::InvalidDefinition {
        table: table.to_string(),
        reason,
    }
}
