//! Statement execution
//!
//! Reads run directly against a shared [`GraphStore`]. Writes are planned
//! against the same snapshot into a list of [`Mutation`]s, which the caller
//! persists and applies while still holding the write lock.

pub mod record;

pub use record::{QueryOutput, Record, RecordBatch, Value};

use crate::graph::{EdgeId, GraphError, GraphStore, Mutation, NodeId, PropertyMap, PropertyValue, TableDef, WritePlan};
use crate::persistence::StorageError;
use crate::query::ast::*;
use crate::query::parser::ParseError;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    #[error("Parameter not provided: ${0}")]
    MissingParameter(String),

    #[error("Unknown procedure: {0}")]
    UnknownProcedure(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Graph store lock poisoned")]
    LockPoisoned,
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Named statement parameters (`$name`)
pub type Parameters = HashMap<String, PropertyValue>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    Node(NodeId),
    Edge(EdgeId),
}

type Binding = HashMap<String, Bound>;

/// Executes parsed statements against one store snapshot
pub struct QueryExecutor<'a> {
    store: &'a GraphStore,
    params: Option<&'a Parameters>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(store: &'a GraphStore, params: Option<&'a Parameters>) -> Self {
        Self { store, params }
    }

    /// Execute a read-only statement
    pub fn execute_read(&self, statement: &Statement) -> ExecutionResult<RecordBatch> {
        match statement {
            Statement::Call { procedure } => self.call(procedure),
            Statement::Match {
                patterns,
                conditions,
                action: MatchAction::Return(clause),
            } => {
                let rows = self.match_patterns(patterns, conditions)?;
                self.project(patterns, rows, clause)
            }
            _ => Err(ExecutionError::Unsupported(
                "write statement passed to read execution".to_string(),
            )),
        }
    }

    /// Validate a write statement and return the mutations it causes
    pub fn plan_write(&self, statement: &Statement) -> ExecutionResult<Vec<Mutation>> {
        let mut plan = WritePlan::new(self.store);
        match statement {
            Statement::CreateNodeTable { def, if_not_exists } => {
                plan.create_table(TableDef::Node(def.clone()), *if_not_exists)?;
            }
            Statement::CreateRelTable { def, if_not_exists } => {
                plan.create_table(TableDef::Rel(def.clone()), *if_not_exists)?;
            }
            Statement::Create(paths) => {
                self.plan_create(&mut plan, paths, Binding::new())?;
            }
            Statement::Match {
                patterns,
                conditions,
                action: MatchAction::Create(paths),
            } => {
                for row in self.match_patterns(patterns, conditions)? {
                    self.plan_create(&mut plan, paths, row)?;
                }
            }
            _ => {
                return Err(ExecutionError::Unsupported(
                    "read statement passed to write planning".to_string(),
                ))
            }
        }
        Ok(plan.into_mutations())
    }

    fn call(&self, procedure: &str) -> ExecutionResult<RecordBatch> {
        if !procedure.eq_ignore_ascii_case("SHOW_TABLES") {
            return Err(ExecutionError::UnknownProcedure(procedure.to_string()));
        }
        let mut batch = RecordBatch::new(vec!["name".to_string(), "type".to_string()]);
        for table in self.store.catalog().tables() {
            let mut record = Record::new();
            record.insert("name", Value::Property(table.name().into()));
            record.insert("type", Value::Property(table.kind_str().into()));
            batch.push(record);
        }
        Ok(batch)
    }

    // ------------------------------------------------------------ matching

    fn match_patterns(&self, patterns: &[PathPattern], conditions: &[Condition]) -> ExecutionResult<Vec<Binding>> {
        let mut rows = vec![Binding::new()];
        for path in patterns {
            let mut next = Vec::new();
            for row in &rows {
                self.extend_path(path, row, &mut next)?;
            }
            rows = next;
        }

        let mut matched = Vec::with_capacity(rows.len());
        for row in rows {
            if self.satisfies(conditions, &row)? {
                matched.push(row);
            }
        }
        Ok(matched)
    }

    fn extend_path(&self, path: &PathPattern, row: &Binding, out: &mut Vec<Binding>) -> ExecutionResult<()> {
        for start in self.node_candidates(&path.start, row)? {
            let mut extended = row.clone();
            bind(&mut extended, &path.start.variable, Bound::Node(start));
            self.extend_hops(&path.hops, start, extended, out)?;
        }
        Ok(())
    }

    fn extend_hops(
        &self,
        hops: &[(RelPattern, NodePattern)],
        current: NodeId,
        row: Binding,
        out: &mut Vec<Binding>,
    ) -> ExecutionResult<()> {
        let Some(((rel, node), rest)) = hops.split_first() else {
            out.push(row);
            return Ok(());
        };

        if let Some(table) = &rel.table {
            if self.store.catalog().rel_table(table).is_none() {
                return Err(GraphError::TableNotFound(table.clone()).into());
            }
        }

        for edge in self.store.outgoing_edges(current) {
            if rel.table.as_ref().is_some_and(|t| *t != edge.table) {
                continue;
            }
            if let Some(var) = &rel.variable {
                match row.get(var) {
                    Some(Bound::Edge(id)) if *id != edge.id => continue,
                    Some(Bound::Node(_)) => {
                        return Err(ExecutionError::TypeError(format!("{} is bound to a node", var)))
                    }
                    _ => {}
                }
            }
            if !self.properties_match(&rel.properties, &edge.properties)? {
                continue;
            }
            if !self.node_matches(node, edge.target, &row)? {
                continue;
            }

            let mut extended = row.clone();
            bind(&mut extended, &rel.variable, Bound::Edge(edge.id));
            bind(&mut extended, &node.variable, Bound::Node(edge.target));
            self.extend_hops(rest, edge.target, extended, out)?;
        }
        Ok(())
    }

    fn node_candidates(&self, pattern: &NodePattern, row: &Binding) -> ExecutionResult<Vec<NodeId>> {
        if let Some(Bound::Node(id)) = pattern.variable.as_ref().and_then(|v| row.get(v)) {
            return Ok(if self.node_matches(pattern, *id, row)? { vec![*id] } else { vec![] });
        }

        let ids: Vec<NodeId> = match &pattern.table {
            Some(table) => {
                if self.store.catalog().node_table(table).is_none() {
                    return Err(GraphError::TableNotFound(table.clone()).into());
                }
                self.store.nodes_in_table(table).map(|n| n.id).collect()
            }
            None => self.store.all_nodes().into_iter().map(|n| n.id).collect(),
        };

        let mut candidates = Vec::new();
        for id in ids {
            if self.node_matches(pattern, id, row)? {
                candidates.push(id);
            }
        }
        Ok(candidates)
    }

    fn node_matches(&self, pattern: &NodePattern, id: NodeId, row: &Binding) -> ExecutionResult<bool> {
        let node = self.store.get_node(id).ok_or(GraphError::NodeNotFound(id))?;
        if pattern.table.as_ref().is_some_and(|t| *t != node.table) {
            return Ok(false);
        }
        if let Some(var) = &pattern.variable {
            match row.get(var) {
                Some(Bound::Node(bound)) if *bound != id => return Ok(false),
                Some(Bound::Edge(_)) => {
                    return Err(ExecutionError::TypeError(format!("{} is bound to a relationship", var)))
                }
                _ => {}
            }
        }
        self.properties_match(&pattern.properties, &node.properties)
    }

    fn properties_match(&self, wanted: &[(String, Expression)], actual: &PropertyMap) -> ExecutionResult<bool> {
        for (key, expr) in wanted {
            let expected = self.resolve(expr)?;
            let equal = actual
                .get(key)
                .and_then(|value| value.compare(&expected))
                .is_some_and(|ord| ord == Ordering::Equal);
            if !equal {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn satisfies(&self, conditions: &[Condition], row: &Binding) -> ExecutionResult<bool> {
        for condition in conditions {
            let actual = self.bound_property(row, &condition.variable, &condition.property)?;
            let expected = self.resolve(&condition.value)?;
            let holds = match actual.compare(&expected) {
                Some(ord) => match condition.op {
                    CompareOp::Eq => ord == Ordering::Equal,
                    CompareOp::Ne => ord != Ordering::Equal,
                    CompareOp::Lt => ord == Ordering::Less,
                    CompareOp::Le => ord != Ordering::Greater,
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Ge => ord != Ordering::Less,
                },
                None => false,
            };
            if !holds {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn bound_property(&self, row: &Binding, variable: &str, property: &str) -> ExecutionResult<PropertyValue> {
        let (table, properties) = match row.get(variable) {
            Some(Bound::Node(id)) => {
                let node = self.store.get_node(*id).ok_or(GraphError::NodeNotFound(*id))?;
                (&node.table, &node.properties)
            }
            Some(Bound::Edge(id)) => {
                let edge = self
                    .store
                    .get_edge(*id)
                    .ok_or_else(|| ExecutionError::VariableNotFound(variable.to_string()))?;
                (&edge.table, &edge.properties)
            }
            None => return Err(ExecutionError::VariableNotFound(variable.to_string())),
        };

        let declared = self
            .store
            .catalog()
            .get(table)
            .is_some_and(|def| def.column(property).is_some());
        if !declared {
            return Err(GraphError::ColumnNotFound {
                table: table.clone(),
                column: property.to_string(),
            }
            .into());
        }
        Ok(properties.get(property).cloned().unwrap_or(PropertyValue::Null))
    }

    fn resolve(&self, expr: &Expression) -> ExecutionResult<PropertyValue> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Parameter(name) => self
                .params
                .and_then(|p| p.get(name))
                .cloned()
                .ok_or_else(|| ExecutionError::MissingParameter(name.clone())),
        }
    }

    // ---------------------------------------------------------- projection

    fn project(&self, patterns: &[PathPattern], rows: Vec<Binding>, clause: &ReturnClause) -> ExecutionResult<RecordBatch> {
        let limit = clause.limit.unwrap_or(usize::MAX);

        let items = match &clause.items {
            Some(items) => items.clone(),
            None => pattern_variables(patterns)
                .into_iter()
                .map(|v| ReturnItem {
                    expression: ReturnExpression::Variable(v),
                    alias: None,
                })
                .collect(),
        };
        let columns: Vec<String> = items.iter().map(ReturnItem::column_name).collect();
        let mut batch = RecordBatch::new(columns.clone());

        let counts = items
            .iter()
            .filter(|i| i.expression == ReturnExpression::CountStar)
            .count();
        if counts > 0 {
            if counts != items.len() {
                return Err(ExecutionError::Unsupported(
                    "count(*) cannot be combined with other return items".to_string(),
                ));
            }
            let mut record = Record::new();
            for column in &columns {
                record.insert(column.clone(), Value::Property(PropertyValue::Integer(rows.len() as i64)));
            }
            batch.push(record);
            batch.records.truncate(limit);
            return Ok(batch);
        }

        for row in rows.iter().take(limit) {
            let mut record = Record::new();
            for (item, column) in items.iter().zip(&columns) {
                let value = match &item.expression {
                    ReturnExpression::Variable(var) => match row.get(var) {
                        Some(Bound::Node(id)) => {
                            Value::Node(self.store.get_node(*id).ok_or(GraphError::NodeNotFound(*id))?.clone())
                        }
                        Some(Bound::Edge(id)) => Value::Edge(
                            self.store
                                .get_edge(*id)
                                .ok_or_else(|| ExecutionError::VariableNotFound(var.clone()))?
                                .clone(),
                        ),
                        None => return Err(ExecutionError::VariableNotFound(var.clone())),
                    },
                    ReturnExpression::Property { variable, property } => {
                        Value::Property(self.bound_property(row, variable, property)?)
                    }
                    ReturnExpression::CountStar => Value::Property(PropertyValue::Null),
                };
                record.insert(column.clone(), value);
            }
            batch.push(record);
        }
        Ok(batch)
    }

    // ------------------------------------------------------------- writing

    fn plan_create(&self, plan: &mut WritePlan<'_>, paths: &[PathPattern], mut row: Binding) -> ExecutionResult<()> {
        for path in paths {
            let mut current = self.create_or_reference(plan, &path.start, &mut row)?;
            for (rel, node) in &path.hops {
                let target = self.create_or_reference(plan, node, &mut row)?;
                let table = rel.table.as_ref().ok_or_else(|| {
                    ExecutionError::Unsupported("CREATE requires a relationship table".to_string())
                })?;
                let properties = self.resolve_properties(&rel.properties)?;
                let edge = plan.create_edge(table, current, target, properties)?;
                bind(&mut row, &rel.variable, Bound::Edge(edge));
                current = target;
            }
        }
        Ok(())
    }

    fn create_or_reference(&self, plan: &mut WritePlan<'_>, pattern: &NodePattern, row: &mut Binding) -> ExecutionResult<NodeId> {
        if let Some(var) = &pattern.variable {
            match row.get(var) {
                Some(Bound::Node(id)) => {
                    if pattern.table.is_some() || !pattern.properties.is_empty() {
                        return Err(ExecutionError::Unsupported(format!(
                            "{} is already bound and cannot be redeclared",
                            var
                        )));
                    }
                    return Ok(*id);
                }
                Some(Bound::Edge(_)) => {
                    return Err(ExecutionError::TypeError(format!("{} is bound to a relationship", var)))
                }
                None => {}
            }
        }

        let table = pattern.table.as_ref().ok_or_else(|| {
            ExecutionError::Unsupported("CREATE requires a node table".to_string())
        })?;
        let properties = self.resolve_properties(&pattern.properties)?;
        let id = plan.create_node(table, properties)?;
        bind(row, &pattern.variable, Bound::Node(id));
        Ok(id)
    }

    fn resolve_properties(&self, properties: &[(String, Expression)]) -> ExecutionResult<PropertyMap> {
        properties
            .iter()
            .map(|(key, expr)| Ok((key.clone(), self.resolve(expr)?)))
            .collect()
    }
}

fn bind(row: &mut Binding, variable: &Option<String>, value: Bound) {
    if let Some(var) = variable {
        row.insert(var.clone(), value);
    }
}

/// Named variables in order of first appearance
fn pattern_variables(patterns: &[PathPattern]) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    let mut push = |v: &Option<String>| {
        if let Some(v) = v {
            if !vars.contains(v) {
                vars.push(v.clone());
            }
        }
    };
    for path in patterns {
        push(&path.start.variable);
        for (rel, node) in &path.hops {
            push(&rel.variable);
            push(&node.variable);
        }
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_statements;

    fn run(store: &mut GraphStore, text: &str) -> RecordBatch {
        let mut last = RecordBatch::empty();
        for statement in parse_statements(text).unwrap() {
            let executor = QueryExecutor::new(store, None);
            if statement.is_read_only() {
                last = executor.execute_read(&statement).unwrap();
            } else {
                let mutations = executor.plan_write(&statement).unwrap();
                store.apply(mutations);
                last = RecordBatch::empty();
            }
        }
        last
    }

    fn seeded_store() -> GraphStore {
        let mut store = GraphStore::new();
        run(
            &mut store,
            "CREATE NODE TABLE Person (id SERIAL, name STRING, level UINT8, PRIMARY KEY (id));
             CREATE REL TABLE KNOWS (FROM Person TO Person, since INT64);
             CREATE (a:Person {name: 'Ada', level: 3});
             CREATE (b:Person {name: 'Bob', level: 1});
             CREATE (c:Person {name: 'Cy'});
             MATCH (a:Person), (b:Person) WHERE a.name = 'Ada' AND b.name = 'Bob' CREATE (a)-[:KNOWS {since: 2020}]->(b);",
        );
        store
    }

    #[test]
    fn test_match_return_properties() {
        let mut store = seeded_store();
        let batch = run(&mut store, "MATCH (p:Person) WHERE p.level >= 1 RETURN p.name AS name");
        let names: Vec<&str> = batch.column("name").iter().filter_map(|v| v.as_string()).collect();
        assert_eq!(names, vec!["Ada", "Bob"]);
        assert_eq!(batch.columns, vec!["name".to_string()]);
    }

    #[test]
    fn test_traversal_and_count() {
        let mut store = seeded_store();
        let batch = run(&mut store, "MATCH (a:Person)-[k:KNOWS]->(b:Person) RETURN a.name, k.since, b.name");
        assert_eq!(batch.len(), 1);
        let record = &batch.records[0];
        assert_eq!(record.get("a.name").and_then(Value::as_string), Some("Ada"));
        assert_eq!(record.get("k.since").and_then(Value::as_integer), Some(2020));
        assert_eq!(record.get("b.name").and_then(Value::as_string), Some("Bob"));

        let count = run(&mut store, "MATCH (p:Person) WHERE p.name <> 'Cy' RETURN count(*)");
        assert_eq!(count.records[0].get("count(*)").and_then(Value::as_integer), Some(2));
    }

    #[test]
    fn test_return_star_and_limit() {
        let mut store = seeded_store();
        let batch = run(&mut store, "MATCH (p:Person) RETURN * LIMIT 2");
        assert_eq!(batch.columns, vec!["p".to_string()]);
        assert_eq!(batch.len(), 2);
        assert!(batch.records[0].get("p").and_then(Value::as_node).is_some());
    }

    #[test]
    fn test_match_create_for_every_binding() {
        let mut store = seeded_store();
        run(
            &mut store,
            "MATCH (a:Person), (b:Person) WHERE a.name = 'Cy' AND b.level <= 3 CREATE (a)-[:KNOWS]->(b)",
        );
        assert_eq!(store.edge_count(), 3);
    }

    #[test]
    fn test_show_tables() {
        let mut store = seeded_store();
        let batch = run(&mut store, "CALL SHOW_TABLES() RETURN *");
        let names: Vec<&str> = batch.column("name").iter().filter_map(|v| v.as_string()).collect();
        let kinds: Vec<&str> = batch.column("type").iter().filter_map(|v| v.as_string()).collect();
        assert_eq!(names, vec!["Person", "KNOWS"]);
        assert_eq!(kinds, vec!["NODE", "REL"]);
    }

    #[test]
    fn test_parameters() {
        let store = seeded_store();
        let mut params = Parameters::new();
        params.insert("who".to_string(), "Bob".into());
        let statement = parse_statements("MATCH (p:Person) WHERE p.name = $who RETURN p.level").unwrap();
        let executor = QueryExecutor::new(&store, Some(&params));
        let batch = executor.execute_read(&statement[0]).unwrap();
        assert_eq!(batch.records[0].get("p.level").and_then(Value::as_integer), Some(1));

        let missing = QueryExecutor::new(&store, None).execute_read(&statement[0]);
        assert!(matches!(missing, Err(ExecutionError::MissingParameter(_))));
    }

    #[test]
    fn test_errors() {
        let store = seeded_store();
        let executor = QueryExecutor::new(&store, None);

        let unknown_column = parse_statements("MATCH (p:Person) WHERE p.age = 3 RETURN p").unwrap();
        assert!(matches!(
            executor.execute_read(&unknown_column[0]),
            Err(ExecutionError::Graph(GraphError::ColumnNotFound { .. }))
        ));

        let unknown_table = parse_statements("MATCH (p:Robot) RETURN p").unwrap();
        assert!(matches!(
            executor.execute_read(&unknown_table[0]),
            Err(ExecutionError::Graph(GraphError::TableNotFound(_)))
        ));

        let unknown_call = parse_statements("CALL DROP_ALL() RETURN *").unwrap();
        assert!(matches!(
            executor.execute_read(&unknown_call[0]),
            Err(ExecutionError::UnknownProcedure(_))
        ));

        let wrong_endpoint = parse_statements("CREATE (a:Person {name: 'x'})-[:MISSING]->(b:Person {name: 'y'})").unwrap();
        assert!(executor.plan_write(&wrong_endpoint[0]).is_err());
    }
}
