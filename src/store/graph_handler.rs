//! Graph store adapter
//!
//! Everything goes through statement text produced by
//! [`crate::statement`]; each call opens its own connection.

use crate::error::{Error, Result};
use crate::query::{Connection, Database, Parameters, QueryOutput, RecordBatch, Value};
use crate::schema::graph::{self, node_tables, rel_tables};
use crate::schema::{GraphNode, GraphRel, MatchCondition, NodeTableName};
use crate::statement;
use std::path::Path;
use tracing::{debug, info};

const COUNT_COLUMN: &str = "count(*)";

pub struct GraphStoreHandler {
    db: Database,
}

impl GraphStoreHandler {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            db: Database::open(path)?,
        })
    }

    /// Create every declared node table, then every relationship table
    pub fn init_tables(&self) -> Result<()> {
        let nodes = node_tables();
        let rels = rel_tables();
        graph::validate(&nodes, &rels)?;

        for table in &nodes {
            self.execute(&statement::create_node_table(table), None)?;
        }
        for table in &rels {
            self.execute(&statement::create_rel_table(table), None)?;
        }
        info!("Initialized {} node and {} relationship tables", nodes.len(), rels.len());
        Ok(())
    }

    pub fn create_node(&self, node: &GraphNode) -> Result<()> {
        self.execute(&statement::create_node(node), None)?;
        debug!("Created {} node", node.table);
        Ok(())
    }

    /// Connect the single node matching each side's conditions.
    ///
    /// Fails with [`Error::Execution`] unless exactly one node matches on
    /// each side.
    pub fn create_relationship(&self, rel: &GraphRel) -> Result<()> {
        graph::check_relationship(rel, &node_tables(), &rel_tables())?;

        for (side, table, conditions) in [
            ("from", rel.from_table, &rel.from_conditions),
            ("to", rel.to_table, &rel.to_conditions),
        ] {
            let matches = self.count_matches(table, conditions)?;
            if matches != 1 {
                return Err(Error::Execution(format!(
                    "{} needs exactly one {} node on the {} side, found {}",
                    rel.table, table, side, matches
                )));
            }
        }

        self.execute(&statement::create_relationship(rel), None)?;
        debug!("Created {} relationship", rel.table);
        Ok(())
    }

    /// Create `node` together with the relationship `rel` pointing at it.
    ///
    /// Both are written by one statement, so either both exist afterwards or
    /// neither does. The `from` side must match exactly one node.
    pub fn create_linked_node(&self, node: &GraphNode, rel: &GraphRel) -> Result<()> {
        graph::check_relationship(rel, &node_tables(), &rel_tables())?;
        if rel.to_table != node.table {
            return Err(Error::Schema(format!(
                "{} points to {}, not {}",
                rel.table, rel.to_table, node.table
            )));
        }

        let parents = self.count_matches(rel.from_table, &rel.from_conditions)?;
        if parents != 1 {
            return Err(Error::Execution(format!(
                "{} needs exactly one {} node on the from side, found {}",
                rel.table, rel.from_table, parents
            )));
        }

        self.execute(&statement::create_linked_node(node, rel), None)?;
        debug!("Created {} node linked by {}", node.table, rel.table);
        Ok(())
    }

    /// Number of nodes of `table` satisfying `conditions`
    pub fn count_matches(&self, table: NodeTableName, conditions: &[MatchCondition]) -> Result<usize> {
        let batch = self.execute(&statement::count_matches(table, conditions), None)?;
        batch
            .records
            .first()
            .and_then(|record| record.get(COUNT_COLUMN))
            .and_then(Value::as_integer)
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(|| Error::UnexpectedResultType("count query returned no count".to_string()))
    }

    /// Names of all node and relationship tables, in creation order
    pub fn table_names(&self) -> Result<Vec<String>> {
        let batch = self.execute(statement::show_tables(), None)?;
        Ok(batch
            .column("name")
            .into_iter()
            .filter_map(|value| value.as_string().map(str::to_string))
            .collect())
    }

    /// Run one statement; statement lists are rejected
    pub fn execute(&self, statement: &str, params: Option<&Parameters>) -> Result<RecordBatch> {
        match Connection::new(&self.db).execute(statement, params)? {
            QueryOutput::Single(batch) => Ok(batch),
            QueryOutput::Multiple(batches) => Err(Error::UnexpectedResultType(format!(
                "expected a single result, got {}",
                batches.len()
            ))),
        }
    }
}
