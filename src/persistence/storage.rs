//! RocksDB persistence for the embedded graph store
//!
//! Column families:
//! - `catalog`: table definitions, keyed by creation sequence
//! - `nodes`: nodes keyed by id
//! - `edges`: edges keyed by id
//!
//! Records are bincode-encoded. The whole graph is loaded into a
//! [`GraphStore`] on open and every applied statement is written through
//! as a single batch.

use super::{open_db, StorageError, StorageResult};
use crate::graph::{Edge, GraphStore, Mutation, Node, TableDef};
use rocksdb::{IteratorMode, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CATALOG_CF: &str = "catalog";
const NODES_CF: &str = "nodes";
const EDGES_CF: &str = "edges";

/// Serialized table definition with its creation order
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTable {
    seq: u64,
    def: TableDef,
}

/// RocksDB-backed graph storage
pub struct GraphStorage {
    db: DB,
    path: PathBuf,
}

impl GraphStorage {
    /// Open or create graph storage at `path`
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let db = open_db(&path, &[CATALOG_CF, NODES_CF, EDGES_CF])?;
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebuild the in-memory store from disk
    pub fn load(&self) -> StorageResult<GraphStore> {
        let mut tables: Vec<StoredTable> = self.scan(CATALOG_CF)?;
        tables.sort_by_key(|t| t.seq);
        let nodes: Vec<Node> = self.scan(NODES_CF)?;
        let edges: Vec<Edge> = self.scan(EDGES_CF)?;

        info!(
            "Loaded graph storage: {} tables, {} nodes, {} edges",
            tables.len(),
            nodes.len(),
            edges.len()
        );

        let mut store = GraphStore::new();
        store.apply(tables.into_iter().map(|t| Mutation::CreateTable(t.def)));
        store.apply(nodes.into_iter().map(Mutation::CreateNode));
        store.apply(edges.into_iter().map(Mutation::CreateEdge));
        Ok(store)
    }

    /// Persist a statement's mutations atomically.
    ///
    /// `table_seq` is the number of tables already in the catalog.
    pub fn persist(&self, mutations: &[Mutation], table_seq: usize) -> StorageResult<()> {
        if mutations.is_empty() {
            return Ok(());
        }
        let catalog = self.cf(CATALOG_CF)?;
        let nodes = self.cf(NODES_CF)?;
        let edges = self.cf(EDGES_CF)?;

        let mut batch = WriteBatch::default();
        let mut seq = table_seq as u64;
        for mutation in mutations {
            match mutation {
                Mutation::CreateTable(def) => {
                    let stored = StoredTable { seq, def: def.clone() };
                    batch.put_cf(catalog, Self::id_key(seq), bincode::serialize(&stored)?);
                    seq += 1;
                }
                Mutation::CreateNode(node) => {
                    batch.put_cf(nodes, Self::id_key(node.id.as_u64()), bincode::serialize(node)?);
                }
                Mutation::CreateEdge(edge) => {
                    batch.put_cf(edges, Self::id_key(edge.id.as_u64()), bincode::serialize(edge)?);
                }
            }
        }
        self.db.write(batch)?;
        debug!("Persisted {} graph mutations", mutations.len());
        Ok(())
    }

    fn cf(&self, name: &str) -> StorageResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamily(name.to_string()))
    }

    fn scan<T: for<'de> Deserialize<'de>>(&self, cf_name: &str) -> StorageResult<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }

    fn id_key(id: u64) -> Vec<u8> {
        format!("{:016x}", id).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ColumnDef, ColumnKind, NodeTableDef, PropertyMap, PropertyValue, WritePlan};
    use tempfile::TempDir;

    fn tag_table() -> TableDef {
        TableDef::Node(NodeTableDef {
            name: "Tag".to_string(),
            columns: vec![
                ColumnDef::new("n_id", ColumnKind::Serial),
                ColumnDef::new("name", ColumnKind::String),
            ],
            primary_key: vec!["n_id".to_string()],
        })
    }

    #[test]
    fn test_storage_reload_restores_counters() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = GraphStorage::open(temp_dir.path()).unwrap();
            let mut store = storage.load().unwrap();

            let mut plan = WritePlan::new(&store);
            plan.create_table(tag_table(), false).unwrap();
            let mutations = plan.into_mutations();
            storage.persist(&mutations, store.catalog().len()).unwrap();
            store.apply(mutations);

            let mut plan = WritePlan::new(&store);
            let mut props = PropertyMap::new();
            props.insert("name".to_string(), PropertyValue::from("rust"));
            plan.create_node("Tag", props).unwrap();
            let mutations = plan.into_mutations();
            storage.persist(&mutations, store.catalog().len()).unwrap();
            store.apply(mutations);
        }

        let storage = GraphStorage::open(temp_dir.path()).unwrap();
        let store = storage.load().unwrap();
        assert_eq!(store.catalog().len(), 1);
        assert_eq!(store.node_count(), 1);

        let mut plan = WritePlan::new(&store);
        let id = plan.create_node("Tag", PropertyMap::new()).unwrap();
        let mutations = plan.into_mutations();
        match &mutations[0] {
            Mutation::CreateNode(node) => {
                assert_eq!(node.id, id);
                assert_eq!(node.get_property("n_id"), Some(&PropertyValue::Integer(1)));
            }
            other => panic!("unexpected mutation {:?}", other),
        }
    }

    #[test]
    fn test_persist_nothing_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let storage = GraphStorage::open(temp_dir.path()).unwrap();
        storage.persist(&[], 0).unwrap();
        assert_eq!(storage.load().unwrap().node_count(), 0);
        assert_eq!(storage.path(), temp_dir.path());
    }
}
