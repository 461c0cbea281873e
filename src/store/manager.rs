//! Task pipeline
//!
//! [`StoreManager::create`] takes a task through key assignment, embedding,
//! conversion and persistence. Failures along the way are logged and
//! reported as [`TaskStatus::Failure`] so callers can keep going with other
//! tasks. A failed create leaves neither store changed.

use super::{GraphStoreHandler, VectorStoreHandler};
use crate::embed::{Embedder, EmbeddingClient};
use crate::error::{Error, Result};
use crate::model::{Entity, QueryFilter, Task, TaskStatus};
use crate::paths::UserPaths;
use crate::schema::{
    GraphNode, GraphRel, MatchCondition, NodeTableName, Property, PropertyName, RelTableName, TableName,
};
use crate::settings::Settings;
use crate::vector::DISTANCE_COLUMN;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Entry point for creating and searching knowledge-base entities
pub struct StoreManager {
    vector: VectorStoreHandler,
    graph: Option<GraphStoreHandler>,
    embedder: Box<dyn Embedder>,
    /// Held from the key check until both stores are written
    writer: Mutex<()>,
}

impl StoreManager {
    pub fn new(vector: VectorStoreHandler, embedder: impl Embedder + 'static) -> Self {
        Self {
            vector,
            graph: None,
            embedder: Box::new(embedder),
            writer: Mutex::new(()),
        }
    }

    /// Mirror language contexts, preferences, guidelines, rules and source
    /// structures into `graph`
    pub fn with_graph(mut self, graph: GraphStoreHandler) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Open both stores under the user's data directory and initialize
    /// their tables
    pub fn open(paths: &UserPaths, settings: &Settings) -> Result<Self> {
        paths.ensure_dirs()?;
        let vector = VectorStoreHandler::open(paths.vector_store_dir())?;
        let graph = GraphStoreHandler::open(paths.graph_store_dir())?;
        let embedder = EmbeddingClient::from_settings(settings)?;

        let manager = Self::new(vector, embedder).with_graph(graph);
        manager.init_tables()?;
        info!("Knowledge store ready at {}", paths.data_dir().display());
        Ok(manager)
    }

    pub fn init_tables(&self) -> Result<()> {
        self.vector.init_tables()?;
        if let Some(graph) = &self.graph {
            graph.init_tables()?;
        }
        Ok(())
    }

    pub fn vector(&self) -> &VectorStoreHandler {
        &self.vector
    }

    pub fn graph(&self) -> Option<&GraphStoreHandler> {
        self.graph.as_ref()
    }

    /// Create the entity described by `task`.
    ///
    /// A missing key is replaced by a fresh UUID and a missing embedding is
    /// computed from the task's text features. Keys must be unused across
    /// all tables. Returns the stored entity on success.
    pub fn create(&self, task: Task) -> (TaskStatus, Option<Entity>) {
        let table = task.table();
        match self.try_create(task) {
            Ok(entity) => {
                info!("Created {} in {}", entity.key(), table);
                (TaskStatus::Success, Some(entity))
            }
            Err(e) => {
                warn!("Failed to create entity in {}: {}", table, e);
                (TaskStatus::Failure, None)
            }
        }
    }

    fn try_create(&self, task: Task) -> Result<Entity> {
        let key = match task.key() {
            Some(key) => key.to_string(),
            None => {
                let key = Uuid::new_v4().to_string();
                debug!("Assigned key {}", key);
                key
            }
        };
        let embedding = match task.embedding() {
            Some(embedding) => embedding.to_vec(),
            None => {
                let embedding = self.embedder.get_embedding(&task.text_features())?;
                debug!("Computed {}-dimensional embedding for {}", embedding.len(), key);
                embedding
            }
        };
        let entity = task.into_entity(key, embedding);

        let mirror = match &self.graph {
            Some(graph) => graph_mirror(&entity).map(|m| (graph, m)),
            None => None,
        };

        let _writer = self.writer.lock().map_err(|_| Error::LockPoisoned)?;
        let mirrored_table = mirror.as_ref().map(|(graph, (node, _))| (*graph, node.table));
        self.check_key_unused(&entity, mirrored_table)?;
        if let (Some((graph, _)), Some(context_key)) = (&mirror, entity.language_context_key()) {
            let parents = graph.count_matches(
                NodeTableName::LanguageContext,
                &[MatchCondition::equals(PropertyName::Key, context_key)],
            )?;
            if parents != 1 {
                return Err(Error::Execution(format!(
                    "expected one language context with key {}, found {}",
                    context_key, parents
                )));
            }
        }

        self.vector.create_record(&entity)?;
        if let Some((graph, (node, rel))) = mirror {
            let mirrored = match rel {
                Some(rel) => graph.create_linked_node(&node, &rel),
                None => graph.create_node(&node),
            };
            if let Err(e) = mirrored {
                self.remove_record(&entity);
                return Err(e);
            }
        }
        Ok(entity)
    }

    /// Fail with [`Error::DuplicateKey`] if any vector table, or the node
    /// table the entity is mirrored into, already holds its key
    fn check_key_unused(&self, entity: &Entity, node_table: Option<(&GraphStoreHandler, NodeTableName)>) -> Result<()> {
        let key = entity.key();
        for table in TableName::ALL {
            if self.vector.get_by_key(table, key)?.is_some() {
                return Err(Error::DuplicateKey {
                    table: table.to_string(),
                    key: key.to_string(),
                });
            }
        }
        if let Some((graph, table)) = node_table {
            if graph.count_matches(table, &[MatchCondition::equals(PropertyName::Key, key)])? > 0 {
                return Err(Error::DuplicateKey {
                    table: table.to_string(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Undo the vector write of a create whose graph mirror failed
    fn remove_record(&self, entity: &Entity) {
        match self.vector.delete_record(entity.table(), entity.key()) {
            Ok(()) => debug!("Removed {} from {} after graph failure", entity.key(), entity.table()),
            Err(e) => warn!("Could not remove {} from {}: {}", entity.key(), entity.table(), e),
        }
    }

    /// Entities of `table` closest to `query_text` or `embedding`.
    ///
    /// A given `embedding` is used as is; otherwise one is computed from
    /// `query_text`. `filter` narrows the candidates by equality on columns.
    /// Store and embedding failures are reported as [`TaskStatus::Failure`]
    /// with no entities.
    pub fn search_similar(
        &self,
        table: TableName,
        limit: Option<usize>,
        filter: Option<&QueryFilter>,
        query_text: Option<&str>,
        embedding: Option<&[f32]>,
    ) -> Result<(TaskStatus, Vec<Entity>)> {
        if query_text.is_none() && embedding.is_none() {
            return Err(Error::InvalidArgument(
                "either query_text or embedding must be provided".to_string(),
            ));
        }

        match self.try_search(table, limit, filter, query_text, embedding) {
            Ok(entities) => {
                debug!("Found {} similar entities in {}", entities.len(), table);
                Ok((TaskStatus::Success, entities))
            }
            Err(e) => {
                warn!("Similarity search in {} failed: {}", table, e);
                Ok((TaskStatus::Failure, Vec::new()))
            }
        }
    }

    fn try_search(
        &self,
        table: TableName,
        limit: Option<usize>,
        filter: Option<&QueryFilter>,
        query_text: Option<&str>,
        embedding: Option<&[f32]>,
    ) -> Result<Vec<Entity>> {
        let vector = match (embedding, query_text) {
            (Some(embedding), _) => embedding.to_vec(),
            (None, Some(text)) => self.embedder.get_embedding(text)?,
            (None, None) => return Ok(Vec::new()),
        };

        self.vector
            .search_vector(table, &vector, limit, filter)?
            .into_iter()
            .map(|mut row| {
                row.remove(DISTANCE_COLUMN);
                Entity::from_row(table, row)
            })
            .collect()
    }
}

/// Graph node for an entity and, below the root, the relationship from its
/// language context. Abstractions and code are not mirrored.
fn graph_mirror(entity: &Entity) -> Option<(GraphNode, Option<GraphRel>)> {
    use PropertyName::*;

    let (table, rel, properties) = match entity {
        Entity::LanguageContext(e) => (
            NodeTableName::LanguageContext,
            None,
            vec![
                Property::new(Language, &e.language),
                Property::new(Context, &e.context),
                Property::new(Description, &e.description),
            ],
        ),
        Entity::Preference(e) => (
            NodeTableName::Preference,
            Some(RelTableName::PrefersTool),
            vec![Property::new(Name, &e.name), Property::new(Description, &e.description)],
        ),
        Entity::Guideline(e) => (
            NodeTableName::Guideline,
            Some(RelTableName::FollowsGuideline),
            vec![Property::new(Name, &e.name), Property::new(Description, &e.description)],
        ),
        Entity::Rule(e) => (
            NodeTableName::Rule,
            Some(RelTableName::EnforcesRule),
            vec![Property::new(Name, &e.name), Property::new(Description, &e.description)],
        ),
        Entity::SourceStructure(e) => (
            NodeTableName::SourceStructure,
            Some(RelTableName::ContainsStructure),
            vec![Property::new(Path, &e.path), Property::new(Description, &e.description)],
        ),
        Entity::Abstraction(_) | Entity::Code(_) => return None,
    };

    let mut node_properties = vec![Property::new(Key, entity.key())];
    node_properties.extend(properties);
    let node = GraphNode {
        table,
        properties: Some(node_properties),
    };

    let rel = match (rel, entity.language_context_key()) {
        (Some(rel_table), Some(context_key)) => Some(GraphRel {
            table: rel_table,
            from_table: NodeTableName::LanguageContext,
            to_table: table,
            from_conditions: vec![MatchCondition::equals(Key, context_key)],
            to_conditions: vec![MatchCondition::equals(Key, entity.key())],
            properties: None,
        }),
        _ => None,
    };
    Some((node, rel))
}
