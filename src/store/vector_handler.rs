//! Vector store adapter

use crate::error::{Error, Result};
use crate::model::{Entity, QueryFilter};
use crate::schema::TableName;
use crate::vector::{Filter, Row, VectorDatabase};
use std::path::Path;
use tracing::{debug, info};

/// Results returned by [`VectorStoreHandler::search_vector`] when no limit
/// is given
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Entity persistence and similarity search over the vector store, one
/// table per entity kind
pub struct VectorStoreHandler {
    db: VectorDatabase,
}

impl VectorStoreHandler {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            db: VectorDatabase::open(path)?,
        })
    }

    /// Create every registered table that does not exist yet
    pub fn init_tables(&self) -> Result<()> {
        let existing = self.db.table_names()?;
        for table in TableName::ALL {
            if existing.iter().any(|name| name == table.as_str()) {
                continue;
            }
            self.db.create_table(table.as_str(), table.schema())?;
            info!("Initialized vector table {}", table);
        }
        Ok(())
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.db.table_names()?)
    }

    /// Append the entity to its table
    pub fn create_record(&self, entity: &Entity) -> Result<()> {
        let table = entity.table();
        self.db.open_table(table.as_str())?.add(vec![entity.to_row()?])?;
        debug!("Created record {} in {}", entity.key(), table);
        Ok(())
    }

    pub fn get_by_key(&self, table: TableName, key: &str) -> Result<Option<Row>> {
        let rows = self
            .db
            .open_table(table.as_str())?
            .query()
            .only_if(key_filter(key))
            .limit(1)
            .execute()?;
        Ok(rows.into_iter().next())
    }

    /// Filtered scan; no conditions means every row, subject to paging
    pub fn query(&self, table: TableName, filter: &QueryFilter) -> Result<Vec<Row>> {
        let table = self.db.open_table(table.as_str())?;
        let mut query = table
            .query()
            .only_if(Filter::from(filter.conditions.clone()));
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filter.offset {
            query = query.offset(offset);
        }
        Ok(query.execute()?)
    }

    /// Merge `fields` into the record with `key`.
    ///
    /// The read, merge and replace happen under the store's writer lock, so
    /// readers never observe the record missing.
    pub fn update_record(&self, table: TableName, key: &str, fields: Row) -> Result<()> {
        let updated = self.db.open_table(table.as_str())?.update(&key_filter(key), &fields)?;
        if updated == 0 {
            return Err(Error::NotFound {
                table: table.to_string(),
                key: key.to_string(),
            });
        }
        debug!("Updated record {} in {}", key, table);
        Ok(())
    }

    /// Delete the record with `key`; deleting an absent key succeeds
    pub fn delete_record(&self, table: TableName, key: &str) -> Result<()> {
        let removed = self.db.open_table(table.as_str())?.delete(&key_filter(key))?;
        debug!("Deleted {} records with key {} from {}", removed, key, table);
        Ok(())
    }

    /// Rows nearest to `embedding`, closest first, each with a `_distance`
    /// column.
    ///
    /// `filter` narrows and pages the ranked rows; `limit` takes precedence
    /// over the filter's own limit.
    pub fn search_vector(
        &self,
        table: TableName,
        embedding: &[f32],
        limit: Option<usize>,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<Row>> {
        let limit = limit
            .or_else(|| filter.and_then(|f| f.limit))
            .unwrap_or(DEFAULT_SEARCH_LIMIT);
        let table = self.db.open_table(table.as_str())?;
        let mut query = table
            .query()
            .nearest_to(embedding)
            .limit(limit);
        if let Some(filter) = filter {
            query = query.only_if(Filter::from(filter.conditions.clone()));
            if let Some(offset) = filter.offset {
                query = query.offset(offset);
            }
        }
        Ok(query.execute()?)
    }
}

fn key_filter(key: &str) -> Filter {
    Filter::new().equals("key", key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LanguageContext, Preference};
    use crate::vector::{VectorError, DISTANCE_COLUMN};
    use serde_json::{json, Value as JsonValue};
    use tempfile::TempDir;

    fn handler(temp_dir: &TempDir) -> VectorStoreHandler {
        let handler = VectorStoreHandler::open(temp_dir.path()).unwrap();
        handler.init_tables().unwrap();
        handler
    }

    fn preference(key: &str, name: &str, embedding: Vec<f32>) -> Entity {
        Entity::Preference(Preference {
            key: key.to_string(),
            language_context_key: "ctx".to_string(),
            name: name.to_string(),
            description: format!("Use {}", name),
            tags: None,
            embedding,
        })
    }

    #[test]
    fn test_init_tables_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(&temp_dir);
        handler.init_tables().unwrap();

        let names = handler.table_names().unwrap();
        assert_eq!(names.len(), TableName::ALL.len());
        assert!(names.contains(&"language_contexts".to_string()));
    }

    #[test]
    fn test_create_and_get_by_key() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(&temp_dir);
        let context = Entity::LanguageContext(LanguageContext {
            key: "ctx".to_string(),
            language: "rust".to_string(),
            context: "cli".to_string(),
            description: "Command line tools".to_string(),
            embedding: vec![0.0, 1.0],
        });
        handler.create_record(&context).unwrap();

        let row = handler.get_by_key(TableName::LanguageContexts, "ctx").unwrap().unwrap();
        assert_eq!(Entity::from_row(TableName::LanguageContexts, row).unwrap(), context);
        assert!(handler.get_by_key(TableName::LanguageContexts, "other").unwrap().is_none());
        assert!(handler.get_by_key(TableName::Preferences, "ctx").unwrap().is_none());
    }

    #[test]
    fn test_query_with_paging() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(&temp_dir);
        for (i, name) in ["cargo", "clippy", "rustfmt"].iter().enumerate() {
            handler
                .create_record(&preference(&format!("p{}", i), name, vec![i as f32, 0.0]))
                .unwrap();
        }

        assert_eq!(handler.query(TableName::Preferences, &QueryFilter::new()).unwrap().len(), 3);
        let page = handler
            .query(TableName::Preferences, &QueryFilter::new().with_offset(1).with_limit(1))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["name"], json!("clippy"));

        let filtered = handler
            .query(TableName::Preferences, &QueryFilter::new().with_condition("name", "rustfmt"))
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0]["key"], json!("p2"));

        let unknown = handler.query(TableName::Preferences, &QueryFilter::new().with_condition("colour", "red"));
        assert!(matches!(unknown, Err(Error::Vector(VectorError::UnknownColumn { .. }))));
    }

    #[test]
    fn test_update_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(&temp_dir);
        handler.create_record(&preference("p1", "cargo", vec![1.0, 0.0])).unwrap();

        let mut fields = Row::new();
        fields.insert("description".to_string(), json!("Build with cargo"));
        fields.insert("tags".to_string(), json!(["build"]));
        handler.update_record(TableName::Preferences, "p1", fields).unwrap();

        let row = handler.get_by_key(TableName::Preferences, "p1").unwrap().unwrap();
        assert_eq!(row["description"], json!("Build with cargo"));
        assert_eq!(row["name"], json!("cargo"));
        assert_eq!(row["tags"], json!(["build"]));
        assert_eq!(handler.query(TableName::Preferences, &QueryFilter::new()).unwrap().len(), 1);

        handler.delete_record(TableName::Preferences, "p1").unwrap();
        handler.delete_record(TableName::Preferences, "p1").unwrap();
        assert!(handler.get_by_key(TableName::Preferences, "p1").unwrap().is_none());
    }

    #[test]
    fn test_update_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(&temp_dir);
        handler.create_record(&preference("p1", "cargo", vec![1.0, 0.0])).unwrap();

        let mut fields = Row::new();
        fields.insert("name".to_string(), json!("changed"));
        let result = handler.update_record(TableName::Preferences, "missing", fields);
        assert!(matches!(result, Err(Error::NotFound { .. })));

        let rows = handler.query(TableName::Preferences, &QueryFilter::new()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("cargo"));
    }

    #[test]
    fn test_search_vector() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(&temp_dir);
        handler.create_record(&preference("far", "far", vec![10.0, 10.0])).unwrap();
        handler.create_record(&preference("near", "near", vec![1.0, 1.0])).unwrap();
        handler.create_record(&preference("mid", "mid", vec![3.0, 3.0])).unwrap();

        let rows = handler
            .search_vector(TableName::Preferences, &[0.0, 0.0], Some(2), None)
            .unwrap();
        let keys: Vec<&JsonValue> = rows.iter().map(|r| &r["key"]).collect();
        assert_eq!(keys, vec![&json!("near"), &json!("mid")]);
        assert!(rows[0].contains_key(DISTANCE_COLUMN));

        let filter = QueryFilter::new().with_condition("name", "far");
        let rows = handler
            .search_vector(TableName::Preferences, &[0.0, 0.0], None, Some(&filter))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["key"], json!("far"));

        let page = QueryFilter::new().with_offset(1).with_limit(1);
        let rows = handler
            .search_vector(TableName::Preferences, &[0.0, 0.0], None, Some(&page))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["key"], json!("mid"));

        let rows = handler
            .search_vector(TableName::Preferences, &[0.0, 0.0], Some(3), Some(&page))
            .unwrap();
        assert_eq!(rows.len(), 2);
    }
}
