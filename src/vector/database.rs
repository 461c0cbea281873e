//! Vector database: table catalog, row storage and queries
//!
//! Column families:
//! - `catalog`: table name -> JSON [`TableSchema`], including the vector
//!   dimension once the first row fixes it
//! - `rows`: `{table}:{seq:016x}` -> JSON [`Row`]
//!
//! All writes go through one writer lock, which also hands out row
//! sequence numbers. Updates read, merge and rewrite rows inside that lock
//! in a single batch, so readers never observe a row as missing.

use super::distance::DistanceMetric;
use super::filter::Filter;
use super::schema::{Row, TableSchema};
use super::{VectorError, VectorResult, DISTANCE_COLUMN};
use crate::persistence::{open_db, StorageError};
use rocksdb::{Direction, IteratorMode, WriteBatch, DB};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const CATALOG_CF: &str = "catalog";
const ROWS_CF: &str = "rows";

/// An embedded vector database rooted at one directory
pub struct VectorDatabase {
    db: DB,
    path: PathBuf,
    /// Single-writer lock guarding the next row sequence number
    writer: Mutex<u64>,
}

impl VectorDatabase {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> VectorResult<Self> {
        let path = path.as_ref().to_path_buf();
        let db = open_db(&path, &[CATALOG_CF, ROWS_CF])?;

        let next_seq = {
            let rows = cf(&db, ROWS_CF)?;
            let mut next = 0u64;
            for item in db.iterator_cf(rows, IteratorMode::Start) {
                let (key, _) = item?;
                if let Some(seq) = parse_seq(&key) {
                    next = next.max(seq + 1);
                }
            }
            next
        };

        info!("Vector database ready at {}", path.display());
        Ok(Self {
            db,
            path,
            writer: Mutex::new(next_seq),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> VectorResult<Vec<String>> {
        let catalog = cf(&self.db, CATALOG_CF)?;
        let mut names = Vec::new();
        for item in self.db.iterator_cf(catalog, IteratorMode::Start) {
            let (key, _) = item?;
            names.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(names)
    }

    /// Create a new table; fails if it already exists
    pub fn create_table(&self, name: &str, schema: TableSchema) -> VectorResult<Table<'_>> {
        validate_table_name(name)?;
        let _writer = self.lock()?;
        let catalog = cf(&self.db, CATALOG_CF)?;
        if self.db.get_cf(catalog, name.as_bytes())?.is_some() {
            return Err(VectorError::TableExists(name.to_string()));
        }
        self.db
            .put_cf(catalog, name.as_bytes(), serde_json::to_vec(&schema)?)?;
        info!("Created vector table {}", name);
        Ok(Table {
            db: self,
            name: name.to_string(),
            schema,
        })
    }

    /// Open an existing table
    pub fn open_table(&self, name: &str) -> VectorResult<Table<'_>> {
        Ok(Table {
            db: self,
            name: name.to_string(),
            schema: self.load_schema(name)?,
        })
    }

    fn load_schema(&self, name: &str) -> VectorResult<TableSchema> {
        let catalog = cf(&self.db, CATALOG_CF)?;
        let bytes = self
            .db
            .get_cf(catalog, name.as_bytes())?
            .ok_or_else(|| VectorError::TableNotFound(name.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn lock(&self) -> VectorResult<MutexGuard<'_, u64>> {
        self.writer.lock().map_err(|_| VectorError::LockPoisoned)
    }
}

/// Handle to one table
pub struct Table<'a> {
    db: &'a VectorDatabase,
    name: String,
    schema: TableSchema,
}

impl<'a> Table<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Length of the vectors stored in this table, once a row has fixed it
    pub fn dimension(&self) -> VectorResult<Option<usize>> {
        Ok(self.db.load_schema(&self.name)?.dimension())
    }

    /// Append rows after checking them against the schema and the table's
    /// vector dimension
    pub fn add(&self, rows: Vec<Row>) -> VectorResult<()> {
        let conformed = rows
            .iter()
            .map(|row| self.schema.conform(&self.name, row))
            .collect::<VectorResult<Vec<Row>>>()?;

        let mut next_seq = self.db.lock()?;
        let rows_cf = cf(&self.db.db, ROWS_CF)?;
        let mut batch = WriteBatch::default();
        self.check_dimension(&mut batch, &conformed)?;
        for row in &conformed {
            batch.put_cf(rows_cf, self.row_key(*next_seq), serde_json::to_vec(row)?);
            *next_seq += 1;
        }
        self.db.db.write(batch)?;
        debug!("Added {} rows to {}", conformed.len(), self.name);
        Ok(())
    }

    /// Remove every row matching `filter`; returns how many were removed
    pub fn delete(&self, filter: &Filter) -> VectorResult<usize> {
        filter.validate(&self.name, &self.schema)?;
        let _writer = self.db.lock()?;
        let rows_cf = cf(&self.db.db, ROWS_CF)?;

        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for (key, _) in self.scan(filter)? {
            batch.delete_cf(rows_cf, key);
            removed += 1;
        }
        self.db.db.write(batch)?;
        debug!("Deleted {} rows from {}", removed, self.name);
        Ok(removed)
    }

    /// Merge `patch` into every row matching `filter`.
    ///
    /// Each matching row is replaced by the merged row, appended at the end
    /// of the table. Returns how many rows were updated; nothing is written
    /// when no row matches.
    pub fn update(&self, filter: &Filter, patch: &Row) -> VectorResult<usize> {
        filter.validate(&self.name, &self.schema)?;
        let mut next_seq = self.db.lock()?;
        let rows_cf = cf(&self.db.db, ROWS_CF)?;

        let matches = self.scan(filter)?;
        if matches.is_empty() {
            return Ok(0);
        }

        let mut merged = Vec::with_capacity(matches.len());
        for (key, mut row) in matches.iter().cloned() {
            for (column, value) in patch {
                row.insert(column.clone(), value.clone());
            }
            merged.push((key, self.schema.conform(&self.name, &row)?));
        }

        let mut batch = WriteBatch::default();
        let rows: Vec<Row> = merged.iter().map(|(_, row)| row.clone()).collect();
        self.check_dimension(&mut batch, &rows)?;
        for (key, row) in &merged {
            batch.delete_cf(rows_cf, key);
            batch.put_cf(rows_cf, self.row_key(*next_seq), serde_json::to_vec(row)?);
            *next_seq += 1;
        }
        self.db.db.write(batch)?;
        debug!("Updated {} rows in {}", matches.len(), self.name);
        Ok(matches.len())
    }

    pub fn count_rows(&self) -> VectorResult<usize> {
        Ok(self.scan(&Filter::new())?.len())
    }

    /// Start building a query
    pub fn query(&self) -> Query<'_, 'a> {
        Query {
            table: self,
            filter: Filter::new(),
            limit: None,
            offset: 0,
            vector: None,
            metric: DistanceMetric::default(),
        }
    }

    /// Check `rows` against the dimension in the catalog, recording it in
    /// `batch` when these rows are the first to fix it. Call with the
    /// writer lock held.
    fn check_dimension(&self, batch: &mut WriteBatch, rows: &[Row]) -> VectorResult<()> {
        let schema = self.db.load_schema(&self.name)?;
        if let Some(dimension) = schema.check_dimension(&self.name, rows)? {
            let catalog = cf(&self.db.db, CATALOG_CF)?;
            batch.put_cf(
                catalog,
                self.name.as_bytes(),
                serde_json::to_vec(&schema.with_dimension(dimension))?,
            );
            info!("Vector dimension of {} fixed at {}", self.name, dimension);
        }
        Ok(())
    }

    /// Matching rows in insertion order, with their storage keys
    fn scan(&self, filter: &Filter) -> VectorResult<Vec<(Vec<u8>, Row)>> {
        let rows_cf = cf(&self.db.db, ROWS_CF)?;
        let prefix = format!("{}:", self.name);
        let mode = IteratorMode::From(prefix.as_bytes(), Direction::Forward);

        let mut rows = Vec::new();
        for item in self.db.db.iterator_cf(rows_cf, mode) {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let row: Row = serde_json::from_slice(&value)?;
            if filter.matches(&row) {
                rows.push((key.to_vec(), row));
            }
        }
        Ok(rows)
    }

    fn row_key(&self, seq: u64) -> Vec<u8> {
        format!("{}:{:016x}", self.name, seq).into_bytes()
    }
}

/// Query builder over one table
pub struct Query<'t, 'a> {
    table: &'t Table<'a>,
    filter: Filter,
    limit: Option<usize>,
    offset: usize,
    vector: Option<Vec<f32>>,
    metric: DistanceMetric,
}

impl<'t, 'a> Query<'t, 'a> {
    /// Restrict results to rows matching `filter`
    pub fn only_if(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Rank rows by distance to `vector` and add a `_distance` column
    pub fn nearest_to(mut self, vector: &[f32]) -> Self {
        self.vector = Some(vector.to_vec());
        self
    }

    pub fn distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn execute(self) -> VectorResult<Vec<Row>> {
        let table = self.table;
        self.filter.validate(&table.name, &table.schema)?;
        let rows: Vec<Row> = table.scan(&self.filter)?.into_iter().map(|(_, row)| row).collect();
        let limit = self.limit.unwrap_or(usize::MAX);

        let Some(query) = self.vector else {
            return Ok(rows.into_iter().skip(self.offset).take(limit).collect());
        };
        if let Some(expected) = table.dimension()? {
            if expected != query.len() {
                return Err(VectorError::DimensionMismatch {
                    expected,
                    got: query.len(),
                });
            }
        }

        let column = table
            .schema
            .vector_column()
            .ok_or_else(|| VectorError::SchemaViolation {
                table: table.name.clone(),
                reason: "table has no vector column".to_string(),
            })?
            .name
            .clone();

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(vector) = row.get(&column).and_then(as_vector) else {
                continue;
            };
            if vector.len() != query.len() {
                return Err(VectorError::DimensionMismatch {
                    expected: vector.len(),
                    got: query.len(),
                });
            }
            scored.push((self.metric.distance(&query, &vector), row));
        }
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .skip(self.offset)
            .take(limit)
            .map(|(distance, mut row)| {
                row.insert(DISTANCE_COLUMN.to_string(), JsonValue::from(distance));
                row
            })
            .collect())
    }
}

fn as_vector(value: &JsonValue) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

fn cf<'d>(db: &'d DB, name: &str) -> VectorResult<&'d rocksdb::ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| StorageError::ColumnFamily(name.to_string()).into())
}

fn parse_seq(key: &[u8]) -> Option<u64> {
    let text = std::str::from_utf8(key).ok()?;
    let (_, seq) = text.rsplit_once(':')?;
    u64::from_str_radix(seq, 16).ok()
}

fn validate_table_name(name: &str) -> VectorResult<()> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(VectorError::InvalidTableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::schema::{Field, FieldType};
    use serde_json::json;
    use tempfile::TempDir;

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            Field::required("key", FieldType::Utf8),
            Field::optional("name", FieldType::Utf8),
            Field::required("embedding", FieldType::Float32Vector),
        ])
    }

    fn row(key: &str, name: &str, embedding: [f32; 2]) -> Row {
        json!({"key": key, "name": name, "embedding": embedding})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_create_and_open_tables() {
        let temp_dir = TempDir::new().unwrap();
        let db = VectorDatabase::open(temp_dir.path()).unwrap();
        db.create_table("rules", schema()).unwrap();
        db.create_table("code", schema()).unwrap();

        assert_eq!(db.table_names().unwrap(), vec!["code".to_string(), "rules".to_string()]);
        assert!(matches!(db.create_table("rules", schema()), Err(VectorError::TableExists(_))));
        assert!(matches!(db.open_table("missing"), Err(VectorError::TableNotFound(_))));
        assert!(matches!(db.create_table("bad:name", schema()), Err(VectorError::InvalidTableName(_))));
        assert_eq!(db.open_table("rules").unwrap().schema(), &schema());
    }

    #[test]
    fn test_tables_do_not_share_rows() {
        let temp_dir = TempDir::new().unwrap();
        let db = VectorDatabase::open(temp_dir.path()).unwrap();
        let a = db.create_table("a", schema()).unwrap();
        let ab = db.create_table("ab", schema()).unwrap();
        a.add(vec![row("k1", "x", [0.0, 0.0])]).unwrap();
        ab.add(vec![row("k2", "y", [0.0, 0.0]), row("k3", "z", [0.0, 0.0])]).unwrap();

        assert_eq!(a.count_rows().unwrap(), 1);
        assert_eq!(ab.count_rows().unwrap(), 2);
    }

    #[test]
    fn test_filtered_query_with_offset() {
        let temp_dir = TempDir::new().unwrap();
        let db = VectorDatabase::open(temp_dir.path()).unwrap();
        let table = db.create_table("rules", schema()).unwrap();
        table
            .add(vec![
                row("k1", "same", [0.0, 0.0]),
                row("k2", "same", [1.0, 0.0]),
                row("k3", "other", [2.0, 0.0]),
            ])
            .unwrap();

        let rows = table
            .query()
            .only_if(Filter::new().equals("name", "same"))
            .offset(1)
            .execute()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["key"], json!("k2"));

        let unknown = table.query().only_if(Filter::new().equals("priority", 9)).execute();
        assert!(matches!(unknown, Err(VectorError::UnknownColumn { .. })));
    }

    #[test]
    fn test_nearest_neighbours_are_ordered() {
        let temp_dir = TempDir::new().unwrap();
        let db = VectorDatabase::open(temp_dir.path()).unwrap();
        let table = db.create_table("rules", schema()).unwrap();
        table
            .add(vec![
                row("far", "n", [10.0, 0.0]),
                row("near", "n", [1.0, 0.0]),
                row("mid", "n", [3.0, 0.0]),
            ])
            .unwrap();

        let rows = table.query().nearest_to(&[0.0, 0.0]).limit(2).execute().unwrap();
        let keys: Vec<&str> = rows.iter().filter_map(|r| r["key"].as_str()).collect();
        assert_eq!(keys, vec!["near", "mid"]);
        assert!((rows[0][DISTANCE_COLUMN].as_f64().unwrap() - 1.0).abs() < 1e-6);

        let mismatch = table.query().nearest_to(&[0.0, 0.0, 0.0]).execute();
        assert!(matches!(mismatch, Err(VectorError::DimensionMismatch { expected: 2, got: 3 })));
    }

    #[test]
    fn test_update_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let db = VectorDatabase::open(temp_dir.path()).unwrap();
        let table = db.create_table("rules", schema()).unwrap();
        table
            .add(vec![row("k1", "before", [0.0, 0.0]), row("k2", "other", [0.0, 0.0])])
            .unwrap();

        let patch = json!({"name": "after"}).as_object().cloned().unwrap();
        assert_eq!(table.update(&Filter::new().equals("key", "k1"), &patch).unwrap(), 1);
        assert_eq!(table.update(&Filter::new().equals("key", "nope"), &patch).unwrap(), 0);

        let rows = table.query().execute().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["key"], json!("k1"));
        assert_eq!(rows[1]["name"], json!("after"));

        let bad_patch = json!({"priority": 9}).as_object().cloned().unwrap();
        assert!(table.update(&Filter::new().equals("key", "k1"), &bad_patch).is_err());
        assert_eq!(table.count_rows().unwrap(), 2);

        assert_eq!(table.delete(&Filter::new().equals("key", "k1")).unwrap(), 1);
        assert_eq!(table.delete(&Filter::new().equals("key", "k1")).unwrap(), 0);
        assert_eq!(table.count_rows().unwrap(), 1);
    }

    #[test]
    fn test_first_row_fixes_dimension() {
        let temp_dir = TempDir::new().unwrap();
        {
            let db = VectorDatabase::open(temp_dir.path()).unwrap();
            let table = db.create_table("rules", schema()).unwrap();
            assert_eq!(table.dimension().unwrap(), None);
            table.add(vec![row("k1", "a", [1.0, 0.0])]).unwrap();
            assert_eq!(table.dimension().unwrap(), Some(2));
        }

        let db = VectorDatabase::open(temp_dir.path()).unwrap();
        let table = db.open_table("rules").unwrap();
        assert_eq!(table.dimension().unwrap(), Some(2));

        let short = json!({"key": "k2", "embedding": [1.0]}).as_object().cloned().unwrap();
        assert!(matches!(
            table.add(vec![short]),
            Err(VectorError::DimensionMismatch { expected: 2, got: 1 })
        ));
        let empty = json!({"key": "k3", "embedding": []}).as_object().cloned().unwrap();
        assert!(matches!(table.add(vec![empty]), Err(VectorError::SchemaViolation { .. })));

        let patch = json!({"embedding": [1.0, 2.0, 3.0]}).as_object().cloned().unwrap();
        assert!(table.update(&Filter::new().equals("key", "k1"), &patch).is_err());

        assert_eq!(table.count_rows().unwrap(), 1);
        let rows = table.query().nearest_to(&[0.0, 0.0]).execute().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(matches!(
            table.query().nearest_to(&[0.0]).execute(),
            Err(VectorError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_mixed_dimensions_in_one_batch_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let db = VectorDatabase::open(temp_dir.path()).unwrap();
        let table = db.create_table("rules", schema()).unwrap();
        let wide = json!({"key": "k2", "embedding": [1.0, 2.0, 3.0]}).as_object().cloned().unwrap();

        assert!(table.add(vec![row("k1", "a", [1.0, 0.0]), wide]).is_err());
        assert_eq!(table.count_rows().unwrap(), 0);
        assert_eq!(table.dimension().unwrap(), None);
    }

    #[test]
    fn test_sequence_continues_after_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let db = VectorDatabase::open(temp_dir.path()).unwrap();
            let table = db.create_table("rules", schema()).unwrap();
            table.add(vec![row("k1", "a", [0.0, 0.0])]).unwrap();
        }
        let db = VectorDatabase::open(temp_dir.path()).unwrap();
        let table = db.open_table("rules").unwrap();
        table.add(vec![row("k2", "b", [0.0, 0.0])]).unwrap();

        let keys: Vec<String> = table
            .query()
            .execute()
            .unwrap()
            .iter()
            .filter_map(|r| r["key"].as_str().map(str::to_string))
            .collect();
        assert_eq!(keys, vec!["k1".to_string(), "k2".to_string()]);
    }
}
