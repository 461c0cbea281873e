//! Column schemas for vector store tables

use super::{VectorError, VectorResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A stored row: column name to JSON value
pub type Row = serde_json::Map<String, JsonValue>;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Utf8,
    Int64,
    Float64,
    Boolean,
    /// List of strings
    Utf8List,
    /// Embedding vector; the table's search column
    Float32Vector,
}

impl FieldType {
    fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            FieldType::Utf8 => value.is_string(),
            FieldType::Int64 => value.is_i64() || value.is_u64(),
            FieldType::Float64 => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Utf8List => value
                .as_array()
                .is_some_and(|items| items.iter().all(JsonValue::is_string)),
            FieldType::Float32Vector => value
                .as_array()
                .is_some_and(|items| items.iter().all(JsonValue::is_number)),
        }
    }
}

/// A declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl Field {
    /// A column that must always hold a value
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
        }
    }

    /// A column that may be null or omitted
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }
}

/// Ordered list of columns, plus the vector column's length once the
/// first row fixes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dimension: Option<usize>,
}

impl TableSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            dimension: None,
        }
    }

    /// Fix the length every vector in the table must have
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The column nearest-neighbour search runs against
    pub fn vector_column(&self) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.field_type == FieldType::Float32Vector)
    }

    /// Check the vector column of `rows` against the table's dimension.
    ///
    /// Empty vectors are rejected. When the table has no dimension yet the
    /// first vector fixes it and the fixed dimension is returned, so the
    /// caller can record it; otherwise returns `None`.
    pub fn check_dimension(&self, table: &str, rows: &[Row]) -> VectorResult<Option<usize>> {
        let Some(column) = self.vector_column() else {
            return Ok(None);
        };

        let mut dimension = self.dimension;
        for row in rows {
            let Some(len) = row.get(&column.name).and_then(JsonValue::as_array).map(Vec::len) else {
                continue;
            };
            if len == 0 {
                return Err(violation(table, format!("column {} holds an empty vector", column.name)));
            }
            match dimension {
                Some(expected) if expected != len => {
                    return Err(VectorError::DimensionMismatch { expected, got: len })
                }
                Some(_) => {}
                None => dimension = Some(len),
            }
        }
        Ok(if self.dimension.is_none() { dimension } else { None })
    }

    /// Check a row against the schema and return it with every column
    /// present, in schema order (omitted nullable columns become null)
    pub fn conform(&self, table: &str, row: &Row) -> VectorResult<Row> {
        if let Some(unknown) = row.keys().find(|k| self.field(k).is_none()) {
            return Err(VectorError::UnknownColumn {
                table: table.to_string(),
                column: unknown.clone(),
            });
        }

        let mut conformed = Row::new();
        for field in &self.fields {
            let value = row.get(&field.name).cloned().unwrap_or(JsonValue::Null);
            if value.is_null() {
                if !field.nullable {
                    return Err(violation(table, format!("column {} cannot be null", field.name)));
                }
            } else if !field.field_type.accepts(&value) {
                return Err(violation(
                    table,
                    format!("column {} expects {:?}, got {}", field.name, field.field_type, value),
                ));
            }
            conformed.insert(field.name.clone(), value);
        }
        Ok(conformed)
    }
}

fn violation(table: &str, reason: String) -> VectorError {
    VectorError::SchemaViolation {
        table: table.to_string(),
        reason,
    }
}
