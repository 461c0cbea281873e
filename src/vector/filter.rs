//! Equality filters over vector store rows

use super::schema::{Row, TableSchema};
use super::{VectorError, VectorResult};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Conjunction of `column = value` conditions; empty matches every row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, JsonValue)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `column = value` condition
    pub fn equals(mut self, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[(String, JsonValue)] {
        &self.conditions
    }

    /// Every filtered column must exist in the table
    pub fn validate(&self, table: &str, schema: &TableSchema) -> VectorResult<()> {
        match self.conditions.iter().find(|(c, _)| schema.field(c).is_none()) {
            Some((column, _)) => Err(VectorError::UnknownColumn {
                table: table.to_string(),
                column: column.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|(column, expected)| {
            row.get(column)
                .is_some_and(|actual| values_equal(actual, expected))
        })
    }
}

impl From<BTreeMap<String, JsonValue>> for Filter {
    fn from(conditions: BTreeMap<String, JsonValue>) -> Self {
        Self {
            conditions: conditions.into_iter().collect(),
        }
    }
}

/// JSON equality where numbers compare by value (`9` equals `9.0`) and
/// null equals nothing
fn values_equal(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual, expected) {
        (JsonValue::Null, _) | (_, JsonValue::Null) => false,
        (JsonValue::Number(a), JsonValue::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> Row {
        json!({"key": "k1", "priority": 9, "note": null})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_matches_all_conditions() {
        assert!(Filter::new().matches(&row()));
        assert!(Filter::new().equals("key", "k1").equals("priority", 9.0).matches(&row()));
        assert!(!Filter::new().equals("key", "k1").equals("priority", 8).matches(&row()));
        assert!(!Filter::new().equals("note", JsonValue::Null).matches(&row()));
        assert!(!Filter::new().equals("missing", "x").matches(&row()));
    }

    #[test]
    fn test_from_map() {
        let mut map = BTreeMap::new();
        map.insert("key".to_string(), json!("k1"));
        let filter = Filter::from(map);
        assert_eq!(filter.conditions().len(), 1);
        assert!(filter.matches(&row()));
    }
}
