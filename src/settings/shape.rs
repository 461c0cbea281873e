//! Structural comparison of settings documents
//!
//! Two documents have the same structure when they have the same keys at
//! every nesting level and the same TOML type at every leaf. Values are
//! ignored, and arrays match any other array regardless of length or
//! element types.

use std::collections::BTreeMap;
use toml::{Table, Value};

#[derive(Debug, PartialEq, Eq)]
enum Shape {
    Table(BTreeMap<String, Shape>),
    Leaf(&'static str),
}

fn shape_of(value: &Value) -> Shape {
    match value {
        Value::Table(table) => table_shape(table),
        Value::Array(_) => Shape::Leaf("array"),
        Value::String(_) => Shape::Leaf("string"),
        Value::Integer(_) => Shape::Leaf("integer"),
        Value::Float(_) => Shape::Leaf("float"),
        Value::Boolean(_) => Shape::Leaf("boolean"),
        Value::Datetime(_) => Shape::Leaf("datetime"),
    }
}

fn table_shape(table: &Table) -> Shape {
    Shape::Table(
        table
            .iter()
            .map(|(key, value)| (key.clone(), shape_of(value)))
            .collect(),
    )
}

/// Check that two documents are structurally equal
pub fn eq_struct(a: &Table, b: &Table) -> bool {
    table_shape(a) == table_shape(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Table {
        text.parse::<Table>().unwrap()
    }

    #[test]
    fn test_reflexive() {
        let d = doc("a = 1\n[b]\nc = 'x'\nd = [1, 2]\n[b.e]\nf = true");
        assert!(eq_struct(&d, &d));
    }

    #[test]
    fn test_values_are_ignored() {
        assert!(eq_struct(&doc("a = 1\nb = 'x'"), &doc("a = 99\nb = 'y'")));
        assert!(eq_struct(&doc("a = [1, 2, 3]"), &doc("a = ['x']")));
        assert!(eq_struct(&doc("a = []"), &doc("a = [[1], [2]]")));
    }

    #[test]
    fn test_key_sets_must_match() {
        assert!(!eq_struct(&doc("a = 1"), &doc("a = 1\nb = 1")));
        assert!(!eq_struct(&doc("[t]\na = 1"), &doc("[t]\nb = 1")));
        assert!(!eq_struct(&doc("[t.u]\na = 1"), &doc("[t.u]\na = 1\nextra = 2")));
    }

    #[test]
    fn test_leaf_types_must_match() {
        assert!(!eq_struct(&doc("a = 1"), &doc("a = '1'")));
        assert!(!eq_struct(&doc("a = 1"), &doc("a = 1.0")));
        assert!(!eq_struct(&doc("a = true"), &doc("a = 'true'")));
        assert!(!eq_struct(&doc("a = [1]"), &doc("[a]\nb = 1")));
        assert!(!eq_struct(&doc("[a]\nb = 1"), &doc("a = 1")));
    }
}
