//! Property values stored on nodes and edges
//!
//! Values are loosely typed at the statement level (a literal in query text
//! may be a string, a number, a boolean or null) and are coerced to the
//! declared column type when they are written into a table.

use super::catalog::ColumnKind;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A single property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl PropertyValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::Null => "Null",
        }
    }

    /// Convert a statement literal into the representation of a column type.
    ///
    /// Returns `None` when the value cannot be represented, e.g. `'abc'` for
    /// a `UINT8` column or `300` for the same column.
    pub fn coerce_to(&self, kind: ColumnKind) -> Option<PropertyValue> {
        if self.is_null() {
            return Some(PropertyValue::Null);
        }
        match kind {
            ColumnKind::String => match self {
                PropertyValue::String(s) => Some(PropertyValue::String(s.clone())),
                _ => None,
            },
            ColumnKind::UInt8 => {
                let value = match self {
                    PropertyValue::Integer(i) => *i,
                    PropertyValue::String(s) => s.trim().parse::<i64>().ok()?,
                    _ => return None,
                };
                (0..=i64::from(u8::MAX))
                    .contains(&value)
                    .then_some(PropertyValue::Integer(value))
            }
            ColumnKind::Int64 | ColumnKind::Serial => match self {
                PropertyValue::Integer(i) => Some(PropertyValue::Integer(*i)),
                PropertyValue::String(s) => s.trim().parse::<i64>().ok().map(PropertyValue::Integer),
                _ => None,
            },
            ColumnKind::Double => match self {
                PropertyValue::Float(f) => Some(PropertyValue::Float(*f)),
                PropertyValue::Integer(i) => Some(PropertyValue::Float(*i as f64)),
                PropertyValue::String(s) => s.trim().parse::<f64>().ok().map(PropertyValue::Float),
                _ => None,
            },
            ColumnKind::Boolean => match self {
                PropertyValue::Boolean(b) => Some(PropertyValue::Boolean(*b)),
                _ => None,
            },
        }
    }

    /// Compare two values for WHERE evaluation.
    ///
    /// Numbers compare numerically across integer/float, and a numeric string
    /// compares against a number after parsing, since generated statements
    /// quote every literal. Null is incomparable.
    pub fn compare(&self, other: &PropertyValue) -> Option<Ordering> {
        use PropertyValue::*;
        match (self, other) {
            (Null, _) | (_, Null) => None,
            (String(a), String(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Integer(_) | Float(_), Integer(_) | Float(_)) => {
                self.as_float()?.partial_cmp(&other.as_float()?)
            }
            (Integer(_) | Float(_), String(s)) => {
                let parsed = s.trim().parse::<f64>().ok()?;
                self.as_float()?.partial_cmp(&parsed)
            }
            (String(_), Integer(_) | Float(_)) => other.compare(self).map(Ordering::reverse),
            _ => None,
        }
    }

    /// Canonical text used in primary-key indexes
    pub(crate) fn index_key(&self) -> String {
        match self {
            PropertyValue::String(s) => format!("s:{}", s),
            PropertyValue::Integer(i) => format!("i:{}", i),
            PropertyValue::Float(f) => format!("f:{}", f),
            PropertyValue::Boolean(b) => format!("b:{}", b),
            PropertyValue::Null => "null".to_string(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// Property map for nodes and edges, ordered by property name
pub type PropertyMap = BTreeMap<String, PropertyValue>;
