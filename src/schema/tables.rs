//! Vector store tables and their columns

use crate::error::Error;
use crate::vector::{Field, FieldType, TableSchema};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One vector store table per entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Guidelines,
    LanguageContexts,
    Preferences,
    Rules,
    SourceStructures,
    Code,
    Abstractions,
}

impl TableName {
    pub const ALL: [TableName; 7] = [
        TableName::Guidelines,
        TableName::LanguageContexts,
        TableName::Preferences,
        TableName::Rules,
        TableName::SourceStructures,
        TableName::Code,
        TableName::Abstractions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Guidelines => "guidelines",
            TableName::LanguageContexts => "language_contexts",
            TableName::Preferences => "preferences",
            TableName::Rules => "rules",
            TableName::SourceStructures => "source_structures",
            TableName::Code => "code",
            TableName::Abstractions => "abstractions",
        }
    }

    /// Column layout of the table
    pub fn schema(&self) -> TableSchema {
        use FieldType::{Float32Vector, Utf8, Utf8List};

        let mut fields = vec![Field::required("key", Utf8)];
        if *self != TableName::LanguageContexts {
            fields.push(Field::required("language_context_key", Utf8));
        }

        match self {
            TableName::LanguageContexts => fields.extend([
                Field::required("language", Utf8),
                Field::required("context", Utf8),
                Field::required("description", Utf8),
            ]),
            TableName::Preferences => fields.extend([
                Field::required("name", Utf8),
                Field::required("description", Utf8),
                Field::optional("tags", Utf8List),
            ]),
            TableName::Rules => fields.extend([
                Field::required("name", Utf8),
                Field::required("description", Utf8),
                Field::optional("rule_type", Utf8),
                Field::optional("violations_action", Utf8),
            ]),
            TableName::Guidelines => fields.extend([
                Field::required("name", Utf8),
                Field::required("description", Utf8),
                Field::optional("category", Utf8),
                Field::optional("examples", Utf8List),
            ]),
            TableName::SourceStructures => fields.extend([
                Field::required("path", Utf8),
                Field::required("description", Utf8),
                Field::optional("structure_type", Utf8),
            ]),
            TableName::Abstractions => fields.extend([
                Field::required("name", Utf8),
                Field::required("description", Utf8),
                Field::optional("abstraction_type", Utf8),
                Field::optional("content", Utf8),
                Field::optional("tags", Utf8List),
            ]),
            TableName::Code => fields.extend([
                Field::required("name", Utf8),
                Field::required("description", Utf8),
                Field::required("content", Utf8),
                Field::optional("tags", Utf8List),
            ]),
        }

        fields.push(Field::required("embedding", Float32Vector));
        TableSchema::new(fields)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown table: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for table in TableName::ALL {
            assert_eq!(table.as_str().parse::<TableName>().unwrap(), table);
        }
        assert!("snippets".parse::<TableName>().is_err());
    }

    #[test]
    fn test_every_table_has_key_and_embedding() {
        for table in TableName::ALL {
            let schema = table.schema();
            assert!(!schema.field("key").unwrap().nullable);
            assert_eq!(schema.vector_column().map(|f| f.name.as_str()), Some("embedding"));
        }
    }

    #[test]
    fn test_only_root_lacks_context_reference() {
        for table in TableName::ALL {
            let has_reference = table.schema().field("language_context_key").is_some();
            assert_eq!(has_reference, table != TableName::LanguageContexts, "{}", table);
        }
    }
}
