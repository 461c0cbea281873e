//! Persisted knowledge-base entities

use crate::error::Result;
use crate::schema::TableName;
use crate::vector::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Root entity: a programming language used in a particular domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageContext {
    pub key: String,
    pub language: String,
    pub context: String,
    pub description: String,
    pub embedding: Vec<f32>,
}

/// A preferred tool or library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub key: String,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub key: String,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,
    /// What to do when the rule is broken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations_action: Option<String>,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guideline {
    pub key: String,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
    pub embedding: Vec<f32>,
}

/// Description of a directory or file in a project layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStructure {
    pub key: String,
    pub language_context_key: String,
    pub path: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_type: Option<String>,
    pub embedding: Vec<f32>,
}

/// A reusable design abstraction (pattern, interface, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abstraction {
    pub key: String,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstraction_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub embedding: Vec<f32>,
}

/// A code snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub key: String,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub embedding: Vec<f32>,
}

/// Any persisted entity
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    LanguageContext(LanguageContext),
    Preference(Preference),
    Guideline(Guideline),
    Rule(Rule),
    SourceStructure(SourceStructure),
    Abstraction(Abstraction),
    Code(Code),
}

impl Entity {
    /// The vector store table holding this kind of entity
    pub fn table(&self) -> TableName {
        match self {
            Entity::LanguageContext(_) => TableName::LanguageContexts,
            Entity::Preference(_) => TableName::Preferences,
            Entity::Guideline(_) => TableName::Guidelines,
            Entity::Rule(_) => TableName::Rules,
            Entity::SourceStructure(_) => TableName::SourceStructures,
            Entity::Abstraction(_) => TableName::Abstractions,
            Entity::Code(_) => TableName::Code,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Entity::LanguageContext(e) => &e.key,
            Entity::Preference(e) => &e.key,
            Entity::Guideline(e) => &e.key,
            Entity::Rule(e) => &e.key,
            Entity::SourceStructure(e) => &e.key,
            Entity::Abstraction(e) => &e.key,
            Entity::Code(e) => &e.key,
        }
    }

    /// Key of the owning language context; `None` for the root kind
    pub fn language_context_key(&self) -> Option<&str> {
        match self {
            Entity::LanguageContext(_) => None,
            Entity::Preference(e) => Some(&e.language_context_key),
            Entity::Guideline(e) => Some(&e.language_context_key),
            Entity::Rule(e) => Some(&e.language_context_key),
            Entity::SourceStructure(e) => Some(&e.language_context_key),
            Entity::Abstraction(e) => Some(&e.language_context_key),
            Entity::Code(e) => Some(&e.language_context_key),
        }
    }

    pub fn embedding(&self) -> &[f32] {
        match self {
            Entity::LanguageContext(e) => &e.embedding,
            Entity::Preference(e) => &e.embedding,
            Entity::Guideline(e) => &e.embedding,
            Entity::Rule(e) => &e.embedding,
            Entity::SourceStructure(e) => &e.embedding,
            Entity::Abstraction(e) => &e.embedding,
            Entity::Code(e) => &e.embedding,
        }
    }

    /// Serialize to a row, leaving out unset optional fields
    pub fn to_row(&self) -> Result<Row> {
        let value = match self {
            Entity::LanguageContext(e) => serde_json::to_value(e)?,
            Entity::Preference(e) => serde_json::to_value(e)?,
            Entity::Guideline(e) => serde_json::to_value(e)?,
            Entity::Rule(e) => serde_json::to_value(e)?,
            Entity::SourceStructure(e) => serde_json::to_value(e)?,
            Entity::Abstraction(e) => serde_json::to_value(e)?,
            Entity::Code(e) => serde_json::to_value(e)?,
        };
        match value {
            JsonValue::Object(row) => Ok(row),
            _ => Ok(Row::new()),
        }
    }

    /// Decode a row of `table`; columns the entity does not know are ignored
    pub fn from_row(table: TableName, row: Row) -> Result<Entity> {
        let value = JsonValue::Object(row);
        Ok(match table {
            TableName::LanguageContexts => Entity::LanguageContext(serde_json::from_value(value)?),
            TableName::Preferences => Entity::Preference(serde_json::from_value(value)?),
            TableName::Guidelines => Entity::Guideline(serde_json::from_value(value)?),
            TableName::Rules => Entity::Rule(serde_json::from_value(value)?),
            TableName::SourceStructures => Entity::SourceStructure(serde_json::from_value(value)?),
            TableName::Abstractions => Entity::Abstraction(serde_json::from_value(value)?),
            TableName::Code => Entity::Code(serde_json::from_value(value)?),
        })
    }
}
