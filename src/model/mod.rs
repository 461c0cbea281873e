//! Knowledge-base data model
//!
//! [`Entity`] is what the stores hold; [`Task`] is a request to create one.
//! Both are closed sums over the seven entity kinds.

pub mod entity;
pub mod status;
pub mod task;

pub use entity::{Abstraction, Code, Entity, Guideline, LanguageContext, Preference, Rule, SourceStructure};
pub use status::TaskStatus;
pub use task::{
    CreateAbstractionTask, CreateCodeTask, CreateGuidelineTask, CreateLanguageContextTask, CreatePreferenceTask,
    CreateRuleTask, CreateSourceStructureTask, Task,
};

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Equality conditions plus paging for a vector store scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    pub conditions: BTreeMap<String, JsonValue>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `column = value` condition
    pub fn with_condition(mut self, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.conditions.insert(column.into(), value.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}
