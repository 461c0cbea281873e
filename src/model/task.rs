//! Creation tasks
//!
//! A task mirrors one entity kind with `key` and `embedding` left optional.
//! The pipeline fills both in and converts the task with
//! [`Task::into_entity`].

use super::entity::*;
use crate::schema::TableName;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateLanguageContextTask {
    pub key: Option<String>,
    pub language: String,
    pub context: String,
    pub description: String,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePreferenceTask {
    pub key: Option<String>,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    pub tags: Option<Vec<String>>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRuleTask {
    pub key: Option<String>,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    pub rule_type: Option<String>,
    pub violations_action: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateGuidelineTask {
    pub key: Option<String>,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub examples: Option<Vec<String>>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSourceStructureTask {
    pub key: Option<String>,
    pub language_context_key: String,
    pub path: String,
    pub description: String,
    pub structure_type: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateAbstractionTask {
    pub key: Option<String>,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    pub abstraction_type: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCodeTask {
    pub key: Option<String>,
    pub language_context_key: String,
    pub name: String,
    pub description: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub embedding: Option<Vec<f32>>,
}

/// Any creation task
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    LanguageContext(CreateLanguageContextTask),
    Preference(CreatePreferenceTask),
    Guideline(CreateGuidelineTask),
    Rule(CreateRuleTask),
    SourceStructure(CreateSourceStructureTask),
    Abstraction(CreateAbstractionTask),
    Code(CreateCodeTask),
}

/// `Label: value` parts joined with `; `
struct Features(Vec<String>);

impl Features {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn field(mut self, label: &str, value: &str) -> Self {
        self.0.push(format!("{}: {}", label, value));
        self
    }

    fn optional(self, label: &str, value: Option<&String>) -> Self {
        match value {
            Some(value) => self.field(label, value),
            None => self,
        }
    }

    fn tags(self, tags: Option<&Vec<String>>) -> Self {
        match tags {
            Some(tags) if !tags.is_empty() => self.field("Tags", &tags.join(", ")),
            _ => self,
        }
    }

    /// Content goes on its own lines after the label
    fn content(mut self, content: Option<&String>) -> Self {
        if let Some(content) = content {
            self.0.push(format!("Content:\n{}", content));
        }
        self
    }

    fn finish(self) -> String {
        self.0.join("; ")
    }
}

impl Task {
    /// The vector store table the resulting entity goes to
    pub fn table(&self) -> TableName {
        match self {
            Task::LanguageContext(_) => TableName::LanguageContexts,
            Task::Preference(_) => TableName::Preferences,
            Task::Guideline(_) => TableName::Guidelines,
            Task::Rule(_) => TableName::Rules,
            Task::SourceStructure(_) => TableName::SourceStructures,
            Task::Abstraction(_) => TableName::Abstractions,
            Task::Code(_) => TableName::Code,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Task::LanguageContext(t) => t.key.as_deref(),
            Task::Preference(t) => t.key.as_deref(),
            Task::Guideline(t) => t.key.as_deref(),
            Task::Rule(t) => t.key.as_deref(),
            Task::SourceStructure(t) => t.key.as_deref(),
            Task::Abstraction(t) => t.key.as_deref(),
            Task::Code(t) => t.key.as_deref(),
        }
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        match self {
            Task::LanguageContext(t) => t.embedding.as_deref(),
            Task::Preference(t) => t.embedding.as_deref(),
            Task::Guideline(t) => t.embedding.as_deref(),
            Task::Rule(t) => t.embedding.as_deref(),
            Task::SourceStructure(t) => t.embedding.as_deref(),
            Task::Abstraction(t) => t.embedding.as_deref(),
            Task::Code(t) => t.embedding.as_deref(),
        }
    }

    /// Text the embedding is computed from: the task's descriptive fields
    /// in a fixed order, leaving out unset optional ones
    pub fn text_features(&self) -> String {
        let features = match self {
            Task::LanguageContext(t) => Features::new()
                .field("Language", &t.language)
                .field("Context", &t.context)
                .field("Description", &t.description),
            Task::Preference(t) => Features::new()
                .field("Name", &t.name)
                .field("Description", &t.description)
                .tags(t.tags.as_ref()),
            Task::Rule(t) => Features::new()
                .field("Name", &t.name)
                .field("Description", &t.description)
                .optional("Type", t.rule_type.as_ref()),
            Task::Guideline(t) => Features::new()
                .field("Name", &t.name)
                .field("Description", &t.description)
                .optional("Category", t.category.as_ref()),
            Task::SourceStructure(t) => Features::new()
                .field("Path", &t.path)
                .field("Description", &t.description)
                .optional("Type", t.structure_type.as_ref()),
            Task::Abstraction(t) => Features::new()
                .field("Name", &t.name)
                .field("Description", &t.description)
                .optional("Type", t.abstraction_type.as_ref())
                .tags(t.tags.as_ref())
                .content(t.content.as_ref()),
            Task::Code(t) => Features::new()
                .field("Name", &t.name)
                .field("Description", &t.description)
                .tags(t.tags.as_ref())
                .content(Some(&t.content)),
        };
        features.finish()
    }

    /// Build the entity with the final key and embedding
    pub fn into_entity(self, key: String, embedding: Vec<f32>) -> Entity {
        match self {
            Task::LanguageContext(t) => Entity::LanguageContext(LanguageContext {
                key,
                language: t.language,
                context: t.context,
                description: t.description,
                embedding,
            }),
            Task::Preference(t) => Entity::Preference(Preference {
                key,
                language_context_key: t.language_context_key,
                name: t.name,
                description: t.description,
                tags: t.tags,
                embedding,
            }),
            Task::Guideline(t) => Entity::Guideline(Guideline {
                key,
                language_context_key: t.language_context_key,
                name: t.name,
                description: t.description,
                category: t.category,
                examples: t.examples,
                embedding,
            }),
            Task::Rule(t) => Entity::Rule(Rule {
                key,
                language_context_key: t.language_context_key,
                name: t.name,
                description: t.description,
                rule_type: t.rule_type,
                violations_action: t.violations_action,
                embedding,
            }),
            Task::SourceStructure(t) => Entity::SourceStructure(SourceStructure {
                key,
                language_context_key: t.language_context_key,
                path: t.path,
                description: t.description,
                structure_type: t.structure_type,
                embedding,
            }),
            Task::Abstraction(t) => Entity::Abstraction(Abstraction {
                key,
                language_context_key: t.language_context_key,
                name: t.name,
                description: t.description,
                abstraction_type: t.abstraction_type,
                content: t.content,
                tags: t.tags,
                embedding,
            }),
            Task::Code(t) => Entity::Code(Code {
                key,
                language_context_key: t.language_context_key,
                name: t.name,
                description: t.description,
                content: t.content,
                tags: t.tags,
                embedding,
            }),
        }
    }
}

macro_rules! task_from {
    ($($variant:ident => $task:ty),* $(,)?) => {
        $(impl From<$task> for Task {
            fn from(task: $task) -> Self {
                Task::$variant(task)
            }
        })*
    };
}

task_from!(
    LanguageContext => CreateLanguageContextTask,
    Preference => CreatePreferenceTask,
    Guideline => CreateGuidelineTask,
    Rule => CreateRuleTask,
    SourceStructure => CreateSourceStructureTask,
    Abstraction => CreateAbstractionTask,
    Code => CreateCodeTask,
);
