//! Model settings
//!
//! Settings map every [`ModelTask`] to the model that serves it. They are
//! loaded from TOML (see [`load_settings`]) and validated structurally
//! against the bundled default document with [`eq_struct`].
//!
//! Components take `&Settings` explicitly. A process-wide instance is
//! available through [`Settings::init_global`] for binaries that want one;
//! the first instance installed wins for the lifetime of the process.

pub mod loader;
pub mod shape;

pub use loader::{global, load_settings, load_user_settings, DEFAULT_SETTINGS};
pub use shape::eq_struct;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static GLOBAL: OnceLock<Settings> = OnceLock::new();

/// The kinds of work a model can be configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTask {
    Chat,
    Embedding,
    FunctionCalling,
    LongContext,
    QuestionAnswering,
    Rag,
    Summarization,
    TextClassification,
    TextExtraction,
    Thinking,
}

impl ModelTask {
    pub const ALL: [ModelTask; 10] = [
        ModelTask::Chat,
        ModelTask::Embedding,
        ModelTask::FunctionCalling,
        ModelTask::LongContext,
        ModelTask::QuestionAnswering,
        ModelTask::Rag,
        ModelTask::Summarization,
        ModelTask::TextClassification,
        ModelTask::TextExtraction,
        ModelTask::Thinking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTask::Chat => "chat",
            ModelTask::Embedding => "embedding",
            ModelTask::FunctionCalling => "function_calling",
            ModelTask::LongContext => "long_context",
            ModelTask::QuestionAnswering => "question_answering",
            ModelTask::Rag => "rag",
            ModelTask::Summarization => "summarization",
            ModelTask::TextClassification => "text_classification",
            ModelTask::TextExtraction => "text_extraction",
            ModelTask::Thinking => "thinking",
        }
    }
}

impl fmt::Display for ModelTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelTask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelTask::ALL
            .iter()
            .copied()
            .find(|task| task.as_str() == s)
            .ok_or_else(|| format!("Unknown model task: {}", s))
    }
}

/// Which model serves a task and where to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name as the provider knows it
    pub identifier: String,
    /// `ollama` or `openai`
    pub provider: String,
    pub api_base: String,
}

/// Validated model settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    models: BTreeMap<ModelTask, ModelConfig>,
}

impl Settings {
    pub fn new(models: BTreeMap<ModelTask, ModelConfig>) -> Self {
        Self { models }
    }

    /// Set the model for one task
    pub fn with_model(mut self, task: ModelTask, config: ModelConfig) -> Self {
        self.models.insert(task, config);
        self
    }

    pub fn model(&self, task: ModelTask) -> Option<&ModelConfig> {
        self.models.get(&task)
    }

    pub fn models(&self) -> &BTreeMap<ModelTask, ModelConfig> {
        &self.models
    }

    /// Install `settings` as the process-wide instance.
    ///
    /// Only the first call has an effect; every call returns the installed
    /// instance.
    pub fn init_global(settings: Settings) -> &'static Settings {
        GLOBAL.get_or_init(|| settings)
    }

    pub fn get_global() -> Option<&'static Settings> {
        GLOBAL.get()
    }

    pub(crate) fn global_cell() -> &'static OnceLock<Settings> {
        &GLOBAL
    }
}
