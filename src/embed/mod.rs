//! Text embeddings
//!
//! The pipeline only needs [`Embedder::get_embedding`]; [`EmbeddingClient`]
//! implements it against an OpenAI-compatible or Ollama HTTP endpoint.

pub mod client;

pub use client::{EmbeddingClient, EmbeddingProvider};

use thiserror::Error;

/// Embed errors
#[derive(Error, Debug)]
pub enum EmbedError {
    /// The provider answered with an error or an unusable body
    #[error("Embedding API error: {0}")]
    ApiError(String),

    /// Missing or invalid model settings
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type EmbedResult<T> = Result<T, EmbedError>;

/// Turns text into a vector
pub trait Embedder: Send + Sync {
    fn get_embedding(&self, text: &str) -> EmbedResult<Vec<f32>>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn get_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        (**self).get_embedding(text)
    }
}

impl<E: Embedder + ?Sized> Embedder for std::sync::Arc<E> {
    fn get_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        (**self).get_embedding(text)
    }
}
