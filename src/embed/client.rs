//! HTTP embedding client for the configured provider

use crate::embed::{EmbedError, EmbedResult, Embedder};
use crate::settings::{ModelTask, Settings};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Supported embedding APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    OpenAI,
    Ollama,
}

impl FromStr for EmbeddingProvider {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(EmbeddingProvider::OpenAI),
            "ollama" => Ok(EmbeddingProvider::Ollama),
            other => Err(EmbedError::ConfigError(format!("Unsupported embedding provider: {}", other))),
        }
    }
}

/// Blocking client for one embedding model
pub struct EmbeddingClient {
    client: Client,
    provider: EmbeddingProvider,
    model: String,
    api_key: Option<String>,
    api_base: String,
}

impl EmbeddingClient {
    pub fn new(
        provider: EmbeddingProvider,
        model: impl Into<String>,
        api_base: impl Into<String>,
        api_key: Option<String>,
    ) -> EmbedResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbedError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            provider,
            model: model.into(),
            api_key,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Client for the model configured for [`ModelTask::Embedding`]
    pub fn from_settings(settings: &Settings) -> EmbedResult<Self> {
        let config = settings
            .model(ModelTask::Embedding)
            .ok_or_else(|| EmbedError::ConfigError("No model configured for the embedding task".to_string()))?;
        let provider = config.provider.parse::<EmbeddingProvider>()?;
        let api_key = match provider {
            EmbeddingProvider::OpenAI => std::env::var(OPENAI_API_KEY_VAR).ok(),
            EmbeddingProvider::Ollama => None,
        };
        Self::new(provider, config.identifier.clone(), config.api_base.clone(), api_key)
    }

    pub fn provider(&self) -> EmbeddingProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn openai_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            model: &'a str,
            input: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<OpenAIData>,
        }

        #[derive(Deserialize)]
        struct OpenAIData {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.api_base);
        let mut request = self.client.post(&url).json(&OpenAIRequest {
            model: &self.model,
            input: text,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let resp = request.send().map_err(|e| EmbedError::NetworkError(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().unwrap_or_default();
            return Err(EmbedError::ApiError(format!("OpenAI returned {}: {}", status, error_text)));
        }

        let result: OpenAIResponse = resp.json().map_err(|e| EmbedError::SerializationError(e.to_string()))?;
        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedError::ApiError("OpenAI returned no embedding".to_string()))
    }

    fn ollama_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.api_base);
        let resp = self
            .client
            .post(&url)
            .json(&OllamaRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .map_err(|e| EmbedError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().unwrap_or_default();
            return Err(EmbedError::ApiError(format!("Ollama returned {}: {}", status, error_text)));
        }

        let result: OllamaResponse = resp.json().map_err(|e| EmbedError::SerializationError(e.to_string()))?;
        Ok(result.embedding)
    }
}

impl Embedder for EmbeddingClient {
    fn get_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        debug!("Requesting embedding from {:?} model {}", self.provider, self.model);
        let embedding = match self.provider {
            EmbeddingProvider::OpenAI => self.openai_embedding(text)?,
            EmbeddingProvider::Ollama => self.ollama_embedding(text)?,
        };
        if embedding.is_empty() {
            return Err(EmbedError::ApiError(format!("{} returned an empty embedding", self.model)));
        }
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ModelConfig;
    use mockito::Matcher;
    use serde_json::json;

    fn settings(provider: &str, api_base: &str) -> Settings {
        Settings::default().with_model(
            ModelTask::Embedding,
            ModelConfig {
                identifier: "test-embed".to_string(),
                provider: provider.to_string(),
                api_base: api_base.to_string(),
            },
        )
    }

    #[test]
    fn test_ollama_embedding() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/embeddings")
            .match_body(Matcher::Json(json!({"model": "test-embed", "prompt": "hello"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": [0.25, -0.5, 1.0]}"#)
            .create();

        let client = EmbeddingClient::from_settings(&settings("ollama", &server.url())).unwrap();
        assert_eq!(client.get_embedding("hello").unwrap(), vec![0.25, -0.5, 1.0]);
        mock.assert();
    }

    #[test]
    fn test_openai_embedding() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(json!({"model": "m", "input": "hello"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"embedding": [1.0, 2.0]}]}"#)
            .create();

        let api_base = format!("{}/v1/", server.url());
        let client = EmbeddingClient::new(EmbeddingProvider::OpenAI, "m", api_base, Some("sk-test".to_string())).unwrap();
        assert_eq!(client.get_embedding("hello").unwrap(), vec![1.0, 2.0]);
        mock.assert();
    }

    #[test]
    fn test_api_errors() {
        let mut server = mockito::Server::new();
        let _failing = server
            .mock("POST", "/api/embeddings")
            .with_status(500)
            .with_body("model not loaded")
            .create();

        let client = EmbeddingClient::new(EmbeddingProvider::Ollama, "m", server.url(), None).unwrap();
        match client.get_embedding("hello") {
            Err(EmbedError::ApiError(message)) => assert!(message.contains("model not loaded")),
            other => panic!("expected an API error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_embedding_is_an_error() {
        let mut server = mockito::Server::new();
        let _empty = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": []}"#)
            .create();

        let client = EmbeddingClient::new(EmbeddingProvider::Ollama, "m", server.url(), None).unwrap();
        assert!(matches!(client.get_embedding("hello"), Err(EmbedError::ApiError(_))));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(matches!(
            EmbeddingClient::from_settings(&Settings::default()),
            Err(EmbedError::ConfigError(_))
        ));
        assert!(matches!(
            EmbeddingClient::from_settings(&settings("gemini", "http://localhost")),
            Err(EmbedError::ConfigError(_))
        ));
    }
}
