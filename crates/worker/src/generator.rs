//! Embedding generation against an OpenAI-compatible `/embeddings` endpoint.
//!
//! [`HttpEmbeddingGenerator`] embeds a job's trait value and stores the
//! vector in `trait_embeddings`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use storyloom_core::embedding_job::EmbeddingJobPayload;
use storyloom_core::error::CoreError;
use storyloom_core::ports::EmbeddingGenerator;
use storyloom_core::types::DbId;
use storyloom_db::models::trait_embedding::CreateTraitEmbedding;
use storyloom_db::repositories::TraitEmbeddingRepo;
use storyloom_db::DbPool;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EmbeddingServiceConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl EmbeddingServiceConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                  |
    /// |--------------------------|------------------------------------------|
    /// | `EMBEDDING_API_URL`      | `https://api.openai.com/v1/embeddings`   |
    /// | `EMBEDDING_API_KEY`      | unset (no `Authorization` header)        |
    /// | `EMBEDDING_MODEL`        | `text-embedding-3-small`                 |
    /// | `EMBEDDING_TIMEOUT_SECS` | `30`                                     |
    pub fn from_env() -> Self {
        let api_url = std::env::var("EMBEDDING_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/embeddings".into());
        let api_key = std::env::var("EMBEDDING_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let model =
            std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "text-embedding-3-small".into());
        let timeout_secs: u64 = std::env::var("EMBEDDING_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("EMBEDDING_TIMEOUT_SECS must be a valid u64");

        Self {
            api_url,
            api_key,
            model,
            timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Embedding API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("Failed to store embedding: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<EmbeddingError> for CoreError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::Database(e) => CoreError::Internal(e.to_string()),
            other => CoreError::Unavailable(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

fn request_body(model: &str, input: &str) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "input": input,
    })
}

/// The first vector of an embeddings response.
fn parse_embedding(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".into()))?;
    if embedding.is_empty() {
        return Err(EmbeddingError::InvalidResponse("empty embedding".into()));
    }
    Ok(embedding)
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

pub struct HttpEmbeddingGenerator {
    client: reqwest::Client,
    config: EmbeddingServiceConfig,
    pool: DbPool,
}

impl HttpEmbeddingGenerator {
    pub fn new(config: EmbeddingServiceConfig, pool: DbPool) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            pool,
        })
    }

    /// Request an embedding for `input`.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut request = self
            .client
            .post(&self.config.api_url)
            .json(&request_body(&self.config.model, input));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }
        parse_embedding(&body)
    }
}

#[async_trait]
impl EmbeddingGenerator for HttpEmbeddingGenerator {
    async fn generate(&self, payload: &EmbeddingJobPayload) -> Result<DbId, CoreError> {
        let embedding = self.embed(&payload.trait_value).await?;
        tracing::debug!(
            trait_path = %payload.trait_path,
            dimensions = embedding.len(),
            "Embedding generated"
        );

        let id = TraitEmbeddingRepo::upsert(
            &self.pool,
            &CreateTraitEmbedding {
                adventure_character_id: payload.adventure_character_id,
                trait_type: payload.trait_type.clone(),
                trait_path: payload.trait_path.clone(),
                trait_value: payload.trait_value.clone(),
                model: self.config.model.clone(),
                embedding,
            },
        )
        .await
        .map_err(EmbeddingError::from)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_first_embedding() {
        let body = r#"{"object":"list","data":[{"index":0,"embedding":[0.25,-0.5]}],"model":"m"}"#;
        assert_eq!(parse_embedding(body).unwrap(), vec![0.25, -0.5]);
    }

    #[test]
    fn rejects_missing_or_empty_vectors() {
        assert_matches!(
            parse_embedding(r#"{"data":[]}"#),
            Err(EmbeddingError::InvalidResponse(_))
        );
        assert_matches!(
            parse_embedding(r#"{"data":[{"embedding":[]}]}"#),
            Err(EmbeddingError::InvalidResponse(_))
        );
        assert_matches!(parse_embedding("not json"), Err(EmbeddingError::InvalidResponse(_)));
    }

    #[test]
    fn request_body_shape() {
        let body = request_body("text-embedding-3-small", "silver");
        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(body["input"], "silver");
    }

    #[test]
    fn api_errors_are_unavailable() {
        let err: CoreError = EmbeddingError::Api {
            status: 503,
            body: "busy".into(),
        }
        .into();
        assert_matches!(err, CoreError::Unavailable(msg) if msg.contains("503"));
    }
}
