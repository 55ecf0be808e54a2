use crate::config::EmbeddingConfig;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One vector per input text, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingBatch {
    pub vectors: Vec<Vec<f32>>,
    pub usage: TokenUsage,
}

/// Turns text into fixed-length vectors.
pub trait EmbeddingProvider {
    fn model_name(&self) -> &str;

    fn embed(&self, texts: &[String]) -> Result<EmbeddingBatch>;
}

/// Client for any endpoint speaking the OpenAI `/v1/embeddings` protocol.
///
/// One blocking request per call, bounded by the configured timeout. Failures
/// are returned as-is; nothing is retried.
pub struct OpenAiCompatibleProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Embedding API key not found: set the {} environment variable",
                    config.api_key_env
                ))
            })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

impl EmbeddingProvider for OpenAiCompatibleProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn embed(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        if texts.is_empty() {
            return Ok(EmbeddingBatch::default());
        }
        log::debug!("Requesting {} embeddings from {}", texts.len(), self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        parse_embedding_response(status, &body, texts.len())
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    data: Option<Vec<ApiEmbedding>>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiEmbedding {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

/// Interprets an embeddings response. Items are placed by their `index`
/// field when present, else by position.
pub fn parse_embedding_response(status: u16, body: &str, expected: usize) -> Result<EmbeddingBatch> {
    if !(200..300).contains(&status) {
        return Err(AppError::EmbeddingApi {
            status,
            body: body.to_string(),
        });
    }
    let parsed: ApiResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Embedding(format!("Malformed embedding response: {}", e)))?;
    if let Some(error) = parsed.error {
        return Err(AppError::Embedding(
            error
                .message
                .unwrap_or_else(|| "Embedding API reported an error".to_string()),
        ));
    }
    let data = parsed
        .data
        .ok_or_else(|| AppError::Embedding("Malformed embedding response: missing data".to_string()))?;
    if data.len() != expected {
        return Err(AppError::Embedding(format!(
            "Expected {} embeddings, received {}",
            expected,
            data.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, item) in data.into_iter().enumerate() {
        let index = item.index.unwrap_or(position);
        match slots.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(item.embedding),
            _ => {
                return Err(AppError::Embedding(format!(
                    "Embedding index {} is out of range or duplicated",
                    index
                )));
            }
        }
    }
    let vectors = slots.into_iter().flatten().collect();
    let usage = parsed
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();
    Ok(EmbeddingBatch { vectors, usage })
}

/// Embeds `texts` in requests of at most `batch_size` items and sums the usage.
pub fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<EmbeddingBatch> {
    if batch_size == 0 {
        return Err(AppError::InvalidArgument(
            "Embedding batch size must be greater than 0".to_string(),
        ));
    }
    let mut combined = EmbeddingBatch::default();
    let total_batches = texts.len().div_ceil(batch_size);
    for (i, batch) in texts.chunks(batch_size).enumerate() {
        log::info!("Embedding batch {}/{} ({} texts)", i + 1, total_batches, batch.len());
        let result = provider.embed(batch)?;
        if result.vectors.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Provider returned {} vectors for {} texts",
                result.vectors.len(),
                batch.len()
            )));
        }
        combined.vectors.extend(result.vectors);
        combined.usage.add(result.usage);
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingProvider {
        calls: RefCell<Vec<usize>>,
    }

    impl EmbeddingProvider for RecordingProvider {
        fn model_name(&self) -> &str {
            "recording"
        }

        fn embed(&self, texts: &[String]) -> Result<EmbeddingBatch> {
            self.calls.borrow_mut().push(texts.len());
            Ok(EmbeddingBatch {
                vectors: texts.iter().map(|t| vec![t.len() as f32]).collect(),
                usage: TokenUsage {
                    prompt_tokens: texts.len() as u64,
                    total_tokens: texts.len() as u64,
                },
            })
        }
    }

    #[test]
    fn parses_vectors_in_index_order() {
        let body = r#"{
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ],
            "usage": {"prompt_tokens": 5, "total_tokens": 5}
        }"#;
        let batch = parse_embedding_response(200, body, 2).unwrap();
        assert_eq!(batch.vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(batch.usage.total_tokens, 5);
    }

    #[test]
    fn non_success_status_keeps_body() {
        let err = parse_embedding_response(429, "slow down", 1).unwrap_err();
        match err {
            AppError::EmbeddingApi { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_payload_and_malformed_json_fail() {
        let err = parse_embedding_response(200, r#"{"error": {"message": "bad model"}}"#, 1).unwrap_err();
        assert!(matches!(err, AppError::Embedding(ref m) if m == "bad model"));
        assert!(matches!(
            parse_embedding_response(200, "not json", 1),
            Err(AppError::Embedding(_))
        ));
        assert!(matches!(
            parse_embedding_response(200, r#"{"data": [{"embedding": [1.0]}]}"#, 2),
            Err(AppError::Embedding(_))
        ));
    }

    #[test]
    fn batches_requests_and_sums_usage() {
        let provider = RecordingProvider {
            calls: RefCell::new(Vec::new()),
        };
        let texts: Vec<String> = (0..5).map(|i| "x".repeat(i + 1)).collect();
        let batch = embed_in_batches(&provider, &texts, 2).unwrap();

        assert_eq!(*provider.calls.borrow(), vec![2, 2, 1]);
        assert_eq!(batch.vectors.len(), 5);
        assert_eq!(batch.vectors[4], vec![5.0]);
        assert_eq!(batch.usage.prompt_tokens, 5);
        assert!(embed_in_batches(&provider, &texts, 0).is_err());
    }
}
