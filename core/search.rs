use crate::chunking::Chunk;
use crate::embedding::{EmbeddingProvider, TokenUsage, embed_in_batches};
use crate::error::{AppError, Result};
use crate::output_formats::{read_text_file, serialize_to_json, write_text_file};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Cosine of the angle between two vectors; 0.0 for empty, mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Orders vector indices by similarity to `query`, best first; ties keep index order.
pub fn rank<V: AsRef<[f32]>>(query: &[f32], vectors: &[V]) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, cosine_similarity(query, v.as_ref())))
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub path: String,
    pub score: f32,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
}

/// Embedded chunks of one merged document, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingIndex {
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub source_document: PathBuf,
    pub entries: Vec<IndexedChunk>,
    pub usage: TokenUsage,
}

impl EmbeddingIndex {
    pub fn build(
        provider: &dyn EmbeddingProvider,
        chunks: Vec<Chunk>,
        source_document: &Path,
        batch_size: usize,
    ) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let batch = embed_in_batches(provider, &texts, batch_size)?;
        let entries = chunks
            .into_iter()
            .zip(batch.vectors)
            .map(|(chunk, vector)| IndexedChunk { chunk, vector })
            .collect();
        Ok(Self {
            model: provider.model_name().to_string(),
            created_at: Utc::now(),
            source_document: source_document.to_path_buf(),
            entries,
            usage: batch.usage,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_text_file(path, &serialize_to_json(self, true)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = read_text_file(path)?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::Embedding(format!(
                "Invalid embedding index '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.vector.len())
    }

    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if let Some(bad) = self
            .entries
            .iter()
            .find(|e| e.vector.len() != query_vector.len())
        {
            return Err(AppError::Embedding(format!(
                "Query vector has {} dimensions but '{}' has {}; rebuild the index with model '{}'",
                query_vector.len(),
                bad.chunk.path,
                bad.vector.len(),
                self.model
            )));
        }
        let vectors: Vec<&[f32]> = self.entries.iter().map(|e| e.vector.as_slice()).collect();
        Ok(rank(query_vector, &vectors)
            .into_iter()
            .take(top_k)
            .map(|(i, score)| {
                let chunk = &self.entries[i].chunk;
                SearchHit {
                    path: chunk.path.clone(),
                    score,
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    text: chunk.text.clone(),
                }
            })
            .collect())
    }

    /// Embeds `query` with `provider` and searches the index.
    pub fn query(&self, provider: &dyn EmbeddingProvider, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if provider.model_name() != self.model {
            log::warn!(
                "Index was built with model '{}' but querying with '{}'",
                self.model,
                provider.model_name()
            );
        }
        let batch = provider.embed(&[query.to_string()])?;
        let query_vector = batch
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("Provider returned no vector for the query".to_string()))?;
        self.search(&query_vector, top_k)
    }
}
