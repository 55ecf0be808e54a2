use crate::content_cache::ContentCache;
use crate::diagnostics::Diagnostics;
use crate::error::{AppError, Result};
use byte_unit::{Byte, UnitType};
use serde::Serialize;
use std::path::Path;
use tiktoken_rs::{CoreBPE, cl100k_base};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_bytes: u128,
    pub total_bytes_readable: String,
    pub estimated_tokens: usize,
    pub files_details: Vec<FileStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub path: String,
    pub lines: usize,
    pub bytes: usize,
    pub bytes_readable: String,
    pub estimated_tokens: usize,
}

pub fn readable_size(bytes: u128) -> String {
    Byte::from_u128(bytes)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

/// Token estimator backed by the cl100k vocabulary.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn new() -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| AppError::TikToken(e.to_string()))?;
        Ok(Self { bpe })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Per-file statistics for `files` (relative to `project_root`), in the given order.
/// Unreadable files are skipped with a warning.
pub fn calculate_stats(
    project_root: &Path,
    files: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<MergeStats> {
    let counter = TokenCounter::new()?;
    let mut contents = ContentCache::new();
    let mut total_lines = 0;
    let mut total_bytes: u128 = 0;
    let mut total_tokens = 0;
    let mut files_details = Vec::with_capacity(files.len());

    for rel in files {
        let content = match contents.get(&project_root.join(rel)) {
            Ok(content) => content,
            Err(e) => {
                diagnostics.warn(format!("Skipping {} in statistics: {}", rel, e));
                continue;
            }
        };
        let lines = content.lines().count();
        let bytes = content.len();
        let tokens = counter.count(content);

        total_lines += lines;
        total_bytes = total_bytes.saturating_add(bytes as u128);
        total_tokens += tokens;
        files_details.push(FileStats {
            path: rel.clone(),
            lines,
            bytes,
            bytes_readable: readable_size(bytes as u128),
            estimated_tokens: tokens,
        });
    }

    Ok(MergeStats {
        total_files: files_details.len(),
        total_lines,
        total_bytes,
        total_bytes_readable: readable_size(total_bytes),
        estimated_tokens: total_tokens,
        files_details,
    })
}
