pub mod chunking;
pub mod collector;
pub mod config;
pub mod content_cache;
pub mod diagnostics;
pub mod embedding;
pub mod error;
pub mod file_index;
pub mod filter;
pub mod ignore_rules;
pub mod manifest;
pub mod merge;
pub mod output_formats;
pub mod paths;
pub mod resolver;
pub mod search;
pub mod size_tree;
pub mod stats;

pub use chunking::{Chunk, split_merged_document};
pub use collector::PathCollector;
pub use config::{Config, EmbeddingConfig, IndexingStrategy, WatchConfig};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use embedding::{
    EmbeddingBatch, EmbeddingProvider, OpenAiCompatibleProvider, TokenUsage, embed_in_batches,
};
pub use error::{AppError, Result};
pub use file_index::{ExtensionFilter, FileIndex};
pub use filter::{ContentFilter, FilterOptions, filter};
pub use ignore_rules::IgnoreRules;
pub use manifest::ManifestEntry;
pub use merge::{
    END_MARKER, MergePlan, MergeReport, MergeState, MergedUnit, Merger, START_MARKER,
    root_folder_name,
};
pub use output_formats::StructuredFormat;
pub use resolver::{DependencyResolver, extract_imports};
pub use search::{EmbeddingIndex, SearchHit, cosine_similarity, rank};
pub use size_tree::{TreeNode, build_size_tree};
pub use stats::{MergeStats, calculate_stats};
