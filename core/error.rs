use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON Serialization Error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("YAML Parsing/Serialization Error: {0}")]
    YamlError(#[from] serde_yml::Error),

    #[error("Project root does not exist or is not a directory: '{path}'")]
    ProjectRootMissing { path: PathBuf },

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory Creation Error: Path '{path}', Error: {source}")]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("TikToken Error: {0}")]
    TikToken(String),

    #[error("Manifest Parsing Error: {0}")]
    Manifest(String),

    #[error("Embedding Error: {0}")]
    Embedding(String),

    #[error("Embedding API returned status {status}: {body}")]
    EmbeddingApi { status: u16, body: String },

    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Duration Parsing Error: {0}")]
    DurationParse(String),
}

impl AppError {
    /// True for errors raised by the embedding/search layer rather than the merge pipeline.
    pub fn is_embedding_failure(&self) -> bool {
        matches!(
            self,
            AppError::Embedding(_) | AppError::EmbeddingApi { .. } | AppError::Http(_)
        )
    }
}
