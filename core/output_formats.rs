use crate::error::{AppError, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Structured output formats accepted by `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredFormat {
    Json,
    Yaml,
}

impl StructuredFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StructuredFormat::Json),
            "yaml" | "yml" => Ok(StructuredFormat::Yaml),
            other => Err(AppError::InvalidArgument(format!(
                "Unsupported output format '{}'. Use 'json' or 'yaml'.",
                other
            ))),
        }
    }
}

pub fn serialize_to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).map_err(AppError::JsonSerialize)
    } else {
        serde_json::to_string(value).map_err(AppError::JsonSerialize)
    }
}

pub fn serialize_to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_yml::to_string(value).map_err(AppError::YamlError)
}

pub fn serialize<T: Serialize + ?Sized>(value: &T, format: StructuredFormat) -> Result<String> {
    match format {
        StructuredFormat::Json => serialize_to_json(value, true),
        StructuredFormat::Yaml => serialize_to_yaml(value),
    }
}

/// Writes `content` to `path`, creating missing parent directories.
pub fn write_text_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, content).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_format_names() {
        assert_eq!(StructuredFormat::parse("JSON").unwrap(), StructuredFormat::Json);
        assert_eq!(StructuredFormat::parse("yml").unwrap(), StructuredFormat::Yaml);
        assert!(matches!(
            StructuredFormat::parse("xml"),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn write_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/nested/merged.txt");
        write_text_file(&path, "x\n").unwrap();
        assert_eq!(read_text_file(&path).unwrap(), "x\n");
    }
}
