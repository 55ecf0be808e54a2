use crate::diagnostics::Diagnostics;
use crate::error::{AppError, Result};
use crate::filter::FilterOptions;
use parse_duration::parse;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = ".codemerge";
pub const DEFAULT_CONFIG_FILENAME: &str = "codemerge.toml";
pub const DEFAULT_OUTPUT_FILE: &str = "merged_output.txt";
pub const DEFAULT_MAX_DEPENDENCY_DEPTH: usize = 100;
pub const DEFAULT_WATCH_DELAY: &str = "300ms";
pub const WILDCARD_EXTENSION: &str = "*";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_scan_root: Option<PathBuf>,
    #[serde(default)]
    pub scan_targets: Vec<String>,
    #[serde(default = "default_true")]
    pub scan_dependencies: bool,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub remove_style_tag: bool,
    #[serde(default)]
    pub remove_html_comments: bool,
    #[serde(default)]
    pub remove_single_line_comments: bool,
    #[serde(default)]
    pub remove_multi_line_comments: bool,
    #[serde(default)]
    pub remove_empty_lines: bool,
    #[serde(default)]
    pub ignore_files: Vec<String>,
    #[serde(default = "default_ignore_directories")]
    pub ignore_directories: Vec<String>,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_list_output_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_tree_output_file: Option<PathBuf>,
    #[serde(default = "default_max_dependency_depth")]
    pub max_dependency_depth: usize,
    #[serde(default = "default_indexing_strategy")]
    pub indexing_strategy: String,
    #[serde(default)]
    pub respect_gitignore: bool,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    #[serde(default = "default_watch_delay_string")]
    pub delay: String,
}

/// How the project tree is enumerated when building the file index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexingStrategy {
    PortableWalk,
    NativeFindCommand,
}

impl IndexingStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "portable-walk" | "portable" | "walk" => Some(IndexingStrategy::PortableWalk),
            "native-find-command" | "native-find" | "native" | "find" => {
                Some(IndexingStrategy::NativeFindCommand)
            }
            _ => None,
        }
    }
}

impl fmt::Display for IndexingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexingStrategy::PortableWalk => f.write_str("portable-walk"),
            IndexingStrategy::NativeFindCommand => f.write_str("native-find-command"),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_extensions() -> Vec<String> {
    ["js", "jsx", "ts", "tsx", "vue", "mjs", "cjs"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_ignore_directories() -> Vec<String> {
    ["node_modules", ".git", "dist", "build", DEFAULT_CONFIG_DIR]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_output_file() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}
fn default_max_dependency_depth() -> usize {
    DEFAULT_MAX_DEPENDENCY_DEPTH
}
fn default_indexing_strategy() -> String {
    IndexingStrategy::PortableWalk.to_string()
}
fn default_embedding_endpoint() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_batch_size() -> usize {
    64
}
fn default_watch_delay_string() -> String {
    DEFAULT_WATCH_DELAY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: None,
            dependency_scan_root: None,
            scan_targets: Vec::new(),
            scan_dependencies: default_true(),
            extensions: default_extensions(),
            remove_style_tag: false,
            remove_html_comments: false,
            remove_single_line_comments: false,
            remove_multi_line_comments: false,
            remove_empty_lines: false,
            ignore_files: Vec::new(),
            ignore_directories: default_ignore_directories(),
            output_file: default_output_file(),
            file_list_output_file: None,
            size_tree_output_file: None,
            max_dependency_depth: default_max_dependency_depth(),
            indexing_strategy: default_indexing_strategy(),
            respect_gitignore: false,
            embedding: EmbeddingConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}
impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            batch_size: default_batch_size(),
            index_file: None,
        }
    }
}
impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            delay: default_watch_delay_string(),
        }
    }
}

impl Config {
    /// Resolves the project root: CLI flag, then `projectRoot`, then `PROJECT_ROOT`, then cwd.
    /// A root that does not exist is the one fatal condition of a run.
    pub fn determine_project_root(&self, cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .or(self.project_root.as_ref())
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        let canonical =
            path_to_resolve
                .canonicalize()
                .map_err(|_| AppError::ProjectRootMissing {
                    path: path_to_resolve.clone(),
                })?;
        if !canonical.is_dir() {
            return Err(AppError::ProjectRootMissing {
                path: path_to_resolve,
            });
        }
        Ok(canonical)
    }

    /// Locates the config file: explicit path, `.codemerge/codemerge.toml`, then `codemerge.toml`.
    pub fn resolve_config_path(
        search_dir: &Path,
        cli_config_file: Option<&PathBuf>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        if let Some(explicit) = cli_config_file {
            let expanded = PathBuf::from(
                shellexpand::tilde(&explicit.to_string_lossy().to_string()).as_ref(),
            );
            let mut path = if expanded.is_absolute() {
                expanded
            } else {
                search_dir.join(expanded)
            };
            if !path.exists() && path.extension().is_none() {
                path.set_extension("toml");
            }
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path));
        }

        let candidates = [
            search_dir
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME),
            search_dir.join(DEFAULT_CONFIG_FILENAME),
        ];
        for candidate in candidates {
            if candidate.is_file() {
                log::debug!("Using default config file path: {}", candidate.display());
                return Ok(Some(candidate));
            }
        }
        log::debug!(
            "No config file specified and none found under: {}",
            search_dir.display()
        );
        Ok(None)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Config>(content).map_err(|e| {
            AppError::TomlParse(format!(
                "{}. Check TOML syntax and key names (camelCase).",
                e
            ))
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Coerces an unknown strategy to the portable walk and records a notice.
    pub fn effective_indexing_strategy(&self, diagnostics: &mut Diagnostics) -> IndexingStrategy {
        IndexingStrategy::parse(&self.indexing_strategy).unwrap_or_else(|| {
            diagnostics.notice(format!(
                "Unknown indexingStrategy '{}'; using '{}'",
                self.indexing_strategy,
                IndexingStrategy::PortableWalk
            ));
            IndexingStrategy::PortableWalk
        })
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            remove_style_tag: self.remove_style_tag,
            remove_html_comments: self.remove_html_comments,
            remove_single_line_comments: self.remove_single_line_comments,
            remove_multi_line_comments: self.remove_multi_line_comments,
            remove_empty_lines: self.remove_empty_lines,
        }
    }

    pub fn effective_dependency_scan_root(&self, project_root: &Path) -> PathBuf {
        match &self.dependency_scan_root {
            Some(p) => resolve_against(project_root, p),
            None => project_root.to_path_buf(),
        }
    }

    pub fn output_path(&self, project_root: &Path) -> PathBuf {
        resolve_against(project_root, &self.output_file)
    }

    pub fn file_list_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.file_list_output_file
            .as_ref()
            .map(|p| resolve_against(project_root, p))
    }

    pub fn size_tree_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.size_tree_output_file
            .as_ref()
            .map(|p| resolve_against(project_root, p))
    }

    /// Embedding index location; defaults to `<outputFile>.embeddings.json`.
    pub fn embedding_index_path(&self, project_root: &Path) -> PathBuf {
        match &self.embedding.index_file {
            Some(p) => resolve_against(project_root, p),
            None => {
                let mut output = self.output_path(project_root).into_os_string();
                output.push(".embeddings.json");
                PathBuf::from(output)
            }
        }
    }

    /// Every file the tool itself writes under this config.
    pub fn own_output_files(&self, project_root: &Path) -> Vec<PathBuf> {
        let mut paths = vec![
            self.output_path(project_root),
            self.embedding_index_path(project_root),
        ];
        paths.extend(self.file_list_path(project_root));
        paths.extend(self.size_tree_path(project_root));
        paths
    }

    pub fn get_watch_delay(&self) -> Result<Duration> {
        parse(&self.watch.delay).map_err(|e| {
            AppError::DurationParse(format!(
                "Invalid watch delay duration '{}': {}. Use format like '500ms', '2s'.",
                self.watch.delay, e
            ))
        })
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy().to_string()).as_ref());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_keys() {
        let config = Config::from_toml_str(
            r#"
            scanTargets = ["src/main.ts", "src/views"]
            scanDependencies = false
            extensions = ["ts", "vue"]
            removeStyleTag = true
            ignoreDirectories = ["node_modules"]
            maxDependencyDepth = 3
            fileListOutputFile = "out/files.txt"

            [embedding]
            model = "custom-model"
            batchSize = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.scan_targets, vec!["src/main.ts", "src/views"]);
        assert!(!config.scan_dependencies);
        assert!(config.remove_style_tag);
        assert!(!config.remove_empty_lines);
        assert_eq!(config.max_dependency_depth, 3);
        assert_eq!(config.embedding.model, "custom-model");
        assert_eq!(config.embedding.batch_size, 8);
        assert_eq!(config.embedding.timeout_secs, 60);
        assert_eq!(config.output_file, PathBuf::from(DEFAULT_OUTPUT_FILE));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::from_toml_str("scan_targets = []").unwrap_err();
        assert!(matches!(err, AppError::TomlParse(_)));
    }

    #[test]
    fn unknown_indexing_strategy_falls_back_with_notice() {
        let config = Config {
            indexing_strategy: "quantum".to_string(),
            ..Config::default()
        };
        let mut diags = Diagnostics::new();
        assert_eq!(
            config.effective_indexing_strategy(&mut diags),
            IndexingStrategy::PortableWalk
        );
        assert_eq!(diags.notices().count(), 1);

        let native = Config {
            indexing_strategy: "native_find_command".to_string(),
            ..Config::default()
        };
        let mut diags = Diagnostics::new();
        assert_eq!(
            native.effective_indexing_strategy(&mut diags),
            IndexingStrategy::NativeFindCommand
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn relative_outputs_resolve_against_project_root() {
        let config = Config {
            output_file: PathBuf::from("out/merged.txt"),
            ..Config::default()
        };
        let root = Path::new("/work/project");
        assert_eq!(
            config.output_path(root),
            PathBuf::from("/work/project/out/merged.txt")
        );
        assert_eq!(
            config.embedding_index_path(root),
            PathBuf::from("/work/project/out/merged.txt.embeddings.json")
        );
        assert_eq!(config.file_list_path(root), None);
    }

    #[test]
    fn own_output_files_include_optional_outputs() {
        let config = Config {
            file_list_output_file: Some(PathBuf::from("files.txt")),
            ..Config::default()
        };
        let root = Path::new("/work/project");
        let outputs = config.own_output_files(root);
        assert_eq!(outputs.len(), 3);
        assert!(outputs.contains(&PathBuf::from("/work/project/files.txt")));
        assert!(outputs.contains(&PathBuf::from("/work/project/merged_output.txt.embeddings.json")));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = Config::default().to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn missing_project_root_is_reported() {
        let config = Config {
            project_root: Some(PathBuf::from("/definitely/not/here/codemerge")),
            ..Config::default()
        };
        let err = config.determine_project_root(None).unwrap_err();
        assert!(matches!(err, AppError::ProjectRootMissing { .. }));
    }

    #[test]
    fn watch_delay_parses_or_reports_duration_error() {
        assert_eq!(
            Config::default().get_watch_delay().unwrap(),
            Duration::from_millis(300)
        );
        let mut config = Config::default();
        config.watch.delay = "soonish".to_string();
        assert!(matches!(
            config.get_watch_delay(),
            Err(AppError::DurationParse(_))
        ));
    }
}
