use crate::collector::PathCollector;
use crate::config::{Config, IndexingStrategy};
use crate::content_cache::ContentCache;
use crate::diagnostics::Diagnostics;
use crate::error::{AppError, Result};
use crate::file_index::{ExtensionFilter, FileIndex};
use crate::filter::ContentFilter;
use crate::ignore_rules::IgnoreRules;
use crate::manifest::{self, ManifestEntry};
use crate::output_formats::write_text_file;
use crate::paths::relative_to_root;
use crate::resolver::{DependencyResolver, ResolverStats};
use crate::size_tree::{build_size_tree, size_tree_to_json};
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const START_MARKER: &str = "// Начало файла -> ";
pub const END_MARKER: &str = "// Конец файла -> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergeState {
    Idle,
    Indexing,
    Collecting,
    Merging,
    Writing,
    Done,
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeState::Idle => "idle",
            MergeState::Indexing => "indexing",
            MergeState::Collecting => "collecting",
            MergeState::Merging => "merging",
            MergeState::Writing => "writing",
            MergeState::Done => "done",
        };
        f.write_str(name)
    }
}

/// A file as placed in the merged document. Lines are 1-based and inclusive and
/// cover the filtered content only, not the marker lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedUnit {
    pub relative_path: String,
    pub display_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub bytes: usize,
}

impl MergedUnit {
    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            display_path: self.display_path.clone(),
            start_line: self.start_line,
            end_line: self.end_line,
        }
    }
}

/// Result of indexing and collecting without merging.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePlan {
    pub project_root: PathBuf,
    pub root_folder_name: String,
    pub indexing_strategy: IndexingStrategy,
    pub indexed_files: usize,
    pub files: Vec<String>,
    #[serde(skip)]
    pub resolver_stats: ResolverStats,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenOutputs {
    pub document: Option<PathBuf>,
    pub file_list: Option<PathBuf>,
    pub size_tree: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub project_root: PathBuf,
    pub root_folder_name: String,
    pub document: String,
    pub units: Vec<MergedUnit>,
    pub manifest: Vec<ManifestEntry>,
    pub diagnostics: Diagnostics,
    pub outputs: WrittenOutputs,
}

impl MergeReport {
    pub fn manifest_text(&self) -> String {
        manifest::render(&self.manifest)
    }

    pub fn total_lines(&self) -> usize {
        self.document.lines().count()
    }
}

/// One merge session: owns the configuration and the content cache for a run.
pub struct Merger {
    config: Config,
    project_root: PathBuf,
    state: MergeState,
    contents: ContentCache,
}

impl Merger {
    pub fn new(config: Config, project_root: PathBuf) -> Result<Self> {
        if !project_root.is_dir() {
            return Err(AppError::ProjectRootMissing { path: project_root });
        }
        Ok(Self {
            config,
            project_root,
            state: MergeState::Idle,
            contents: ContentCache::new(),
        })
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn root_folder_name(&self) -> String {
        root_folder_name(&self.project_root)
    }

    fn transition(&mut self, next: MergeState) {
        log::debug!("Merge state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn reset(&mut self) {
        self.state = MergeState::Idle;
        self.contents = ContentCache::new();
    }

    /// Runs indexing and collection only.
    pub fn plan(&mut self) -> Result<MergePlan> {
        self.reset();
        let mut diagnostics = Diagnostics::new();
        let (strategy, indexed_files, files, resolver_stats) = self.index_and_collect(&mut diagnostics)?;
        self.transition(MergeState::Done);
        Ok(MergePlan {
            project_root: self.project_root.clone(),
            root_folder_name: self.root_folder_name(),
            indexing_strategy: strategy,
            indexed_files,
            files,
            resolver_stats,
            diagnostics,
        })
    }

    /// Builds the merged document in memory without writing anything.
    pub fn build(&mut self) -> Result<MergeReport> {
        self.reset();
        let mut diagnostics = Diagnostics::new();
        let (_, _, files, stats) = self.index_and_collect(&mut diagnostics)?;
        log::debug!(
            "Dependency scan: {} files scanned, {} memo hits, {} unresolved imports",
            stats.files_scanned,
            stats.memo_hits,
            stats.unresolved_imports
        );

        self.transition(MergeState::Merging);
        let (document, units) = self.merge_files(&files, &mut diagnostics);
        log::debug!(
            "Content cache: {} files read, {} repeat reads served from memory",
            self.contents.len(),
            self.contents.hits()
        );
        let manifest = units.iter().map(MergedUnit::manifest_entry).collect();
        Ok(MergeReport {
            project_root: self.project_root.clone(),
            root_folder_name: self.root_folder_name(),
            document,
            units,
            manifest,
            diagnostics,
            outputs: WrittenOutputs::default(),
        })
    }

    /// Full pipeline: build the document, then write the configured outputs.
    pub fn run(&mut self) -> Result<MergeReport> {
        let mut report = self.build()?;
        self.transition(MergeState::Writing);
        report.outputs = self.write_outputs(&report)?;
        self.transition(MergeState::Done);
        log::info!(
            "Merged {} files into {} lines.",
            report.units.len(),
            report.total_lines()
        );
        Ok(report)
    }

    fn index_and_collect(
        &mut self,
        diagnostics: &mut Diagnostics,
    ) -> Result<(IndexingStrategy, usize, Vec<String>, ResolverStats)> {
        self.transition(MergeState::Indexing);
        let root = self.project_root.clone();
        let strategy = self.config.effective_indexing_strategy(diagnostics);
        let extensions = ExtensionFilter::new(&self.config.extensions);
        let ignore_rules = IgnoreRules::new(&self.config.ignore_files, &self.config.ignore_directories);
        let index = FileIndex::build(
            &root,
            &extensions,
            &ignore_rules,
            strategy,
            self.config.respect_gitignore,
            diagnostics,
        )?;

        self.transition(MergeState::Collecting);
        let scan_root = self.config.effective_dependency_scan_root(&root);
        if !scan_root.is_dir() {
            diagnostics.warn(format!(
                "Dependency scan root is not a directory: {}",
                scan_root.display()
            ));
        }
        let own_outputs = self.own_output_paths(&root);
        let max_depth = self.config.max_dependency_depth;
        let scan_dependencies = self.config.scan_dependencies;
        let targets = self.config.scan_targets.clone();

        let resolver = DependencyResolver::new(
            &root,
            scan_root,
            &index,
            &ignore_rules,
            &mut self.contents,
            max_depth,
        );
        let mut collector = PathCollector::new(
            &root,
            &index,
            &ignore_rules,
            &extensions,
            resolver,
            scan_dependencies,
        );
        let mut files = collector.collect(&targets, diagnostics);
        let stats = collector.resolver_stats();
        files.retain(|rel| {
            let own = own_outputs.iter().any(|p| p == rel);
            if own {
                log::debug!("Skipping the tool's own output file: {}", rel);
            }
            !own
        });
        Ok((strategy, index.len(), files.into_iter().collect(), stats))
    }

    /// Output files under the root, as relative paths, so a wildcard run never merges its own output.
    fn own_output_paths(&self, root: &Path) -> Vec<String> {
        self.config
            .own_output_files(root)
            .iter()
            .filter_map(|p| relative_to_root(p, root))
            .collect()
    }

    fn merge_files(&mut self, files: &[String], diagnostics: &mut Diagnostics) -> (String, Vec<MergedUnit>) {
        let filter = ContentFilter::new(&self.config.filter_options());
        if filter.is_passthrough() {
            log::debug!("No content filters enabled; merging files verbatim");
        }
        let root_name = root_folder_name(&self.project_root);
        let mut document = String::new();
        let mut units = Vec::with_capacity(files.len());
        let mut next_line = 1;

        for rel in files {
            let abs = self.project_root.join(rel);
            let content = match self.contents.get(&abs) {
                Ok(content) => content,
                Err(AppError::FileRead { source, .. }) if source.kind() == ErrorKind::InvalidData => {
                    diagnostics.warn(format!("Skipping file that is not valid UTF-8: {}", rel));
                    continue;
                }
                Err(e) => {
                    diagnostics.warn(format!("Skipping file that could not be read at merge time: {} ({})", rel, e));
                    continue;
                }
            };
            let filtered = filter.apply(content);
            let display_path = format!("/{}/{}", root_name, rel);
            let line_count = filtered.split('\n').count();

            document.push_str(START_MARKER);
            document.push_str(&display_path);
            document.push('\n');
            let start_line = next_line + 1;
            document.push_str(&filtered);
            document.push('\n');
            let end_line = start_line + line_count - 1;
            document.push_str(END_MARKER);
            document.push_str(&display_path);
            document.push_str("\n\n");
            next_line = end_line + 3;

            log::trace!("Merged {} (lines {} - {})", rel, start_line, end_line);
            units.push(MergedUnit {
                relative_path: rel.clone(),
                display_path,
                start_line,
                end_line,
                bytes: filtered.len(),
            });
        }

        let trimmed_len = document.trim_end().len();
        document.truncate(trimmed_len);
        if !document.is_empty() {
            document.push('\n');
        }
        (document, units)
    }

    fn write_outputs(&self, report: &MergeReport) -> Result<WrittenOutputs> {
        let root = &self.project_root;
        let mut outputs = WrittenOutputs::default();

        let document_path = self.config.output_path(root);
        write_text_file(&document_path, &report.document)?;
        log::info!("Merged document written to {}", document_path.display());
        outputs.document = Some(document_path);

        if let Some(list_path) = self.config.file_list_path(root) {
            write_text_file(&list_path, &report.manifest_text())?;
            log::info!("File list written to {}", list_path.display());
            outputs.file_list = Some(list_path);
        }

        if let Some(tree_path) = self.config.size_tree_path(root) {
            let tree = build_size_tree(&report.manifest)?;
            write_text_file(&tree_path, &size_tree_to_json(&tree)?)?;
            log::info!("Size tree written to {}", tree_path.display());
            outputs.size_tree = Some(tree_path);
        }
        Ok(outputs)
    }
}

/// Final path component of the project root, used in marker and manifest paths.
pub fn root_folder_name(project_root: &Path) -> String {
    project_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string())
}
