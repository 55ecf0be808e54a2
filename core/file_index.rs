use crate::config::{IndexingStrategy, WILDCARD_EXTENSION};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::ignore_rules::IgnoreRules;
use crate::paths::{basename, extension_of, relative_to_root};
use ignore::WalkBuilder;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;

const FIND_PROGRAM: &str = "find";

/// Position of a file in the index's stable file array.
pub type FileId = usize;

/// Extension allow-list; `*` admits every file, including extensionless ones.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter {
    allow_all: bool,
    extensions: HashSet<String>,
}

impl ExtensionFilter {
    pub fn new(extensions: &[String]) -> Self {
        let mut filter = ExtensionFilter::default();
        for ext in extensions {
            let ext = ext.trim();
            if ext == WILDCARD_EXTENSION {
                filter.allow_all = true;
                continue;
            }
            let normalized = ext.trim_start_matches('.').to_ascii_lowercase();
            if !normalized.is_empty() {
                filter.extensions.insert(normalized);
            }
        }
        filter
    }

    pub fn matches(&self, file_name: &str) -> bool {
        if self.allow_all {
            return true;
        }
        extension_of(basename(file_name))
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

/// Project-wide lookup from basename or relative path to an indexed file.
///
/// Built once per run and read-only afterwards. Basename collisions resolve
/// to the file indexed last.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    files: Vec<String>,
    by_path: HashMap<String, FileId>,
    by_name: HashMap<String, FileId>,
}

impl FileIndex {
    pub fn build(
        root: &Path,
        extensions: &ExtensionFilter,
        ignore_rules: &IgnoreRules,
        strategy: IndexingStrategy,
        respect_gitignore: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        Self::build_with_find(
            FIND_PROGRAM,
            root,
            extensions,
            ignore_rules,
            strategy,
            respect_gitignore,
            diagnostics,
        )
    }

    fn build_with_find(
        find_program: &str,
        root: &Path,
        extensions: &ExtensionFilter,
        ignore_rules: &IgnoreRules,
        strategy: IndexingStrategy,
        respect_gitignore: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        log::info!(
            "Indexing project files under {} ({})",
            root.display(),
            strategy
        );
        let relative_paths = match strategy {
            IndexingStrategy::PortableWalk => {
                walk_portable(root, ignore_rules, respect_gitignore, diagnostics)
            }
            IndexingStrategy::NativeFindCommand => match walk_native_find(find_program, root) {
                Ok(paths) => {
                    if respect_gitignore {
                        diagnostics.notice(
                            "respectGitignore has no effect with native-find-command indexing",
                        );
                    }
                    paths
                }
                Err(reason) => {
                    diagnostics.warn(format!(
                        "Native find indexing unavailable ({}); falling back to portable walk",
                        reason
                    ));
                    walk_portable(root, ignore_rules, respect_gitignore, diagnostics)
                }
            },
        };

        let mut index = FileIndex::default();
        for rel in relative_paths {
            if !extensions.matches(&rel) {
                log::trace!("Index skip (extension): {}", rel);
                continue;
            }
            if ignore_rules.is_ignored_directory(&rel) {
                log::trace!("Index skip (ignored directory): {}", rel);
                continue;
            }
            index.insert(rel);
        }
        log::info!("Indexed {} files.", index.len());
        Ok(index)
    }

    fn insert(&mut self, rel: String) {
        if self.by_path.contains_key(&rel) {
            return;
        }
        let id = self.files.len();
        let name = basename(&rel).to_string();
        if let Some(previous) = self.by_name.insert(name, id) {
            log::debug!(
                "Basename collision: '{}' now resolves to '{}'",
                self.files[previous],
                rel
            );
        }
        self.by_path.insert(rel.clone(), id);
        self.files.push(rel);
    }

    /// Looks a key up as a relative path first, then as a basename.
    pub fn lookup(&self, key: &str) -> Option<FileId> {
        self.by_path
            .get(key)
            .or_else(|| self.by_name.get(key))
            .copied()
    }

    pub fn id_of_path(&self, rel: &str) -> Option<FileId> {
        self.by_path.get(rel).copied()
    }

    pub fn contains_path(&self, rel: &str) -> bool {
        self.by_path.contains_key(rel)
    }

    pub fn path(&self, id: FileId) -> &str {
        &self.files[id]
    }

    /// Indexed files in walk order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn walk_portable(
    root: &Path,
    ignore_rules: &IgnoreRules,
    respect_gitignore: bool,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let mut builder = WalkBuilder::new(root);
    builder.standard_filters(false);
    builder.hidden(false);
    builder.follow_links(false);
    builder.ignore(respect_gitignore);
    builder.git_ignore(respect_gitignore);
    builder.git_exclude(respect_gitignore);
    builder.require_git(false);
    builder.sort_by_file_name(|a, b| a.cmp(b));

    let prune_rules = ignore_rules.clone();
    let prune_root: PathBuf = root.to_path_buf();
    builder.filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        !(is_dir && entry.depth() > 0 && prune_rules.is_ignored_directory_abs(entry.path(), &prune_root))
    });

    let mut relative_paths = Vec::new();
    for entry_result in builder.build() {
        match entry_result {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                match relative_to_root(entry.path(), root) {
                    Some(rel) => relative_paths.push(rel),
                    None => log::warn!("Could not get relative path for: {}", entry.path().display()),
                }
            }
            Err(e) => diagnostics.warn(format!("Error walking directory: {}", e)),
        }
    }
    relative_paths
}

fn walk_native_find(program: &str, root: &Path) -> std::result::Result<Vec<String>, String> {
    let output = Command::new(program)
        .arg(root)
        .args(["-type", "f"])
        .output()
        .map_err(|e| format!("failed to spawn {}: {}", program, e))?;
    if !output.status.success() {
        return Err(format!("{} exited with {}", program, output.status));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut relative_paths: Vec<String> = stdout
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| relative_to_root(Path::new(line), root))
        .collect();
    relative_paths.sort();
    Ok(relative_paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "src/main.ts", "import './util'");
        write(root, "src/util.ts", "export {}");
        write(root, "src/views/Home.vue", "<template/>");
        write(root, "src/styles.css", "body{}");
        write(root, "node_modules/vue/index.js", "module.exports = {}");
        write(root, "Makefile", "all:");
        tmp
    }

    fn lookup_path<'i>(index: &'i FileIndex, key: &str) -> Option<&'i str> {
        index.lookup(key).map(|id| index.path(id))
    }

    fn build(root: &Path, exts: &[&str], strategy: IndexingStrategy) -> FileIndex {
        let exts: Vec<String> = exts.iter().map(|s| s.to_string()).collect();
        let rules = IgnoreRules::new(&[], &["node_modules".to_string()]);
        let mut diags = Diagnostics::new();
        FileIndex::build(
            root,
            &ExtensionFilter::new(&exts),
            &rules,
            strategy,
            false,
            &mut diags,
        )
        .unwrap()
    }

    #[test]
    fn indexes_by_basename_and_relative_path() {
        let tmp = fixture();
        let index = build(tmp.path(), &["ts", ".vue"], IndexingStrategy::PortableWalk);

        assert_eq!(index.len(), 3);
        assert_eq!(lookup_path(&index, "util.ts"), Some("src/util.ts"));
        assert_eq!(lookup_path(&index, "src/util.ts"), Some("src/util.ts"));
        assert_eq!(lookup_path(&index, "Home.vue"), Some("src/views/Home.vue"));
        assert!(index.lookup("styles.css").is_none());
        assert!(index.lookup("index.js").is_none());
    }

    #[test]
    fn wildcard_includes_extensionless_files() {
        let tmp = fixture();
        let index = build(tmp.path(), &["*"], IndexingStrategy::PortableWalk);

        assert!(index.contains_path("Makefile"));
        assert!(index.contains_path("src/styles.css"));
        assert!(!index.contains_path("node_modules/vue/index.js"));
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn basename_collision_is_last_write_wins() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a/config.ts", "");
        write(tmp.path(), "b/config.ts", "");
        let index = build(tmp.path(), &["ts"], IndexingStrategy::PortableWalk);

        assert_eq!(lookup_path(&index, "config.ts"), Some("b/config.ts"));
        assert!(index.contains_path("a/config.ts"));
    }

    #[test]
    fn top_level_file_keeps_its_path_key_after_collision() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "app.ts", "");
        write(tmp.path(), "lib/app.ts", "");
        let index = build(tmp.path(), &["ts"], IndexingStrategy::PortableWalk);

        assert!(index.contains_path("app.ts"));
        assert_eq!(lookup_path(&index, "app.ts"), Some("app.ts"));
    }

    #[test]
    fn native_strategy_matches_portable_walk() {
        let tmp = fixture();
        let portable = build(tmp.path(), &["*"], IndexingStrategy::PortableWalk);
        let native = build(tmp.path(), &["*"], IndexingStrategy::NativeFindCommand);

        let mut a = portable.files().to_vec();
        let mut b = native.files().to_vec();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_find_program_falls_back_to_portable_walk() {
        let tmp = fixture();
        let portable = build(tmp.path(), &["*"], IndexingStrategy::PortableWalk);
        let rules = IgnoreRules::new(&[], &["node_modules".to_string()]);
        let mut diags = Diagnostics::new();
        let index = FileIndex::build_with_find(
            "codemerge-no-such-find",
            tmp.path(),
            &ExtensionFilter::new(&["*".to_string()]),
            &rules,
            IndexingStrategy::NativeFindCommand,
            false,
            &mut diags,
        )
        .unwrap();

        assert_eq!(index.files(), portable.files());
        let warnings: Vec<_> = diags.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("falling back to portable walk"));
    }

    #[test]
    fn native_find_reports_that_gitignore_is_not_applied() {
        let tmp = fixture();
        write(tmp.path(), ".gitignore", "*.css\n");
        let rules = IgnoreRules::new(&[], &["node_modules".to_string()]);
        let mut diags = Diagnostics::new();
        let index = FileIndex::build(
            tmp.path(),
            &ExtensionFilter::new(&["css".to_string()]),
            &rules,
            IndexingStrategy::NativeFindCommand,
            true,
            &mut diags,
        )
        .unwrap();

        assert!(index.contains_path("src/styles.css"));
        let notices: Vec<_> = diags.notices().collect();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("respectGitignore"));
    }

    #[test]
    fn empty_project_yields_empty_index() {
        let tmp = TempDir::new().unwrap();
        let index = build(tmp.path(), &["*"], IndexingStrategy::PortableWalk);
        assert!(index.is_empty());
    }
}
