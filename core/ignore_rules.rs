use crate::paths::{basename, normalize_relative, relative_to_root};
use std::collections::HashSet;
use std::path::Path;

/// Ignore predicates shared by indexing, collection and dependency resolution.
///
/// Directory entries match by raw string prefix on the normalized relative path,
/// so `foo` also ignores a sibling named `foo2`.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    files: HashSet<String>,
    directories: Vec<String>,
}

impl IgnoreRules {
    pub fn new(ignore_files: &[String], ignore_directories: &[String]) -> Self {
        let files = ignore_files
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        let directories = ignore_directories
            .iter()
            .map(|d| normalize_relative(d))
            .filter(|d| !d.is_empty())
            .collect();
        Self { files, directories }
    }

    pub fn is_ignored_file(&self, rel_path: &str) -> bool {
        self.files.contains(basename(rel_path))
    }

    /// `rel_path` is relative to the project root.
    pub fn is_ignored_directory(&self, rel_path: &str) -> bool {
        let normalized = normalize_relative(rel_path);
        self.directories
            .iter()
            .any(|dir| normalized.starts_with(dir.as_str()))
    }

    /// Absolute-path variant; paths outside `root` are never considered ignored here.
    pub fn is_ignored_directory_abs(&self, path: &Path, root: &Path) -> bool {
        match relative_to_root(path, root) {
            Some(rel) => self.is_ignored_directory(&rel),
            None => false,
        }
    }

    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.is_ignored_directory(rel_path) || self.is_ignored_file(rel_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> IgnoreRules {
        IgnoreRules::new(
            &["package-lock.json".to_string()],
            &["/node_modules/".to_string(), "src/legacy".to_string(), "  ".to_string()],
        )
    }

    #[test]
    fn matches_ignored_basenames_exactly() {
        let rules = rules();
        assert!(rules.is_ignored_file("package-lock.json"));
        assert!(rules.is_ignored_file("nested/dir/package-lock.json"));
        assert!(!rules.is_ignored_file("package-lock.json.bak"));
    }

    #[test]
    fn matches_directory_prefixes() {
        let rules = rules();
        assert!(rules.is_ignored_directory("node_modules/vue/index.js"));
        assert!(rules.is_ignored_directory("./src/legacy/old.js"));
        assert!(!rules.is_ignored_directory("src/app.js"));
    }

    #[test]
    fn prefix_match_is_not_segment_aware() {
        let rules = rules();
        assert!(rules.is_ignored_directory("src/legacy2/new.js"));
    }

    #[test]
    fn blank_entries_do_not_ignore_everything() {
        let rules = IgnoreRules::new(&[], &["/".to_string(), "".to_string()]);
        assert!(!rules.is_ignored_directory("src/app.js"));
    }

    #[test]
    fn absolute_paths_outside_root_are_not_ignored() {
        let rules = rules();
        let root = Path::new("/p");
        assert!(rules.is_ignored_directory_abs(Path::new("/p/node_modules/x.js"), root));
        assert!(!rules.is_ignored_directory_abs(Path::new("/elsewhere/node_modules/x.js"), root));
    }
}
