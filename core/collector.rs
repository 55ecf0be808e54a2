use crate::diagnostics::Diagnostics;
use crate::file_index::{ExtensionFilter, FileIndex};
use crate::ignore_rules::IgnoreRules;
use crate::paths::normalize_relative;
use crate::resolver::{DependencyResolver, ResolverStats};
use indexmap::IndexSet;
use std::path::Path;

/// Expands scan targets into the ordered, deduplicated list of files to merge.
pub struct PathCollector<'a> {
    root: &'a Path,
    index: &'a FileIndex,
    ignore_rules: &'a IgnoreRules,
    extensions: &'a ExtensionFilter,
    resolver: DependencyResolver<'a>,
    scan_dependencies: bool,
}

impl<'a> PathCollector<'a> {
    pub fn new(
        root: &'a Path,
        index: &'a FileIndex,
        ignore_rules: &'a IgnoreRules,
        extensions: &'a ExtensionFilter,
        resolver: DependencyResolver<'a>,
        scan_dependencies: bool,
    ) -> Self {
        Self {
            root,
            index,
            ignore_rules,
            extensions,
            resolver,
            scan_dependencies,
        }
    }

    /// Each target contributes itself (or the indexed files under it) followed by
    /// dependencies; first occurrence wins. An empty list means the whole project.
    pub fn collect(&mut self, targets: &[String], diagnostics: &mut Diagnostics) -> IndexSet<String> {
        let whole_project = [String::new()];
        let targets = if targets.is_empty() {
            &whole_project[..]
        } else {
            targets
        };

        let mut collected: IndexSet<String> = IndexSet::new();
        for target in targets {
            let rel = normalize_relative(target);
            if rel.is_empty() {
                let index = self.index;
                log::debug!("Collecting whole project ({} indexed files)", index.len());
                for file in index.files() {
                    self.add_with_dependencies(file, &mut collected);
                }
                continue;
            }

            let abs = self.root.join(&rel);
            if abs.is_file() {
                self.collect_file(&rel, &mut collected, diagnostics);
            } else if abs.is_dir() {
                self.collect_directory(&rel, &mut collected, diagnostics);
            } else {
                diagnostics.warn(format!("Scan target not found, skipping: {}", target));
            }
        }

        let before = collected.len();
        collected.retain(|rel| !self.ignore_rules.is_ignored(rel));
        if collected.len() != before {
            log::debug!("Dropped {} ignored paths after collection", before - collected.len());
        }
        log::info!("Collected {} files.", collected.len());
        collected
    }

    fn collect_file(&mut self, rel: &str, collected: &mut IndexSet<String>, diagnostics: &mut Diagnostics) {
        if self.ignore_rules.is_ignored(rel) {
            diagnostics.notice(format!("Scan target is ignored by configuration: {}", rel));
            return;
        }
        if !self.extensions.matches(rel) {
            diagnostics.notice(format!("Scan target does not match the extension list: {}", rel));
            return;
        }
        self.add_with_dependencies(rel, collected);
    }

    fn collect_directory(&mut self, rel: &str, collected: &mut IndexSet<String>, diagnostics: &mut Diagnostics) {
        if self.ignore_rules.is_ignored_directory(rel) {
            diagnostics.notice(format!("Scan target directory is ignored by configuration: {}", rel));
            return;
        }
        let prefix = format!("{}/", rel);
        let index = self.index;
        let mut matched = 0;
        for file in index.files().iter().filter(|f| f.starts_with(&prefix)) {
            matched += 1;
            self.add_with_dependencies(file, collected);
        }
        if matched == 0 {
            diagnostics.notice(format!("No indexed files under directory target: {}", rel));
        }
    }

    fn add_with_dependencies(&mut self, rel: &str, collected: &mut IndexSet<String>) {
        collected.insert(rel.to_string());
        if !self.scan_dependencies {
            return;
        }
        for dep in self.resolver.scan(rel) {
            collected.insert(dep);
        }
    }

    pub fn resolver_stats(&self) -> ResolverStats {
        self.resolver.stats()
    }
}
