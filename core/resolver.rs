use crate::content_cache::ContentCache;
use crate::file_index::{FileId, FileIndex};
use crate::ignore_rules::IgnoreRules;
use crate::paths::{basename, extension_of, normalize_lexically, parent_dir, relative_to_root, stem_of};
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Script extensions scanned for imports, also the order used when probing
/// extensionless import targets.
pub const DEPENDENCY_EXTENSIONS: [&str; 7] = ["js", "vue", "ts", "jsx", "tsx", "mjs", "cjs"];

const IMPORT_TRIGGERS: [&str; 2] = ["import", "require"];
const ALIAS_PREFIXES: [&str; 3] = ["@/", "~/", "/"];

enum Capture {
    Single,
    QuotedList,
}

static IMPORT_PATTERNS: Lazy<Vec<(Capture, Regex)>> = Lazy::new(|| {
    [
        // import x from '..', import { a, b } from '..', import * as ns from '..', import d, { a } from '..'
        (Capture::Single, r#"\bimport\s+[\w$*{}\s,]+?\s*from\s*['"]([^'"\n]+)['"]"#),
        // export { a } from '..', export * from '..'
        (Capture::Single, r#"\bexport\s+[\w$*{}\s,]+?\s*from\s*['"]([^'"\n]+)['"]"#),
        // import '..'
        (Capture::Single, r#"\bimport\s*['"]([^'"\n]+)['"]"#),
        (Capture::Single, r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#),
        // import('..'), import(/* webpackChunkName: "x" */ '..')
        (Capture::Single, r#"(?s)\bimport\s*\(\s*(?:/\*.*?\*/\s*)*['"]([^'"\n]+)['"]"#),
        // require(['a', 'b'], cb), require.ensure(['a'], cb)
        (Capture::QuotedList, r#"\brequire(?:\.ensure)?\s*\(\s*\[([^\]]*)\]"#),
        // defineAsyncComponent(() => import('..')), component: () => import('..')
        (Capture::Single, r#"\b(?:defineAsyncComponent|component)\s*[:(]\s*(?:\(\s*\)\s*=>\s*)?(?:import|require)\s*\(\s*['"]([^'"\n]+)['"]"#),
        // lazy(() => import('..')), React.lazy(...), loadable(...)
        (Capture::Single, r#"\b(?:lazy|loadable)\s*\(\s*\(\s*\)\s*=>\s*(?:import|require)\s*\(\s*['"]([^'"\n]+)['"]"#),
    ]
    .into_iter()
    .map(|(capture, pattern)| {
        (
            capture,
            Regex::new(pattern).expect("built-in import pattern must compile"),
        )
    })
    .collect()
});

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]([^'"\n]+)['"]"#).expect("quoted string pattern must compile"));

/// Extracts raw import specifiers from script text, deduplicated in first-seen order.
///
/// This is text matching, not parsing: specifiers inside comments or strings
/// are picked up too.
pub fn extract_imports(content: &str) -> IndexSet<String> {
    let mut found = IndexSet::new();
    if !IMPORT_TRIGGERS.iter().any(|t| content.contains(t)) {
        return found;
    }
    for (capture, pattern) in IMPORT_PATTERNS.iter() {
        for caps in pattern.captures_iter(content) {
            let Some(group) = caps.get(1) else { continue };
            match capture {
                Capture::Single => {
                    let spec = group.as_str().trim();
                    if !spec.is_empty() {
                        found.insert(spec.to_string());
                    }
                }
                Capture::QuotedList => {
                    for inner in QUOTED.captures_iter(group.as_str()) {
                        if let Some(m) = inner.get(1) {
                            found.insert(m.as_str().trim().to_string());
                        }
                    }
                }
            }
        }
    }
    found
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Files whose imports were extracted and resolved; each file counts once per session.
    pub files_scanned: usize,
    /// Times a file's resolved imports were walked during a scan.
    pub expansions: usize,
    pub memo_hits: usize,
    pub unresolved_imports: usize,
}

/// Transitive import discovery over the file index.
///
/// Each file's imports are extracted and resolved once per session and kept as
/// graph edges. A top-level scan walks those edges depth first with its own
/// visited map, keyed by the depth budget a file was expanded with, so a file
/// reached again by a shorter path is expanded again and nothing else is.
/// Complete top-level results are memoized per (file, remaining depth budget).
pub struct DependencyResolver<'a> {
    root: &'a Path,
    scan_root: PathBuf,
    index: &'a FileIndex,
    ignore_rules: &'a IgnoreRules,
    contents: &'a mut ContentCache,
    max_depth: usize,
    edges: HashMap<FileId, Vec<FileId>>,
    memo: HashMap<(FileId, usize), Vec<FileId>>,
    stats: ResolverStats,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        root: &'a Path,
        scan_root: PathBuf,
        index: &'a FileIndex,
        ignore_rules: &'a IgnoreRules,
        contents: &'a mut ContentCache,
        max_depth: usize,
    ) -> Self {
        Self {
            root,
            scan_root,
            index,
            ignore_rules,
            contents,
            max_depth,
            edges: HashMap::new(),
            memo: HashMap::new(),
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// Whether a complete result for `rel` at the given depth is cached.
    pub fn is_memoized(&self, rel: &str, depth: usize) -> bool {
        match self.index.id_of_path(rel) {
            Some(id) => self
                .memo
                .contains_key(&(id, self.max_depth.saturating_sub(depth))),
            None => false,
        }
    }

    /// Transitive dependencies of `rel`, excluding `rel` itself, in discovery order.
    pub fn scan(&mut self, rel: &str) -> IndexSet<String> {
        self.scan_at_depth(rel, 0)
    }

    pub fn scan_at_depth(&mut self, rel: &str, depth: usize) -> IndexSet<String> {
        let Some(id) = self.index.id_of_path(rel) else {
            log::debug!("Dependency scan skipped, not indexed: {}", rel);
            return IndexSet::new();
        };
        if depth >= self.max_depth {
            return IndexSet::new();
        }
        let budget = self.max_depth - depth;
        let deps = match self.memo.get(&(id, budget)) {
            Some(cached) => {
                self.stats.memo_hits += 1;
                cached.clone()
            }
            None => {
                let mut expanded = HashMap::new();
                let mut found = IndexSet::new();
                self.expand(id, id, budget, &mut expanded, &mut found);
                let deps: Vec<FileId> = found.into_iter().collect();
                self.memo.insert((id, budget), deps.clone());
                deps
            }
        };
        deps.into_iter()
            .map(|dep| self.index.path(dep).to_string())
            .collect()
    }

    /// Depth-first walk from `id` with `budget` import levels left.
    ///
    /// Budgets strictly decrease along the recursion, so a file already on the
    /// current path is never re-entered and the walk terminates on cycles.
    fn expand(
        &mut self,
        origin: FileId,
        id: FileId,
        budget: usize,
        expanded: &mut HashMap<FileId, usize>,
        found: &mut IndexSet<FileId>,
    ) {
        if budget == 0 {
            return;
        }
        if expanded.get(&id).is_some_and(|&seen| seen >= budget) {
            return;
        }
        expanded.insert(id, budget);
        self.stats.expansions += 1;

        for target in self.direct_imports(id) {
            if target != origin {
                found.insert(target);
            }
            self.expand(origin, target, budget - 1, expanded, found);
        }
    }

    /// Resolved imports of one file, computed on first use.
    fn direct_imports(&mut self, id: FileId) -> Vec<FileId> {
        if let Some(targets) = self.edges.get(&id) {
            return targets.clone();
        }
        let rel = self.index.path(id).to_string();
        let mut targets: IndexSet<FileId> = IndexSet::new();
        if let Some(imports) = self.read_imports(&rel) {
            self.stats.files_scanned += 1;
            for raw in &imports {
                match self.resolve_import(raw, &rel) {
                    Some(target) if target != id => {
                        targets.insert(target);
                    }
                    Some(_) => log::trace!("Self import ignored in {}", rel),
                    None => {
                        self.stats.unresolved_imports += 1;
                        log::debug!("Unresolved import '{}' in {}", raw, rel);
                    }
                }
            }
        }
        let targets: Vec<FileId> = targets.into_iter().collect();
        self.edges.insert(id, targets.clone());
        targets
    }

    fn read_imports(&mut self, rel: &str) -> Option<IndexSet<String>> {
        let scannable = extension_of(basename(rel))
            .map(|ext| DEPENDENCY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !scannable || self.ignore_rules.is_ignored_directory(rel) {
            return None;
        }
        let abs = self.root.join(rel);
        if !abs.is_file() {
            return None;
        }
        match self.contents.get(&abs) {
            Ok(content) => Some(extract_imports(content)),
            Err(e) => {
                log::debug!("Dependency scan could not read {}: {}", rel, e);
                None
            }
        }
    }

    /// Maps one import specifier to an indexed file: relative form, then
    /// root-relative form, then basename lookup.
    pub fn resolve_import(&self, raw: &str, importer_rel: &str) -> Option<FileId> {
        let spec = raw.split(['?', '#']).next().unwrap_or(raw).trim();
        if spec.is_empty() {
            return None;
        }

        let is_relative = spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../");
        if is_relative {
            let base = self.root.join(parent_dir(importer_rel));
            if let Some(id) = self.resolve_candidate(&normalize_lexically(&base.join(spec))) {
                return Some(id);
            }
        } else {
            let stripped = ALIAS_PREFIXES
                .iter()
                .find_map(|prefix| spec.strip_prefix(prefix))
                .unwrap_or(spec);
            if !stripped.is_empty() {
                let candidate = normalize_lexically(&self.scan_root.join(stripped));
                if let Some(id) = self.resolve_candidate(&candidate) {
                    return Some(id);
                }
            }
        }

        self.resolve_by_basename(spec)
    }

    fn resolve_candidate(&self, candidate: &Path) -> Option<FileId> {
        let mut attempts = vec![candidate.to_path_buf()];
        for ext in DEPENDENCY_EXTENSIONS {
            let mut with_ext = candidate.as_os_str().to_os_string();
            with_ext.push(".");
            with_ext.push(ext);
            attempts.push(PathBuf::from(with_ext));
        }
        for ext in DEPENDENCY_EXTENSIONS {
            attempts.push(candidate.join(format!("index.{}", ext)));
        }

        for path in attempts {
            if !path.is_file() {
                continue;
            }
            let Some(rel) = relative_to_root(&path, self.root) else {
                continue;
            };
            if self.ignore_rules.is_ignored(&rel) {
                continue;
            }
            if let Some(id) = self.index.id_of_path(&rel) {
                return Some(id);
            }
        }
        None
    }

    fn resolve_by_basename(&self, spec: &str) -> Option<FileId> {
        let name = basename(spec.trim_end_matches('/'));
        if name.is_empty() || name == "." || name == ".." {
            return None;
        }
        let stem = stem_of(name);
        let mut keys: IndexSet<String> = IndexSet::new();
        keys.insert(name.to_string());
        keys.insert(stem.to_string());
        for ext in DEPENDENCY_EXTENSIONS {
            keys.insert(format!("{}.{}", stem, ext));
        }
        keys.iter()
            .filter_map(|key| self.index.lookup(key))
            .find(|&id| !self.ignore_rules.is_ignored(self.index.path(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexingStrategy;
    use crate::diagnostics::Diagnostics;
    use crate::file_index::ExtensionFilter;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        index: FileIndex,
        rules: IgnoreRules,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)], ignore_dirs: &[&str]) -> Self {
            let tmp = TempDir::new().unwrap();
            for (rel, content) in files {
                let path = tmp.path().join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            let dirs: Vec<String> = ignore_dirs.iter().map(|s| s.to_string()).collect();
            let rules = IgnoreRules::new(&[], &dirs);
            let mut diags = Diagnostics::new();
            let index = FileIndex::build(
                tmp.path(),
                &ExtensionFilter::new(&["*".to_string()]),
                &rules,
                IndexingStrategy::PortableWalk,
                false,
                &mut diags,
            )
            .unwrap();
            Self { tmp, index, rules }
        }

        fn scan(&self, rel: &str, max_depth: usize) -> Vec<String> {
            let mut cache = ContentCache::new();
            let mut resolver = DependencyResolver::new(
                self.tmp.path(),
                self.tmp.path().to_path_buf(),
                &self.index,
                &self.rules,
                &mut cache,
                max_depth,
            );
            resolver.scan(rel).into_iter().collect()
        }
    }

    #[test]
    fn extracts_every_import_shape() {
        let source = r#"
            import Vue from 'vue';
            import { a, b as c } from "./named";
            import * as ns from './namespace';
            import def, {
                x,
                y,
            } from './mixed';
            import './side-effect.css';
            export { helper } from './reexport';
            const fs = require('fs');
            const lazy = () => import('./dynamic');
            const chunk = import(/* webpackChunkName: "c" */ './chunked');
            require(['./amd-a', "./amd-b"], function () {});
            const Async = defineAsyncComponent(() => import('./AsyncView.vue'));
            const routes = [{ path: '/', component: () => import('@/views/Home') }];
            const Page = React.lazy(() => import('./Page'));
            import Vue from 'vue';
        "#;
        let imports: Vec<String> = extract_imports(source).into_iter().collect();
        for expected in [
            "vue",
            "./named",
            "./namespace",
            "./mixed",
            "./side-effect.css",
            "./reexport",
            "fs",
            "./dynamic",
            "./chunked",
            "./amd-a",
            "./amd-b",
            "./AsyncView.vue",
            "@/views/Home",
            "./Page",
        ] {
            assert!(imports.contains(&expected.to_string()), "missing {expected}: {imports:?}");
        }
        assert_eq!(imports.iter().filter(|i| *i == "vue").count(), 1);
    }

    #[test]
    fn text_without_triggers_short_circuits() {
        assert!(extract_imports("const x = 1;\nexport default x;").is_empty());
    }

    #[test]
    fn resolves_relative_import_without_extension() {
        let fx = Fixture::new(
            &[("a.ts", "import {x} from './b'"), ("b.ts", "export const x=1")],
            &[],
        );
        assert_eq!(fx.scan("a.ts", 100), vec!["b.ts"]);
    }

    #[test]
    fn resolves_parent_relative_and_index_files() {
        let fx = Fixture::new(
            &[
                ("src/views/Home.vue", "<script>import api from '../api'\nimport Btn from '../components/Btn.vue'</script>"),
                ("src/api/index.js", "export default {}"),
                ("src/components/Btn.vue", "<template/>"),
            ],
            &[],
        );
        assert_eq!(
            fx.scan("src/views/Home.vue", 100),
            vec!["src/api/index.js", "src/components/Btn.vue"]
        );
    }

    #[test]
    fn resolves_alias_against_scan_root_and_falls_back_to_basename() {
        let fx = Fixture::new(
            &[
                ("src/main.js", "import Home from '@/src/views/Home'\nimport util from 'shared/util'"),
                ("src/views/Home.vue", ""),
                ("lib/util.ts", ""),
            ],
            &[],
        );
        assert_eq!(
            fx.scan("src/main.js", 100),
            vec!["src/views/Home.vue", "lib/util.ts"]
        );
    }

    #[test]
    fn three_file_cycle_terminates_without_self() {
        let fx = Fixture::new(
            &[
                ("a.js", "import './b'"),
                ("b.js", "import './c'"),
                ("c.js", "import './a'"),
            ],
            &[],
        );
        assert_eq!(fx.scan("a.js", 100), vec!["b.js", "c.js"]);
        assert_eq!(fx.scan("b.js", 100), vec!["c.js", "a.js"]);
        assert_eq!(fx.scan("c.js", 100), vec!["a.js", "b.js"]);
    }

    #[test]
    fn cycle_does_not_poison_memo() {
        let fx = Fixture::new(
            &[
                ("a.js", "import './b'"),
                ("b.js", "import './c'"),
                ("c.js", "import './a'"),
            ],
            &[],
        );
        let mut cache = ContentCache::new();
        let mut resolver = DependencyResolver::new(
            fx.tmp.path(),
            fx.tmp.path().to_path_buf(),
            &fx.index,
            &fx.rules,
            &mut cache,
            100,
        );
        let a: Vec<String> = resolver.scan("a.js").into_iter().collect();
        assert_eq!(a, vec!["b.js", "c.js"]);
        assert!(resolver.is_memoized("a.js", 0));
        assert!(!resolver.is_memoized("b.js", 1));
        assert!(!resolver.is_memoized("c.js", 2));

        let b: Vec<String> = resolver.scan("b.js").into_iter().collect();
        assert_eq!(b, vec!["c.js", "a.js"]);
        let again: Vec<String> = resolver.scan("a.js").into_iter().collect();
        assert_eq!(again, a);
        assert!(resolver.stats().memo_hits >= 1);
    }

    #[test]
    fn fully_connected_cycle_reads_each_file_once() {
        let n = 10;
        let files: Vec<(String, String)> = (0..n)
            .map(|i| {
                let imports: String = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| format!("import './m{}'\n", j))
                    .collect();
                (format!("m{}.js", i), imports)
            })
            .collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
        let fx = Fixture::new(&refs, &[]);
        let mut cache = ContentCache::new();
        let mut resolver = DependencyResolver::new(
            fx.tmp.path(),
            fx.tmp.path().to_path_buf(),
            &fx.index,
            &fx.rules,
            &mut cache,
            100,
        );

        let deps: Vec<String> = resolver.scan("m0.js").into_iter().collect();
        let expected: Vec<String> = (1..n).map(|j| format!("m{}.js", j)).collect();
        assert_eq!(deps, expected);
        let stats = resolver.stats();
        assert_eq!(stats.files_scanned, n);
        assert!(stats.expansions <= n * n, "expansions: {}", stats.expansions);

        for i in 1..n {
            assert_eq!(resolver.scan(&format!("m{}.js", i)).len(), n - 1);
        }
        assert_eq!(resolver.stats().files_scanned, n);
    }

    #[test]
    fn depth_ceiling_limits_chain() {
        let fx = Fixture::new(
            &[
                ("a.js", "require('./b')"),
                ("b.js", "require('./c')"),
                ("c.js", "require('./d')"),
                ("d.js", ""),
            ],
            &[],
        );
        assert_eq!(fx.scan("a.js", 1), vec!["b.js"]);
        assert_eq!(fx.scan("a.js", 2), vec!["b.js", "c.js"]);
        assert_eq!(fx.scan("a.js", 100), vec!["b.js", "c.js", "d.js"]);
        assert!(fx.scan("a.js", 0).is_empty());
    }

    #[test]
    fn shorter_path_extends_depth_limited_result() {
        let fx = Fixture::new(
            &[
                ("a.js", "import './b'\nimport './c'"),
                ("b.js", "import './c'"),
                ("c.js", "import './d'"),
                ("d.js", ""),
            ],
            &[],
        );
        assert_eq!(fx.scan("a.js", 2), vec!["b.js", "c.js", "d.js"]);
    }

    #[test]
    fn ignored_directories_are_never_dependency_targets() {
        let fx = Fixture::new(
            &[
                ("a.js", "import x from './vendor/x'\nimport y from 'y'"),
                ("vendor/x.js", ""),
                ("vendor/y.js", ""),
            ],
            &["vendor"],
        );
        assert!(fx.scan("a.js", 100).is_empty());
    }

    #[test]
    fn non_script_files_are_not_scanned() {
        let fx = Fixture::new(
            &[("notes.md", "import './a'"), ("a.js", "")],
            &[],
        );
        assert!(fx.scan("notes.md", 100).is_empty());
    }

    #[test]
    fn query_suffixes_and_self_imports_are_dropped() {
        let fx = Fixture::new(
            &[
                ("a.js", "import raw from './b.js?raw'\nimport me from './a'"),
                ("b.js", ""),
            ],
            &[],
        );
        assert_eq!(fx.scan("a.js", 100), vec!["b.js"]);
    }
}
