use crate::cli_args::WatchArgs;
use crate::commands::merge::trigger_merge;
use crate::load_config_for_command;
use anyhow::{Context, Result};
use codemerge_core::paths::{basename, relative_to_root};
use codemerge_core::{Config, ExtensionFilter, IgnoreRules};
use colored::*;
use notify::{ErrorKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebouncedEvent, Debouncer, new_debouncer};
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Decides which file system events should trigger a new merge.
struct ChangeFilter {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    own_outputs: HashSet<PathBuf>,
    merged_files: HashSet<String>,
    extensions: ExtensionFilter,
    ignore_rules: IgnoreRules,
}

#[derive(Debug, PartialEq, Eq)]
enum ChangeKind {
    Config,
    Source,
}

impl ChangeFilter {
    fn new(config: &Config, project_root: &Path, config_path: Option<PathBuf>) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: config_path.map(|p| canonical_or_self(&p)),
            own_outputs: config
                .own_output_files(project_root)
                .iter()
                .map(|p| canonical_or_self(p))
                .collect(),
            merged_files: HashSet::new(),
            extensions: ExtensionFilter::new(&config.extensions),
            ignore_rules: IgnoreRules::new(&config.ignore_files, &config.ignore_directories),
        }
    }

    fn classify(&self, path: &Path) -> Option<ChangeKind> {
        let path = canonical_or_self(path);
        if self.config_path.as_ref() == Some(&path) {
            return Some(ChangeKind::Config);
        }
        if self.own_outputs.contains(&path) {
            return None;
        }
        let rel = relative_to_root(&path, &self.project_root)?;
        if self.merged_files.contains(&rel) {
            return Some(ChangeKind::Source);
        }
        if self.ignore_rules.is_ignored(&rel) || !self.extensions.matches(basename(&rel)) {
            return None;
        }
        Some(ChangeKind::Source)
    }

    /// Strongest change among `events`: a config edit outranks source edits.
    fn classify_events(&self, events: &[DebouncedEvent]) -> Option<ChangeKind> {
        let mut result = None;
        for event in events {
            match self.classify(&event.path) {
                Some(ChangeKind::Config) => return Some(ChangeKind::Config),
                Some(ChangeKind::Source) => result = Some(ChangeKind::Source),
                None => log::trace!("Ignoring event for {}", event.path.display()),
            }
        }
        result
    }
}

/// Paths vanish between the event and the check; fall back to the raw path.
fn canonical_or_self(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Directories that can receive new scan candidates, plus the files already merged.
fn watch_targets(
    config: &Config,
    project_root: &Path,
    merged_files: &HashSet<String>,
    config_path: Option<&PathBuf>,
) -> HashMap<PathBuf, RecursiveMode> {
    let mut targets = HashMap::new();
    if config.scan_targets.is_empty() {
        targets.insert(project_root.to_path_buf(), RecursiveMode::Recursive);
    } else {
        for target in &config.scan_targets {
            let path = project_root.join(target);
            if path.is_dir() {
                targets.insert(path, RecursiveMode::Recursive);
            } else if path.is_file() {
                targets.insert(path, RecursiveMode::NonRecursive);
            }
        }
    }
    for rel in merged_files {
        targets
            .entry(project_root.join(rel))
            .or_insert(RecursiveMode::NonRecursive);
    }
    if let Some(path) = config_path {
        targets
            .entry(path.clone())
            .or_insert(RecursiveMode::NonRecursive);
    }
    targets
}

fn sync_watches(
    watcher: &mut Debouncer<RecommendedWatcher>,
    wanted: HashMap<PathBuf, RecursiveMode>,
    current: &mut HashMap<PathBuf, RecursiveMode>,
    quiet: bool,
) {
    let stale: Vec<PathBuf> = current
        .iter()
        .filter(|(path, mode)| wanted.get(*path) != Some(*mode))
        .map(|(path, _)| path.clone())
        .collect();
    for path in stale {
        match watcher.watcher().unwatch(&path) {
            Ok(_) => log::trace!("Unwatched: {}", path.display()),
            Err(e) => match e.kind {
                ErrorKind::WatchNotFound => log::trace!("Watch not found for {}", path.display()),
                _ => log::warn!("Failed to unwatch {}: {}", path.display(), e),
            },
        }
        current.remove(&path);
    }

    for (path, mode) in wanted {
        if current.contains_key(&path) || !path.exists() {
            continue;
        }
        match watcher.watcher().watch(&path, mode) {
            Ok(_) => {
                log::debug!("Watching: {} ({:?})", path.display(), mode);
                current.insert(path, mode);
            }
            Err(e) => {
                if !quiet {
                    eprintln!("{} Failed to watch {}: {}", "⚠️".yellow(), path.display(), e);
                }
                log::warn!("Failed to watch {}: {}", path.display(), e);
            }
        }
    }
}

fn load_watch_config(args: &WatchArgs) -> Result<(Config, PathBuf, Option<PathBuf>)> {
    let (mut config, project_root) =
        load_config_for_command(&args.project_config, Some(&args.overrides))?;
    if let Some(delay) = &args.watch_delay {
        config.watch.delay = delay.clone();
    }
    let search_dir = match &args.project_config.project_root {
        Some(root) => root.clone(),
        None => env::current_dir().context("Failed to read the current directory")?,
    };
    let config_path = Config::resolve_config_path(
        &search_dir,
        args.project_config.config.as_ref(),
        args.project_config.no_config,
    )?;
    Ok((config, project_root, config_path))
}

/// Merges once and returns the merged relative paths; errors are reported, not fatal.
fn merge_once(config: &Config, project_root: &Path, quiet: bool) -> Option<HashSet<String>> {
    match trigger_merge(config.clone(), project_root.to_path_buf(), quiet) {
        Ok(report) => Some(report.units.into_iter().map(|u| u.relative_path).collect()),
        Err(e) => {
            if !quiet {
                eprintln!("{} {:#}\n", "⚠️ Error during merge:".yellow(), e);
            }
            log::error!("Merge failed in watch mode: {:#}", e);
            None
        }
    }
}

pub fn run_watch_mode(watch_args: WatchArgs, quiet: bool, verbose: u8) -> Result<()> {
    let (mut config, project_root, config_path) = load_watch_config(&watch_args)
        .context("Failed to load initial configuration for watch mode")?;
    if !quiet {
        println!(
            "👀 Starting watch mode for '{}'. Press Ctrl+C to exit.",
            project_root.display()
        );
    }

    let mut filter = ChangeFilter::new(&config, &project_root, config_path.clone());
    if let Some(files) = merge_once(&config, &project_root, quiet) {
        filter.merged_files = files;
    }

    let (tx, rx) = mpsc::channel();
    let delay = config
        .get_watch_delay()
        .context("Invalid watch delay duration")?;
    let mut debouncer = new_debouncer(delay, tx)
        .map_err(|e| anyhow::anyhow!("Failed to create debouncer: {}", e))?;
    let mut watched = HashMap::new();
    sync_watches(
        &mut debouncer,
        watch_targets(&config, &project_root, &filter.merged_files, config_path.as_ref()),
        &mut watched,
        quiet,
    );
    if !quiet && verbose > 0 {
        println!("🔍 Watching {} paths...", watched.len());
    }

    loop {
        let events = match rx.recv() {
            Ok(Ok(events)) => events,
            Ok(Err(error)) => {
                if !quiet {
                    eprintln!("{} {:#}\n", "⚠️ Watch error:".yellow(), error);
                }
                log::error!("Notify error received: {:?}", error);
                continue;
            }
            Err(e) => {
                eprintln!("{} {:#}\n", "⛔ Watcher channel error:".red(), e);
                break Ok(());
            }
        };
        for event in &events {
            log::trace!("Debounced event: {:?}", event);
        }

        let Some(change) = filter.classify_events(&events) else {
            continue;
        };

        if change == ChangeKind::Config {
            if !quiet && verbose > 0 {
                eprintln!("{}", "🔄 Config file changed. Reloading configuration...".blue());
            }
            match load_watch_config(&watch_args) {
                Ok((reloaded, _, _)) => {
                    config = reloaded;
                    let merged = std::mem::take(&mut filter.merged_files);
                    filter = ChangeFilter::new(&config, &project_root, config_path.clone());
                    filter.merged_files = merged;
                    if !quiet && verbose > 0 {
                        eprintln!("{}", "✅ Configuration reloaded.".green());
                    }
                }
                Err(e) => {
                    if !quiet {
                        eprintln!("{} {:#}\n", "⚠️ Error reloading config:".yellow(), e);
                    }
                    continue;
                }
            }
        } else if !quiet && verbose > 0 {
            eprintln!(
                "\n{} {} event(s) detected. Merging again...",
                "🔄".blue(),
                events.len()
            );
        }

        if let Some(files) = merge_once(&config, &project_root, quiet) {
            filter.merged_files = files;
        }
        sync_watches(
            &mut debouncer,
            watch_targets(&config, &project_root, &filter.merged_files, config_path.as_ref()),
            &mut watched,
            quiet,
        );
        if !quiet && verbose > 0 {
            println!("🔍 Watching {} paths...", watched.len());
        }
    }
}
