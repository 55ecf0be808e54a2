use crate::cli_args::TreeArgs;
use crate::load_config_for_command;
use crate::output::{print_diagnostics, write_to_stdout};
use anyhow::{Context, Result};
use codemerge_core::output_formats::{read_text_file, write_text_file};
use codemerge_core::size_tree::size_tree_to_json;
use codemerge_core::{Diagnostics, ManifestEntry, Merger, build_size_tree, manifest};
use colored::*;

pub fn handle_tree_command(args: TreeArgs, quiet: bool) -> Result<()> {
    let (config, project_root) = load_config_for_command(&args.project_config, Some(&args.overrides))
        .context("Failed to load configuration for tree command")?;
    let save_path = args
        .save
        .clone()
        .or_else(|| config.size_tree_path(&project_root));

    let mut diagnostics = Diagnostics::new();
    let entries: Vec<ManifestEntry> = match &args.manifest {
        Some(path) => {
            log::info!("Reading manifest from {}", path.display());
            let text = read_text_file(path).context("Failed to read manifest")?;
            manifest::parse(&text, &mut diagnostics)
        }
        None => {
            log::info!("Building manifest in memory for {}", project_root.display());
            let mut merger = Merger::new(config, project_root).context("Failed to start merge")?;
            let report = merger.build().context("Failed to build merged document")?;
            diagnostics.extend(report.diagnostics);
            report.manifest
        }
    };
    print_diagnostics(&diagnostics, quiet);

    let tree = build_size_tree(&entries).context("Failed to build size tree")?;
    let json = size_tree_to_json(&tree)?;
    match save_path {
        Some(path) => {
            write_text_file(&path, &json)?;
            if !quiet {
                println!(
                    "{} Size tree saved to: {}",
                    "🌳".green(),
                    path.display().to_string().blue()
                );
            }
            Ok(())
        }
        None => write_to_stdout(&json),
    }
}
