use crate::cli_args::MergeArgs;
use crate::load_config_for_command;
use crate::output;
use anyhow::{Context, Result};
use codemerge_core::{Config, Diagnostics, MergeReport, Merger, calculate_stats};
use std::path::PathBuf;

pub fn handle_merge_command(args: MergeArgs, quiet: bool) -> Result<()> {
    let (config, project_root) = load_config_for_command(&args.project_config, Some(&args.overrides))
        .context("Failed to load configuration")?;

    let report = trigger_merge(config, project_root, quiet)?;

    if args.stats {
        let files: Vec<String> = report.units.iter().map(|u| u.relative_path.clone()).collect();
        let mut diagnostics = Diagnostics::new();
        let stats = calculate_stats(&report.project_root, &files, &mut diagnostics)
            .context("Failed to calculate merge statistics")?;
        output::print_diagnostics(&diagnostics, quiet);
        output::print_stats_pretty_table(&stats)?;
    }
    Ok(())
}

/// Runs one full merge and prints its summary. Shared with watch mode.
pub fn trigger_merge(config: Config, project_root: PathBuf, quiet: bool) -> Result<MergeReport> {
    log::info!("Starting merge for: {}", project_root.display());
    let mut merger = Merger::new(config, project_root).context("Failed to start merge")?;
    let report = merger.run().context("Merge failed")?;
    output::print_merge_summary(&report, quiet);
    Ok(report)
}
