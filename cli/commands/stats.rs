use crate::cli_args::StatsArgs;
use crate::load_config_for_command;
use crate::output::{print_data_or_text, print_diagnostics, print_stats_pretty_table};
use anyhow::{Context, Result};
use codemerge_core::{Merger, calculate_stats};

pub fn handle_stats_command(args: StatsArgs, quiet: bool) -> Result<()> {
    let (config, project_root) = load_config_for_command(&args.project_config, Some(&args.overrides))
        .context("Failed to load configuration for stats command")?;

    log::debug!("Planning merge for statistics...");
    let mut merger = Merger::new(config, project_root).context("Failed to start merge plan")?;
    let mut plan = merger.plan().context("Failed to plan merge")?;

    if plan.files.is_empty() {
        print_diagnostics(&plan.diagnostics, quiet);
        if !quiet {
            println!("No files found to calculate statistics.");
        }
        return Ok(());
    }

    let stats = calculate_stats(&plan.project_root, &plan.files, &mut plan.diagnostics)
        .context("Failed to calculate statistics")?;
    print_diagnostics(&plan.diagnostics, quiet);

    if args.format_output.format.is_none() {
        print_stats_pretty_table(&stats)
    } else {
        print_data_or_text(&stats, None, &args.format_output)
    }
}
