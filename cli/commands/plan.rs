use crate::cli_args::PlanArgs;
use crate::load_config_for_command;
use crate::output::{print_data_or_text, print_diagnostics};
use anyhow::{Context, Result};
use codemerge_core::{Config, MergePlan, Merger};
use colored::*;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanInfo<'a> {
    effective_config: &'a Config,
    plan: &'a MergePlan,
}

pub fn handle_plan_command(args: PlanArgs, quiet: bool) -> Result<()> {
    let (config, project_root) = load_config_for_command(&args.project_config, Some(&args.overrides))
        .context("Failed to load configuration for plan command")?;

    let mut merger = Merger::new(config, project_root).context("Failed to start merge plan")?;
    let plan = merger.plan().context("Failed to plan merge")?;
    let info = PlanInfo {
        effective_config: merger.config(),
        plan: &plan,
    };

    if args.format_output.format.is_none() {
        print_diagnostics(&plan.diagnostics, quiet);
        print_plan_pretty(&info)
    } else {
        print_data_or_text(&info, None, &args.format_output)
    }
}

fn print_plan_pretty(info: &PlanInfo) -> Result<()> {
    println!(
        "{}",
        "\n--- Effective Configuration ---"
            .green()
            .bold()
            .underline()
    );
    let config_toml = toml::to_string_pretty(info.effective_config)
        .context("Failed to serialize effective config to TOML")?;
    println!("{}", config_toml);

    let plan = info.plan;
    println!("{}", "\n--- Project ---".green().bold().underline());
    println!("{:<20} {}", "Root:".green(), plan.project_root.display().to_string().cyan());
    println!("{:<20} {}", "Indexing:".green(), plan.indexing_strategy.to_string().cyan());
    println!("{:<20} {}", "Indexed files:".green(), plan.indexed_files.to_string().cyan());
    println!(
        "{:<20} {}",
        "Imports followed:".green(),
        format!(
            "{} files scanned, {} unresolved",
            plan.resolver_stats.files_scanned, plan.resolver_stats.unresolved_imports
        )
        .cyan()
    );

    println!(
        "{}",
        format!("\n--- Files To Merge ({}) ---", plan.files.len())
            .green()
            .bold()
            .underline()
    );
    if plan.files.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        for (i, rel) in plan.files.iter().enumerate() {
            println!("{:>4}. {}", i + 1, rel.cyan());
        }
    }
    println!("{}", "\n--- End Plan ---".green().bold());
    Ok(())
}
