mod cli_args;
mod commands;
mod output;
mod watch;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use std::env;
use std::path::PathBuf;
use std::process;

use cli_args::{Cli, Commands, MergeOverrides, ProjectConfigOpts};
use codemerge_core::{AppError, Config};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;
    let verbose = cli_args.verbose;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet, verbose) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}\n", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::ProjectRootMissing { .. }) => 2,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::DirCreation { .. }) => 2,
        Some(AppError::Manifest(_)) => 3,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::DurationParse(_)) => 5,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::YamlError(_)) => 6,
        Some(e) if e.is_embedding_failure() => 7,
        Some(AppError::TikToken(_)) => 8,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool, verbose: u8) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Merge(args) => {
                log::debug!("Executing 'merge' command...");
                commands::merge::handle_merge_command(args, quiet)?;
            }
            Commands::Plan(args) => {
                log::debug!("Executing 'plan' command...");
                commands::plan::handle_plan_command(args, quiet)?;
            }
            Commands::Stats(args) => {
                log::debug!("Executing 'stats' command...");
                commands::stats::handle_stats_command(args, quiet)?;
            }
            Commands::Tree(args) => {
                log::debug!("Executing 'tree' command...");
                commands::tree::handle_tree_command(args, quiet)?;
            }
            Commands::Embed(args) => {
                log::debug!("Executing 'embed' command...");
                commands::embed::handle_embed_command(args, quiet)?;
            }
            Commands::Search(args) => {
                log::debug!("Executing 'search' command...");
                commands::search::handle_search_command(args, quiet)?;
            }
            Commands::Watch(args) => {
                log::debug!("Executing 'watch' command...");
                watch::run_watch_mode(args, quiet, verbose)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                commands::config::handle_config_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

fn apply_merge_overrides(mut config: Config, overrides: &MergeOverrides) -> Config {
    log::trace!("Applying CLI overrides to config...");
    if !overrides.targets.is_empty() {
        config.scan_targets = overrides.targets.clone();
    }
    if let Some(output) = &overrides.output {
        config.output_file = output.clone();
    }
    if let Some(file_list) = &overrides.file_list {
        config.file_list_output_file = Some(file_list.clone());
    }
    if overrides.no_deps {
        config.scan_dependencies = false;
    }
    if let Some(depth) = overrides.max_depth {
        config.max_dependency_depth = depth;
    }
    config
}

/// Loads the config for a command and resolves the project root.
///
/// The config file is searched for under `--project-root` when given, else the
/// current directory. The returned root is canonical.
pub fn load_config_for_command(
    project_opts: &ProjectConfigOpts,
    overrides: Option<&MergeOverrides>,
) -> Result<(Config, PathBuf)> {
    let search_dir = match &project_opts.project_root {
        Some(root) => root.clone(),
        None => env::current_dir().context("Failed to read the current directory")?,
    };
    let config_path = Config::resolve_config_path(
        &search_dir,
        project_opts.config.as_ref(),
        project_opts.no_config,
    )
    .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(overrides) = overrides {
        config = apply_merge_overrides(config, overrides);
    }

    let project_root = config
        .determine_project_root(project_opts.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());
    Ok((config, project_root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let overrides = MergeOverrides {
            targets: vec!["src/main.ts".to_string()],
            output: Some(PathBuf::from("out.txt")),
            file_list: None,
            no_deps: true,
            max_depth: Some(2),
        };
        let config = apply_merge_overrides(Config::default(), &overrides);
        assert_eq!(config.scan_targets, vec!["src/main.ts"]);
        assert_eq!(config.output_file, PathBuf::from("out.txt"));
        assert!(config.file_list_output_file.is_none());
        assert!(!config.scan_dependencies);
        assert_eq!(config.max_dependency_depth, 2);
    }

    #[test]
    fn errors_map_to_exit_codes() {
        let missing = anyhow::Error::new(AppError::ProjectRootMissing {
            path: PathBuf::from("/nope"),
        });
        assert_eq!(exit_code_for(&missing), 2);
        let embedding = anyhow::Error::new(AppError::EmbeddingApi {
            status: 500,
            body: String::new(),
        });
        assert_eq!(exit_code_for(&embedding), 7);
        let config = anyhow::Error::new(AppError::Config("bad".to_string()))
            .context("Failed to load configuration");
        assert_eq!(exit_code_for(&config), 1);
        let delay = anyhow::Error::new(AppError::DurationParse("soon".to_string()));
        assert_eq!(exit_code_for(&delay), 5);
        assert_eq!(exit_code_for(&anyhow::anyhow!("plain")), 1);
    }
}
