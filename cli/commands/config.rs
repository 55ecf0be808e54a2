use crate::cli_args::ConfigArgs;
use anyhow::{Context, Result};
use codemerge_core::Config;
use codemerge_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};
use codemerge_core::output_formats::write_text_file;
use colored::*;
use std::env;
use std::io::{self, Write};

use crate::output::write_to_stdout;

pub fn handle_config_command(args: &ConfigArgs, quiet: bool) -> Result<()> {
    let default_toml = Config::default()
        .to_toml_string()
        .context("Failed to serialize default config")?;

    if !args.save {
        return write_to_stdout(&default_toml);
    }

    let root = match &args.project_config.project_root {
        Some(root) => root.clone(),
        None => env::current_dir().context("Failed to read the current directory")?,
    };
    let save_path = match &args.project_config.config {
        Some(path) => path.clone(),
        None => root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME),
    };

    if save_path.exists() {
        if quiet {
            anyhow::bail!(
                "Target file '{}' exists. Overwrite prevented in quiet mode.",
                save_path.display()
            );
        }
        print!(
            "{} Config file already exists at '{}'. Overwrite? [{}/{}] ",
            "⚠️".yellow(),
            save_path.display().to_string().cyan(),
            "y".green(),
            "N".red()
        );
        io::stdout().flush().context("Failed to flush stdout")?;
        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .context("Failed to read user input")?;
        if !response.trim().eq_ignore_ascii_case("y") {
            println!("Save cancelled.");
            return Ok(());
        }
    }

    write_text_file(&save_path, &default_toml)?;
    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}
