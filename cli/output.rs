use anyhow::{Context, Result};
use codemerge_core::output_formats::{self, StructuredFormat};
use codemerge_core::{Diagnostics, MergeReport, MergeStats, SearchHit, Severity};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::io::{self, Write};

use crate::cli_args::FormatOutputOpts;

/// Prints `data` in the requested structured format, or `plain_text` when no format was given.
pub fn print_data_or_text<T: Serialize>(
    data: &T,
    plain_text: Option<String>,
    format_opts: &FormatOutputOpts,
) -> Result<()> {
    match format_opts.format.as_deref() {
        Some(format) => {
            let content = serialize_output(data, format)?;
            write_to_stdout(&content)
        }
        None => match plain_text {
            Some(text) => write_to_stdout(&text),
            None => write_to_stdout(&serialize_output(data, "json")?),
        },
    }
}

pub fn serialize_output<T: Serialize>(data: &T, format: &str) -> Result<String> {
    let format = StructuredFormat::parse(format)?;
    output_formats::serialize(data, format).map_err(anyhow::Error::from)
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_diagnostics(diagnostics: &Diagnostics, quiet: bool) {
    if quiet {
        return;
    }
    for diagnostic in diagnostics.iter() {
        match diagnostic.severity {
            Severity::Warning => eprintln!("{} {}", "⚠️".yellow(), diagnostic.message.yellow()),
            Severity::Notice => eprintln!("{} {}", "ℹ️".blue(), diagnostic.message.dimmed()),
        }
    }
}

pub fn print_merge_summary(report: &MergeReport, quiet: bool) {
    if quiet {
        return;
    }
    print_diagnostics(&report.diagnostics, quiet);
    if let Some(path) = &report.outputs.document {
        println!(
            "{} Merged {} files ({} lines) into: {}",
            "✅".green(),
            report.units.len().to_string().cyan(),
            report.total_lines().to_string().cyan(),
            path.display().to_string().blue()
        );
    }
    if let Some(path) = &report.outputs.file_list {
        println!(
            "{} File list saved to: {}",
            "📄".blue(),
            path.display().to_string().dimmed()
        );
    }
    if let Some(path) = &report.outputs.size_tree {
        println!(
            "{} Size tree saved to: {}",
            "🌳".green(),
            path.display().to_string().dimmed()
        );
    }
}

pub fn print_stats_pretty_table(stats: &MergeStats) -> Result<()> {
    println!();
    println!("{}", " Merge Statistics ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        stats.total_files.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Lines:".green(),
        stats.total_lines.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Size:".green(),
        stats.total_bytes_readable.cyan()
    );
    println!(
        "{:<20} {}",
        "Est. Tokens:".green(),
        stats.estimated_tokens.to_string().cyan()
    );

    if stats.files_details.is_empty() {
        println!("\n{}", "(No files included)".yellow());
    } else {
        println!("\n{}", " File Details ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Lines").fg(Color::Green),
            Cell::new("Size").fg(Color::Green),
            Cell::new("Tokens").fg(Color::Green),
        ]);
        for file in &stats.files_details {
            table.add_row(vec![
                Cell::new(&file.path).fg(Color::Cyan),
                Cell::new(file.lines).set_alignment(CellAlignment::Right),
                Cell::new(&file.bytes_readable)
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
                Cell::new(file.estimated_tokens).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }
    println!();
    Ok(())
}

pub fn print_search_hits_pretty(query: &str, hits: &[SearchHit]) {
    println!();
    println!(
        "{} {}",
        " Results for ".green().bold().underline(),
        query.cyan()
    );
    if hits.is_empty() {
        println!("\n{}", "(No matches)".yellow());
        return;
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "\n{} {} {} {}",
            format!("#{}", rank + 1).green().bold(),
            hit.path.cyan(),
            format!("(lines {} - {})", hit.start_line, hit.end_line).dimmed(),
            format!("score {:.4}", hit.score).blue()
        );
        for line in hit.text.lines().skip(1).take(6) {
            println!("    {}", line.dimmed());
        }
    }
    println!();
}
