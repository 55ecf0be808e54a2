use crate::cli_args::EmbedArgs;
use crate::load_config_for_command;
use anyhow::{Context, Result};
use codemerge_core::output_formats::read_text_file;
use codemerge_core::{EmbeddingIndex, OpenAiCompatibleProvider, split_merged_document};
use colored::*;

pub fn handle_embed_command(args: EmbedArgs, quiet: bool) -> Result<()> {
    let (mut config, project_root) = load_config_for_command(&args.project_config, None)
        .context("Failed to load configuration for embed command")?;
    if let Some(model) = &args.model {
        config.embedding.model = model.clone();
    }
    let batch_size = args.batch_size.unwrap_or(config.embedding.batch_size);

    let document_path = match &args.document {
        Some(path) => path.clone(),
        None => config.output_path(&project_root),
    };
    let index_path = match &args.index {
        Some(path) => path.clone(),
        None => config.embedding_index_path(&project_root),
    };

    let document = read_text_file(&document_path)
        .with_context(|| format!("Run 'codemerge merge' first; no document at {}", document_path.display()))?;
    let chunks = split_merged_document(&document);
    if chunks.is_empty() {
        if !quiet {
            println!(
                "{} No file blocks found in {}; nothing to embed.",
                "⚠️".yellow(),
                document_path.display()
            );
        }
        return Ok(());
    }
    log::info!(
        "Embedding {} chunks from {} with model '{}'",
        chunks.len(),
        document_path.display(),
        config.embedding.model
    );

    let provider = OpenAiCompatibleProvider::new(&config.embedding)?;
    let chunk_count = chunks.len();
    let index = EmbeddingIndex::build(&provider, chunks, &document_path, batch_size)
        .context("Failed to embed merged document")?;
    index.save(&index_path)?;

    if !quiet {
        println!(
            "{} Embedded {} chunks ({} tokens) into: {}",
            "✅".green(),
            chunk_count.to_string().cyan(),
            index.usage.total_tokens.to_string().cyan(),
            index_path.display().to_string().blue()
        );
    }
    Ok(())
}
