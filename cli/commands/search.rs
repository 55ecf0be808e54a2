use crate::cli_args::SearchArgs;
use crate::load_config_for_command;
use crate::output::{print_data_or_text, print_search_hits_pretty};
use anyhow::{Context, Result};
use codemerge_core::{AppError, EmbeddingIndex, OpenAiCompatibleProvider};

pub fn handle_search_command(args: SearchArgs, _quiet: bool) -> Result<()> {
    let (mut config, project_root) = load_config_for_command(&args.project_config, None)
        .context("Failed to load configuration for search command")?;

    if args.top_k == 0 {
        anyhow::bail!(AppError::InvalidArgument(
            "--top-k must be at least 1".to_string()
        ));
    }

    let index_path = match &args.index {
        Some(path) => path.clone(),
        None => config.embedding_index_path(&project_root),
    };
    let index = EmbeddingIndex::load(&index_path)
        .with_context(|| format!("Run 'codemerge embed' first; no index at {}", index_path.display()))?;

    // Query vectors must come from the model that built the index.
    config.embedding.model = index.model.clone();
    let provider = OpenAiCompatibleProvider::new(&config.embedding)?;
    let hits = index
        .query(&provider, &args.query, args.top_k)
        .context("Search failed")?;

    if args.format_output.format.is_none() {
        print_search_hits_pretty(&args.query, &hits);
        Ok(())
    } else {
        print_data_or_text(&hits, None, &args.format_output)
    }
}
