use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the project directory to merge (default: config, $PROJECT_ROOT, current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path of the TOML config file (default: .codemerge/codemerge.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Project Setup"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config",
        help_heading = "Project Setup"
    )]
    pub no_config: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Print structured output instead of pretty text.", value_name = "FORMAT", value_parser = ["json", "yaml"], help_heading = "Output Formatting")]
    pub format: Option<String>,
}

/// Command-line replacements for merge-related config keys.
#[derive(Args, Debug, Clone, Default)]
pub struct MergeOverrides {
    #[arg(
        short = 't',
        long = "target",
        value_name = "PATH",
        action = clap::ArgAction::Append,
        help = "Scan target file or directory; repeatable, replaces 'scanTargets'.",
        help_heading = "Merge Overrides"
    )]
    pub targets: Vec<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the merged document to FILE.",
        help_heading = "Merge Overrides"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Write the line manifest to FILE.",
        help_heading = "Merge Overrides"
    )]
    pub file_list: Option<PathBuf>,

    #[arg(
        long,
        help = "Do not follow imports of scanned files.",
        help_heading = "Merge Overrides"
    )]
    pub no_deps: bool,

    #[arg(
        long,
        value_name = "N",
        help = "Maximum import depth to follow (0 disables dependency scanning).",
        help_heading = "Merge Overrides"
    )]
    pub max_depth: Option<usize>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Merge a project's source files into one annotated document.",
    long_about = "codemerge indexes a project, follows JS/TS/Vue imports from the configured scan targets, \nstrips comments and styles on request, and writes a single document with per-file \nstart/end markers plus a line manifest. Merged documents can be embedded and searched.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  codemerge merge -t src/main.js --stats\n  codemerge plan -f json\n  codemerge embed && codemerge search \"router guards\" -k 3\n  codemerge watch",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "m",
        about = "Merge the scan targets and their imports into one document."
    )]
    Merge(MergeArgs),

    #[command(
        visible_alias = "p",
        about = "Show the effective configuration and the files a merge would include."
    )]
    Plan(PlanArgs),

    #[command(about = "Show line, size and token statistics for the files a merge would include.")]
    Stats(StatsArgs),

    #[command(about = "Build the JSON line-count tree from a manifest.")]
    Tree(TreeArgs),

    #[command(about = "Split the merged document into chunks and embed them.")]
    Embed(EmbedArgs),

    #[command(about = "Search the embedded chunks of the merged document.")]
    Search(SearchArgs),

    #[command(
        visible_alias = "w",
        about = "Merge, then merge again whenever project files change."
    )]
    Watch(WatchArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub overrides: MergeOverrides,

    #[arg(
        long,
        help = "Print line, size and token statistics after merging.",
        help_heading = "Output Control"
    )]
    pub stats: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub overrides: MergeOverrides,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub overrides: MergeOverrides,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub overrides: MergeOverrides,

    #[arg(
        long,
        value_name = "FILE",
        help = "Read an existing manifest instead of planning a fresh merge.",
        help_heading = "Input"
    )]
    pub manifest: Option<PathBuf>,

    #[arg(
        short = 's',
        long,
        value_name = "FILE",
        help = "Save the tree to FILE (default: 'sizeTreeOutputFile' or stdout).",
        help_heading = "Output Control"
    )]
    pub save: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EmbedArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        long,
        value_name = "FILE",
        help = "Merged document to embed (default: 'outputFile').",
        help_heading = "Input"
    )]
    pub document: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Where to save the embedding index (default: 'embedding.indexFile' or <outputFile>.embeddings.json).",
        help_heading = "Output Control"
    )]
    pub index: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Texts per embedding request.", help_heading = "Embedding")]
    pub batch_size: Option<usize>,

    #[arg(long, value_name = "MODEL", help = "Embedding model name.", help_heading = "Embedding")]
    pub model: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(required = true, help = "Natural-language or code query.")]
    pub query: String,

    #[arg(short = 'k', long, default_value_t = 5, help = "Number of hits to show.")]
    pub top_k: usize,

    #[arg(long, value_name = "FILE", help = "Embedding index to search.", help_heading = "Input")]
    pub index: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub overrides: MergeOverrides,

    #[arg(
        long,
        value_name = "DELAY_STRING",
        help = "Set debounce delay for watch mode [default: 300ms]"
    )]
    pub watch_delay: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        long,
        help = "Save the default config to .codemerge/codemerge.toml (prompts overwrite)."
    )]
    pub save: bool,
}
