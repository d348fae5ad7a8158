use article_pager::services::prober::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use article_pager::types::DEFAULT_MAX_TOKENS;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "article-pager")]
#[command(about = "A CLI tool for feeding long articles to chat models one page-sized conversation at a time")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Credential store file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub credentials: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split an article into conversations
    Split(SplitArgs),

    /// Show article statistics and page counts for several budgets
    Analyze(AnalyzeArgs),

    /// Validate input sources
    Validate(ValidateArgs),

    /// Manage the stored API key
    #[command(subcommand)]
    Key(KeyCommand),
}

#[derive(Args)]
pub struct SplitArgs {
    /// Article source (file path, URL, or - for stdin)
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Task prompt sent before the first page and after the last
    #[arg(short, long, default_value = "")]
    pub prompt: String,

    /// Maximum estimated tokens per page
    #[arg(short = 't', long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: usize,

    /// Print only this page's raw text (for piping to a clipboard tool)
    #[arg(long, value_name = "NUMBER")]
    pub page: Option<usize>,

    /// Skip anomaly detection even if an API key is available
    #[arg(long)]
    pub no_probe: bool,

    /// Print pages and anomaly results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub probe: ProbeArgs,
}

#[derive(Args)]
pub struct ProbeArgs {
    /// OpenAI API key; saved to the credential store for later runs
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Chat completion endpoint used for anomaly detection
    #[arg(long, env = "ARTICLE_PAGER_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Model used for anomaly detection
    #[arg(long, env = "ARTICLE_PAGER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60")]
    pub timeout_secs: u64,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Article source (file path, URL, or - for stdin)
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Task prompt, counted toward the first page
    #[arg(short, long, default_value = "")]
    pub prompt: String,

    /// Budget used for the detailed page listing
    #[arg(short = 't', long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: usize,

    /// Show per-page information
    #[arg(long)]
    pub detailed: bool,

    /// Print the analysis as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input sources (file paths, URLs, or -)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Check if sources are accessible
    #[arg(long)]
    pub check_access: bool,
}

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Store an API key
    Set {
        #[arg(value_name = "KEY")]
        value: String,
    },

    /// Show the stored API key (masked)
    Show,

    /// Remove the stored API key
    Clear,
}
