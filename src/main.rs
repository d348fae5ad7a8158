mod cli;

use anyhow::Context;
use article_pager::services::credentials::mask_token;
use article_pager::services::fetcher::STDIN_SOURCE;
use article_pager::{
    AnomalyDetector, AnomalyProber, ArticlePaginator, ContentFetcher, ConversionSession,
    Credentials, FileCredentialStore, PagerError, ProberConfig, Result,
};
use clap::Parser;
use cli::{AnalyzeArgs, Cli, Commands, KeyCommand, ProbeArgs, SplitArgs, ValidateArgs};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

const ANALYSIS_BUDGETS: [usize; 5] = [1000, 4000, 8000, 16000, 40000];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so stdout only carries pages
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let credentials_path = cli.credentials.as_deref();
    let result = match &cli.command {
        Commands::Split(args) => handle_split_command(args, credentials_path).await,
        Commands::Analyze(args) => handle_analyze_command(args).await,
        Commands::Validate(args) => handle_validate_command(args).await,
        Commands::Key(command) => handle_key_command(command, credentials_path),
    };

    if let Err(e) = result {
        error!("Operation failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn open_credentials(path: Option<&Path>) -> Result<Credentials<FileCredentialStore>> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => FileCredentialStore::default_path()?,
    };
    Credentials::load(FileCredentialStore::new(path))
}

/// Flag (persisted) beats `OPENAI_API_KEY`, which beats the stored key.
///
/// Only saving an explicit `--api-key` is fatal. An unreadable store or a
/// bad prober config just skips anomaly detection.
fn build_detector(
    probe: &ProbeArgs,
    credentials_path: Option<&Path>,
) -> Result<Option<Arc<dyn AnomalyDetector>>> {
    let api_key = match &probe.api_key {
        Some(key) => {
            open_credentials(credentials_path)?.set_api_key(key)?;
            Some(key.clone())
        }
        None => std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| stored_api_key(credentials_path)),
    };

    let Some(api_key) = api_key.filter(|key| !key.is_empty()) else {
        info!("No API key configured, skipping anomaly detection");
        return Ok(None);
    };

    let mut config = ProberConfig::new(api_key);
    config.endpoint = probe.endpoint.clone();
    config.model = probe.model.clone();
    config.timeout = Duration::from_secs(probe.timeout_secs);

    match AnomalyProber::new(config) {
        Ok(prober) => {
            let prober: Arc<dyn AnomalyDetector> = Arc::new(prober);
            Ok(Some(prober))
        }
        Err(e) => {
            warn!("Anomaly detection disabled: {}", e);
            Ok(None)
        }
    }
}

fn stored_api_key(credentials_path: Option<&Path>) -> Option<String> {
    match open_credentials(credentials_path) {
        Ok(credentials) => credentials.api_key().map(str::to_string),
        Err(e) => {
            warn!("Ignoring unreadable credential store: {}", e);
            None
        }
    }
}

async fn handle_split_command(args: &SplitArgs, credentials_path: Option<&Path>) -> Result<()> {
    let (article, metadata) = ContentFetcher::fetch_content(&args.source).await?;
    info!(
        "Loaded '{}' ({} characters)",
        metadata.filename, metadata.total_chars
    );

    let detector = if args.no_probe || args.page.is_some() {
        None
    } else {
        build_detector(&args.probe, credentials_path)?
    };

    let mut session = ConversionSession::new(detector);
    session.convert(&article, &args.prompt, args.max_tokens)?;

    if let Some(number) = args.page {
        print!("{}", session.page_text(number)?);
        return Ok(());
    }

    session.collect_anomalies().await;
    let pages = session.pages();
    let anomalies = session.anomalies();
    let flagged = anomalies.iter().filter(|a| a.is_anomalous()).count();

    if args.json {
        let output = serde_json::json!({
            "article": metadata,
            "max_tokens": args.max_tokens,
            "pages": pages.iter().zip(anomalies).map(|(page, anomaly)| {
                serde_json::json!({
                    "number": page.number,
                    "estimated_tokens": page.estimated_tokens,
                    "sentence_count": page.sentence_count,
                    "content": page.content,
                    "anomaly": anomaly.description,
                })
            }).collect::<Vec<_>>()
        });
        let json_content = serde_json::to_string_pretty(&output)
            .context("Failed to serialize pages")?;
        println!("{}", json_content);
    } else {
        for (page, anomaly) in pages.iter().zip(anomalies) {
            println!("=== Conversation {} ===", page.number);
            println!("{}", page.content);
            if anomaly.is_anomalous() {
                println!(
                    "Warning: Anomalies detected in the text. ({})",
                    anomaly.description
                );
            }
            println!();
        }
    }

    info!(
        "Created {} conversations, {} flagged with anomalies",
        pages.len(),
        flagged
    );
    Ok(())
}

async fn handle_analyze_command(args: &AnalyzeArgs) -> Result<()> {
    let (article, metadata) = ContentFetcher::fetch_content(&args.source).await?;
    let paginator = ArticlePaginator::new(args.max_tokens)?;
    let pages = paginator.paginate(&article, &args.prompt);
    let summary = paginator.summarize(&article, &pages);

    let mut scenarios = Vec::new();
    for budget in ANALYSIS_BUDGETS {
        let candidate = ArticlePaginator::new(budget)?;
        let candidate_pages = candidate.paginate(&article, &args.prompt);
        scenarios.push(candidate.summarize(&article, &candidate_pages));
    }

    if args.json {
        let page_details = if args.detailed {
            serde_json::to_value(&pages).context("Failed to serialize pages")?
        } else {
            serde_json::Value::Null
        };
        let output = serde_json::json!({
            "article": metadata,
            "summary": summary,
            "pages": page_details,
            "scenarios": scenarios,
        });
        let json_content = serde_json::to_string_pretty(&output)
            .context("Failed to serialize analysis results")?;
        println!("{}", json_content);
        return Ok(());
    }

    println!("\n=== Analysis for '{}' ===", metadata.filename);
    println!("Source type: {:?}", metadata.source_type);
    println!("Total characters: {}", metadata.total_chars);
    println!("Estimated tokens: {}", summary.article_tokens);
    println!("Sentences: {}", summary.sentence_count);
    println!(
        "Pages at {} tokens: {}",
        summary.max_tokens, summary.total_pages
    );

    if !summary.oversized_pages.is_empty() {
        println!(
            "Pages over budget (single sentence too long): {:?}",
            summary.oversized_pages
        );
    }

    if args.detailed {
        println!("\nPage Details:");
        for page in &pages {
            println!(
                "  Page {}: {} sentences, ~{} tokens",
                page.number, page.sentence_count, page.estimated_tokens
            );
        }
    }

    println!("\nPotential Budgets:");
    for scenario in &scenarios {
        println!(
            "  {} tokens: {} pages (largest ~{} tokens)",
            scenario.max_tokens, scenario.total_pages, scenario.largest_page_tokens
        );
    }

    Ok(())
}

async fn handle_validate_command(args: &ValidateArgs) -> Result<()> {
    info!("Validating {} sources", args.sources.len());

    let mut valid_sources = Vec::new();
    let mut invalid_sources = Vec::new();

    for source in &args.sources {
        match ContentFetcher::validate_sources(&[source.clone()]) {
            Ok(_) => {
                info!("✓ Valid: {}", source);
                valid_sources.push(source);

                if args.check_access && source != STDIN_SOURCE {
                    match ContentFetcher::fetch_content(source).await {
                        Ok((content, _)) => {
                            let sentences = content.split(". ").count();
                            info!("  Accessible, ~{} sentences found", sentences);
                        }
                        Err(e) => {
                            error!("  Cannot access content: {}", e);
                            invalid_sources.push((source, format!("Access error: {}", e)));
                        }
                    }
                }
            }
            Err(e) => {
                error!("✗ Invalid: {} - {}", source, e);
                invalid_sources.push((source, e.to_string()));
            }
        }
    }

    println!("\n=== Validation Summary ===");
    println!("Valid sources: {}/{}", valid_sources.len(), args.sources.len());

    if !invalid_sources.is_empty() {
        println!("Invalid sources:");
        let invalid_count = invalid_sources.len();
        for (source, error) in invalid_sources {
            println!("  - {}: {}", source, error);
        }
        return Err(PagerError::Anyhow(anyhow::anyhow!(
            "{} sources failed validation",
            invalid_count
        )));
    }

    println!("All sources are valid!");
    Ok(())
}

fn handle_key_command(command: &KeyCommand, credentials_path: Option<&Path>) -> Result<()> {
    let mut credentials = open_credentials(credentials_path)?;

    match command {
        KeyCommand::Set { value } => {
            credentials.set_api_key(value)?;
            info!("Stored API key {}", mask_token(value));
        }
        KeyCommand::Show => match credentials.api_key() {
            Some(key) => println!("{}", mask_token(key)),
            None => println!("No API key stored"),
        },
        KeyCommand::Clear => {
            credentials.set_api_key("")?;
            info!("API key removed");
        }
    }

    Ok(())
}
