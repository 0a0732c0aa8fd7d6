use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;
use url::Url;

use pagemill_client::{AnyExtractor, OpenAiRefiner, refiner_for};
use pagemill_core::config::{ExtractorConfig, LlmConfig};
use pagemill_core::pipeline::ConvertService;
use pagemill_core::record::{ExtractionRecord, ExtractorKind};

mod sink;

use sink::FsSink;

#[derive(Parser)]
#[command(name = "pagemill", version, about = "Convert web pages to cleaned Markdown")]
#[command(group = ArgGroup::new("input").required(true).args(["url", "urls_file"]))]
struct Cli {
    /// URL to convert
    #[arg(long)]
    url: Option<String>,

    /// Newline-delimited file of URLs to convert as a batch
    #[arg(long)]
    urls_file: Option<PathBuf>,

    /// Extraction backend ("scrape" or "reader")
    #[arg(long, default_value = "scrape")]
    extractor: ExtractorKind,

    /// Skip the LLM refinement pass
    #[arg(long, default_value_t = false)]
    no_optimize: bool,

    /// Output path for a single URL (metadata and HTML land alongside)
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Output directory for batch results
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also save the raw HTML next to the Markdown
    #[arg(long, env = "PAGEMILL_SAVE_HTML", default_value_t = false)]
    save_html: bool,

    /// Extraction API key (falls back to the backend's environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// LLM API key (falls back to PAGEMILL_LLM_API_KEY)
    #[arg(long)]
    llm_api_key: Option<String>,

    /// LLM model for the refinement pass
    #[arg(long, env = "PAGEMILL_LLM_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Request deadline in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Maximum attempts for transient failures
    #[arg(long, default_value_t = 3)]
    retry_count: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing; stdout is reserved for Markdown output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ExtractorConfig::default()
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_retry_count(cli.retry_count);

    let api_key = resolve_api_key(cli.api_key.clone(), cli.extractor)?;
    let extractor = AnyExtractor::new(cli.extractor, &api_key, &config)?;
    let refiner = build_refiner(&cli);

    let service = ConvertService::<_, OpenAiRefiner, FsSink>::new(extractor)
        .with_sink(FsSink::new(cli.save_html));
    let service = match refiner {
        Some(r) => service.with_refiner(r),
        None => service,
    };

    if let Some(url) = &cli.url {
        validate_url(url)?;
        let record = service.convert_url(url, cli.output_file.as_deref()).await?;
        if cli.output_file.is_none() {
            println!("{}", record.markdown);
        }
    } else if let Some(path) = &cli.urls_file {
        let urls = read_urls_file(path)?;
        let records = service
            .convert_batch(&urls, cli.output_dir.as_deref())
            .await?;
        if cli.output_dir.is_none() {
            print_batch(&records);
        }
    }

    Ok(())
}

fn api_key_env(kind: ExtractorKind) -> &'static str {
    match kind {
        ExtractorKind::Scrape => "PAGEMILL_SCRAPE_API_KEY",
        ExtractorKind::Reader => "PAGEMILL_READER_API_KEY",
    }
}

/// Explicit override wins; otherwise the backend's environment variable.
fn resolve_api_key(explicit: Option<String>, kind: ExtractorKind) -> Result<String> {
    match explicit {
        Some(key) => Ok(key),
        None => {
            let var = api_key_env(kind);
            std::env::var(var)
                .with_context(|| format!("{var} not set. Required for the {kind} backend."))
        }
    }
}

/// Build the refinement pass, or decide to run without it.
///
/// Missing LLM credentials or an unsupported provider disable refinement
/// with a warning; they never fail the conversion.
fn build_refiner(cli: &Cli) -> Option<OpenAiRefiner> {
    if cli.no_optimize {
        return None;
    }

    let api_key = cli
        .llm_api_key
        .clone()
        .or_else(|| std::env::var("PAGEMILL_LLM_API_KEY").ok());
    let Some(api_key) = api_key else {
        tracing::warn!("PAGEMILL_LLM_API_KEY not set, skipping Markdown refinement");
        return None;
    };

    let provider =
        std::env::var("PAGEMILL_LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
    let config = LlmConfig {
        provider,
        ..LlmConfig::default()
    }
    .with_model(cli.model.clone());

    match refiner_for(&config, &api_key) {
        Ok(refiner) => Some(refiner),
        Err(e) => {
            tracing::warn!(error = %e, "Refinement unavailable, continuing without it");
            None
        }
    }
}

fn validate_url(raw: &str) -> Result<()> {
    let parsed = Url::parse(raw).with_context(|| format!("Invalid URL: {raw}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => anyhow::bail!("URL scheme '{scheme}' is not supported (only http/https)"),
    }
}

fn read_urls_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URLs file: {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if urls.is_empty() {
        anyhow::bail!("No URLs found in {}", path.display());
    }
    for url in &urls {
        validate_url(url)?;
    }

    Ok(urls)
}

fn print_batch(records: &[ExtractionRecord]) {
    for (i, record) in records.iter().enumerate() {
        println!("\n--- Result {} ---", i + 1);
        println!("{}", record.markdown);
    }
}
