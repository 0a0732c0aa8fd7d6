/// Smoke-test for `ScrapeExtractor`.
///
/// Extracts <https://example.com> through the real scrape API and prints
/// the resulting Markdown. Needs a valid key:
///
///   PAGEMILL_SCRAPE_API_KEY=fc-... cargo run --example convert_smoke
use pagemill_client::ScrapeExtractor;
use pagemill_core::config::ExtractorConfig;
use pagemill_core::traits::Extractor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let api_key = std::env::var("PAGEMILL_SCRAPE_API_KEY")
        .map_err(|_| anyhow::anyhow!("PAGEMILL_SCRAPE_API_KEY not set"))?;

    let extractor = ScrapeExtractor::new(&api_key, &ExtractorConfig::default())?;

    let url = "https://example.com";
    println!("Extracting {url} …");
    let record = extractor.extract(url).await;

    assert!(!record.is_failure(), "Extraction failed: {:?}", record.meta);
    assert!(
        record.markdown.contains("Example Domain"),
        "Expected page title not found in Markdown"
    );

    println!("OK — got {} bytes of Markdown", record.markdown.len());
    println!(
        "First 300 chars:\n{}",
        &record.markdown[..record.markdown.len().min(300)]
    );
    Ok(())
}
