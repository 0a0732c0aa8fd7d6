use std::time::Duration;

use pagemill_core::config::ExtractorConfig;
use pagemill_core::error::AppError;
use pagemill_core::record::{ExtractionRecord, ExtractorKind};
use pagemill_core::retry::RetryPolicy;
use pagemill_core::traits::Extractor;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::jobs::BatchJobClient;
use crate::transport::classify_transport;

const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev/v1";
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Scrape-style extraction backend.
///
/// Posts each URL to a remote scrape endpoint that returns both Markdown
/// and raw HTML, with bearer-token auth. Transient transport failures are
/// retried with a fixed backoff; when the attempt budget is spent, the URL
/// degrades to a failure record instead of an error. Batch extraction goes
/// through the server-side job protocol in [`crate::jobs`], falling back
/// to sequential extraction when the job cannot be brought to completion.
#[derive(Clone)]
pub struct ScrapeExtractor {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) timeout_secs: u64,
    retry: RetryPolicy,
}

impl ScrapeExtractor {
    pub fn new(api_key: &str, config: &ExtractorConfig) -> Result<Self, AppError> {
        Self::with_base_url(api_key, config, DEFAULT_BASE_URL)
    }

    /// Point the extractor at a self-hosted or test deployment.
    pub fn with_base_url(
        api_key: &str,
        config: &ExtractorConfig,
        base_url: &str,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout_secs: config.timeout.as_secs(),
            retry: RetryPolicy::new(config.retry_count, RETRY_BACKOFF),
        })
    }

    async fn extract_once(&self, url: &str) -> Result<ExtractionRecord, AppError> {
        let endpoint = format!("{}/scrape", self.base_url);

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&ScrapeRequest {
                url,
                formats: FORMATS,
            })
            .send()
            .await
            .map_err(|e| classify_transport(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let envelope: ScrapeEnvelope = response.json().await.map_err(|e| AppError::ApiError {
            message: format!("Invalid response body: {e}"),
        })?;

        if !envelope.success {
            let message = envelope
                .error
                .unwrap_or_else(|| "Unknown backend error".to_string());
            return Err(AppError::ApiError { message });
        }

        let data = envelope.data.unwrap_or_default();
        Ok(ExtractionRecord::success(
            url,
            data.markdown,
            data.html,
            data.title,
            ExtractorKind::Scrape,
        ))
    }
}

impl Extractor for ScrapeExtractor {
    async fn extract(&self, url: &str) -> ExtractionRecord {
        match self.retry.run(|_| self.extract_once(url)).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(%url, error = %e, "Scrape extraction failed");
                ExtractionRecord::failure(url, e.to_string())
            }
        }
    }

    async fn extract_batch(&self, urls: &[String]) -> Vec<ExtractionRecord> {
        BatchJobClient::new(self).run(urls).await
    }
}

// ---- Scrape API wire types ----

const FORMATS: [&str; 2] = ["markdown", "html"];

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'a str; 2],
}

#[derive(Deserialize)]
struct ScrapeEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize, Default)]
struct ScrapeData {
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    html: String,
    #[serde(default)]
    title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_both_formats() {
        let request = ScrapeRequest {
            url: "https://a.test",
            formats: FORMATS,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://a.test",
                "formats": ["markdown", "html"],
            })
        );
    }

    #[test]
    fn test_success_envelope_parses() {
        let envelope: ScrapeEnvelope = serde_json::from_str(
            r##"{"success":true,"data":{"markdown":"# X","html":"<h1>X</h1>","title":"T"}}"##,
        )
        .unwrap();
        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data.markdown, "# X");
        assert_eq!(data.html, "<h1>X</h1>");
        assert_eq!(data.title, "T");
    }

    #[test]
    fn test_failure_envelope_parses() {
        let envelope: ScrapeEnvelope =
            serde_json::from_str(r#"{"success":false,"error":"Page unreachable"}"#).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("Page unreachable"));
    }

    #[test]
    fn test_missing_data_fields_default_to_empty() {
        let envelope: ScrapeEnvelope =
            serde_json::from_str(r##"{"success":true,"data":{"markdown":"# X"}}"##).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.markdown, "# X");
        assert!(data.html.is_empty());
        assert!(data.title.is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let extractor = ScrapeExtractor::with_base_url(
            "key",
            &ExtractorConfig::default(),
            "https://scrape.example/v1/",
        )
        .unwrap();
        assert_eq!(extractor.base_url, "https://scrape.example/v1");
    }
}
