use std::time::Duration;

use pagemill_core::config::ExtractorConfig;
use pagemill_core::error::AppError;
use pagemill_core::record::{ExtractionRecord, ExtractorKind};
use pagemill_core::retry::RetryPolicy;
use pagemill_core::traits::Extractor;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::transport::classify_transport;

const DEFAULT_BASE_URL: &str = "https://api.jina.ai/v1";
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Reader-style extraction backend.
///
/// Issues a single-field request per URL and treats any 2xx response with
/// a parseable body as a success. The service has no batch API, so batch
/// extraction is a sequential loop over `extract`: one HTTP round trip at
/// a time, no job submission.
#[derive(Clone)]
pub struct ReaderExtractor {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl ReaderExtractor {
    pub fn new(api_key: &str, config: &ExtractorConfig) -> Result<Self, AppError> {
        Self::with_base_url(api_key, config, DEFAULT_BASE_URL)
    }

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
        let endpoint = format!("{}/reader", self.base_url);

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&ReaderRequest {
                url,
                format: "markdown",
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

        let body: ReaderResponse = response.json().await.map_err(|e| AppError::ApiError {
            message: format!("Invalid response body: {e}"),
        })?;

        Ok(ExtractionRecord::success(
            url,
            body.content,
            body.html,
            body.title,
            ExtractorKind::Reader,
        ))
    }
}

impl Extractor for ReaderExtractor {
    async fn extract(&self, url: &str) -> ExtractionRecord {
        match self.retry.run(|_| self.extract_once(url)).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(%url, error = %e, "Reader extraction failed");
                ExtractionRecord::failure(url, e.to_string())
            }
        }
    }

    async fn extract_batch(&self, urls: &[String]) -> Vec<ExtractionRecord> {
        let mut records = Vec::with_capacity(urls.len());
        for url in urls {
            records.push(self.extract(url).await);
        }
        records
    }
}

// ---- Reader API wire types ----

#[derive(Serialize)]
struct ReaderRequest<'a> {
    url: &'a str,
    format: &'a str,
}

// TODO: validate these field names against the provider's published API
// contract; they reflect observed responses, not documentation.
#[derive(Deserialize, Default)]
struct ReaderResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    html: String,
    #[serde(default)]
    title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_single_format() {
        let request = ReaderRequest {
            url: "https://a.test",
            format: "markdown",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://a.test",
                "format": "markdown",
            })
        );
    }

    #[test]
    fn test_response_parses_all_fields() {
        let body: ReaderResponse = serde_json::from_str(
            r##"{"content":"# X","html":"<h1>X</h1>","title":"T"}"##,
        )
        .unwrap();
        assert_eq!(body.content, "# X");
        assert_eq!(body.html, "<h1>X</h1>");
        assert_eq!(body.title, "T");
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let body: ReaderResponse = serde_json::from_str(r##"{"content":"# X"}"##).unwrap();
        assert_eq!(body.content, "# X");
        assert!(body.html.is_empty());
        assert!(body.title.is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let extractor = ReaderExtractor::with_base_url(
            "key",
            &ExtractorConfig::default(),
            "https://reader.example/v1/",
        )
        .unwrap();
        assert_eq!(extractor.base_url, "https://reader.example/v1");
    }
}
