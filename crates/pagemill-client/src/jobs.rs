//! Server-side batch-job protocol for the scrape backend.
//!
//! One `extract_batch` call maps to one remote job: submit the full URL
//! list, poll the job until a terminal status, then map the results back
//! onto the input. Whenever the job cannot be brought to completion
//! (submission fails, the job fails, or the poll budget runs out), every
//! URL is extracted sequentially instead, so the caller always receives
//! exactly one record per input URL, in input order.

use pagemill_core::batch::{JobPoller, JobStatus, JobUpdate, PollOutcome};
use pagemill_core::error::AppError;
use pagemill_core::record::{ExtractionRecord, ExtractorKind};
use pagemill_core::traits::Extractor;
use serde::{Deserialize, Serialize};

use crate::scrape::ScrapeExtractor;
use crate::transport::classify_transport;

/// Drives one batch job for a [`ScrapeExtractor`]. Holds no state beyond
/// the borrowed extractor; job state lives server-side for the duration of
/// a single `run` call.
pub(crate) struct BatchJobClient<'a> {
    extractor: &'a ScrapeExtractor,
    poller: JobPoller,
}

impl<'a> BatchJobClient<'a> {
    pub(crate) fn new(extractor: &'a ScrapeExtractor) -> Self {
        Self {
            extractor,
            poller: JobPoller::default(),
        }
    }

    pub(crate) async fn run(&self, urls: &[String]) -> Vec<ExtractionRecord> {
        if urls.is_empty() {
            return Vec::new();
        }

        match self.submit(urls).await {
            Ok(job_id) => {
                tracing::info!(%job_id, count = urls.len(), "Batch job submitted");
                match self.poller.run(|| self.poll_once(&job_id)).await {
                    PollOutcome::Completed(items) => return align_results(urls, items),
                    PollOutcome::Failed(_) | PollOutcome::Exhausted => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Batch job submission failed");
            }
        }

        tracing::warn!(count = urls.len(), "Falling back to sequential extraction");
        self.sequential(urls).await
    }

    async fn submit(&self, urls: &[String]) -> Result<String, AppError> {
        let extractor = self.extractor;
        let endpoint = format!("{}/batch/scrape", extractor.base_url);

        let response = extractor
            .client
            .post(&endpoint)
            .bearer_auth(&extractor.api_key)
            .json(&BatchRequest {
                urls,
                formats: ["markdown", "html"],
            })
            .send()
            .await
            .map_err(|e| classify_transport(e, extractor.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} submitting batch job",
                status.as_u16()
            )));
        }

        let envelope: BatchEnvelope = response.json().await.map_err(|e| AppError::ApiError {
            message: format!("Invalid response body: {e}"),
        })?;

        if !envelope.success {
            let message = envelope
                .error
                .unwrap_or_else(|| "Batch submission rejected".to_string());
            return Err(AppError::ApiError { message });
        }

        envelope
            .data
            .map(|d| d.job_id)
            .ok_or_else(|| AppError::ApiError {
                message: "Batch submission response carried no job id".to_string(),
            })
    }

    async fn poll_once(&self, job_id: &str) -> Result<JobUpdate<Vec<JobResultItem>>, AppError> {
        let extractor = self.extractor;
        let endpoint = format!("{}/jobs/{}", extractor.base_url, job_id);

        let response = extractor
            .client
            .get(&endpoint)
            .bearer_auth(&extractor.api_key)
            .send()
            .await
            .map_err(|e| classify_transport(e, extractor.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} polling job {}",
                status.as_u16(),
                job_id
            )));
        }

        let envelope: StatusEnvelope = response.json().await.map_err(|e| AppError::ApiError {
            message: format!("Invalid response body: {e}"),
        })?;

        let data = envelope.data.unwrap_or_default();
        match JobStatus::parse_lenient(&data.status) {
            JobStatus::Completed => Ok(JobUpdate::Completed(data.results)),
            JobStatus::Failed => Ok(JobUpdate::Failed(
                data.error.unwrap_or_else(|| "Batch job failed".to_string()),
            )),
            JobStatus::Pending => Ok(JobUpdate::Pending),
        }
    }

    async fn sequential(&self, urls: &[String]) -> Vec<ExtractionRecord> {
        let mut records = Vec::with_capacity(urls.len());
        for url in urls {
            records.push(self.extractor.extract(url).await);
        }
        records
    }
}

/// Map completed job results onto the input URL list.
///
/// When the server returns one item per input, results are correlated by
/// position. Otherwise each input URL claims its first unconsumed match by
/// url, and inputs the server dropped become failure records. Either way
/// the output has exactly `urls.len()` records, in input order, each with
/// `meta.url` equal to the input URL.
fn align_results(urls: &[String], items: Vec<JobResultItem>) -> Vec<ExtractionRecord> {
    if items.len() == urls.len() {
        return urls
            .iter()
            .zip(items)
            .map(|(url, item)| item.into_record(url))
            .collect();
    }

    tracing::warn!(
        expected = urls.len(),
        received = items.len(),
        "Batch result count mismatch, correlating by url"
    );

    let mut remaining: Vec<Option<JobResultItem>> = items.into_iter().map(Some).collect();
    urls.iter()
        .map(|url| {
            let found = remaining
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|item| &item.url == url))
                .and_then(Option::take);
            match found {
                Some(item) => item.into_record(url),
                None => {
                    tracing::warn!(%url, "URL missing from batch job results");
                    ExtractionRecord::failure(url, "URL missing from batch job results")
                }
            }
        })
        .collect()
}

// ---- Batch API wire types ----

#[derive(Serialize)]
struct BatchRequest<'a> {
    urls: &'a [String],
    formats: [&'a str; 2],
}

#[derive(Deserialize)]
struct BatchEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<BatchData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct BatchData {
    #[serde(rename = "jobId")]
    job_id: String,
}

#[derive(Deserialize)]
struct StatusEnvelope {
    data: Option<JobData>,
}

#[derive(Deserialize, Default)]
struct JobData {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<JobResultItem>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct JobResultItem {
    #[serde(default)]
    url: String,
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    html: String,
    #[serde(default)]
    title: String,
}

impl JobResultItem {
    fn into_record(self, input_url: &str) -> ExtractionRecord {
        ExtractionRecord::success(
            input_url,
            self.markdown,
            self.html,
            self.title,
            ExtractorKind::Scrape,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, markdown: &str) -> JobResultItem {
        JobResultItem {
            url: url.to_string(),
            markdown: markdown.to_string(),
            html: String::new(),
            title: String::new(),
        }
    }

    fn urls(input: &[&str]) -> Vec<String> {
        input.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_align_full_result_set_by_position() {
        let input = urls(&["https://a.test", "https://b.test"]);
        let items = vec![item("https://a.test", "# A"), item("https://b.test", "# B")];

        let records = align_results(&input, items);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url(), "https://a.test");
        assert_eq!(records[0].markdown, "# A");
        assert_eq!(records[1].url(), "https://b.test");
        assert_eq!(records[1].markdown, "# B");
    }

    #[test]
    fn test_align_keeps_input_url_over_server_url() {
        // A server that normalizes URLs must not break result correlation.
        let input = urls(&["https://a.test"]);
        let items = vec![item("https://a.test/", "# A")];

        let records = align_results(&input, items);

        assert_eq!(records[0].url(), "https://a.test");
        assert_eq!(records[0].markdown, "# A");
    }

    #[test]
    fn test_align_partial_result_set_by_url() {
        let input = urls(&["https://a.test", "https://b.test", "https://c.test"]);
        let items = vec![item("https://c.test", "# C"), item("https://a.test", "# A")];

        let records = align_results(&input, items);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].markdown, "# A");
        assert!(records[1].is_failure());
        assert_eq!(records[1].url(), "https://b.test");
        assert_eq!(records[2].markdown, "# C");
    }

    #[test]
    fn test_align_duplicate_urls_consume_distinct_items() {
        let input = urls(&["https://a.test", "https://a.test"]);
        let items = vec![item("https://a.test", "# first")];

        let records = align_results(&input, items);

        assert_eq!(records.len(), 2);
        // One item for two identical inputs: positional path does not apply,
        // first input claims the item, second degrades to a failure record.
        assert_eq!(records[0].markdown, "# first");
        assert!(records[1].is_failure());
    }

    #[test]
    fn test_batch_envelope_parses_job_id() {
        let envelope: BatchEnvelope =
            serde_json::from_str(r#"{"success":true,"data":{"jobId":"job-42"}}"#).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap().job_id, "job-42");
    }

    #[test]
    fn test_status_envelope_parses_results() {
        let envelope: StatusEnvelope = serde_json::from_str(
            r##"{"data":{"status":"completed","results":[{"url":"https://a.test","markdown":"# A","html":"","title":"A"}]}}"##,
        )
        .unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.status, "completed");
        assert_eq!(data.results.len(), 1);
        assert_eq!(data.results[0].markdown, "# A");
    }

    #[test]
    fn test_status_envelope_tolerates_missing_results() {
        let envelope: StatusEnvelope =
            serde_json::from_str(r#"{"data":{"status":"pending"}}"#).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.status, "pending");
        assert!(data.results.is_empty());
    }
}
