use std::future::Future;
use std::path::Path;

use crate::error::AppError;
use crate::record::ExtractionRecord;

/// Converts a URL into extracted Markdown/HTML/metadata via a remote
/// service.
///
/// Extraction never fails at the call boundary: unrecoverable errors are
/// degraded into failure records carrying the cause in their metadata, so
/// one bad URL can never abort a batch.
pub trait Extractor: Send + Sync + Clone {
    /// Extract a single URL.
    fn extract(&self, url: &str) -> impl Future<Output = ExtractionRecord> + Send;

    /// Extract many URLs. Implementations must return exactly
    /// `urls.len()` records in input order; callers correlate results by
    /// position or by `meta.url`.
    fn extract_batch(&self, urls: &[String]) -> impl Future<Output = Vec<ExtractionRecord>> + Send;

    /// Run `extract` on a spawned task so the caller keeps making progress
    /// while the extraction completes. Produces the same record `extract`
    /// would.
    fn extract_spawned(&self, url: &str) -> tokio::task::JoinHandle<ExtractionRecord>
    where
        Self: Sized + 'static,
    {
        let extractor = self.clone();
        let url = url.to_string();
        tokio::spawn(async move { extractor.extract(&url).await })
    }
}

/// Asks a language model to clean up previously extracted Markdown.
///
/// `refine` returns a *new* record with the Markdown replaced and the
/// `optimized` flag set; callers decide what a failure means (the pipeline
/// keeps the original record).
pub trait Refiner: Send + Sync + Clone {
    fn refine(
        &self,
        record: &ExtractionRecord,
    ) -> impl Future<Output = Result<ExtractionRecord, AppError>> + Send;
}

/// Persists finished records as correlated artifacts.
pub trait ResultSink: Send + Sync + Clone {
    /// Persist one record under the given output path.
    fn save_record(&self, record: &ExtractionRecord, output: &Path) -> Result<(), AppError>;

    /// Persist a batch into a directory, one artifact set per record,
    /// named by 1-based input position.
    fn save_batch(&self, records: &[ExtractionRecord], dir: &Path) -> Result<(), AppError>;
}

/// A no-op ResultSink for use when persistence is not needed.
#[derive(Debug, Clone)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn save_record(&self, _record: &ExtractionRecord, _output: &Path) -> Result<(), AppError> {
        Ok(())
    }

    fn save_batch(&self, _records: &[ExtractionRecord], _dir: &Path) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockExtractor;

    #[tokio::test]
    async fn test_extract_spawned_matches_extract() {
        let extractor = MockExtractor::succeeding();

        let direct = extractor.extract("https://example.com").await;
        let spawned = extractor
            .extract_spawned("https://example.com")
            .await
            .unwrap();

        assert_eq!(direct, spawned);
    }

    #[tokio::test]
    async fn test_extract_spawned_does_not_block_caller() {
        let extractor = MockExtractor::succeeding();

        let handle = extractor.extract_spawned("https://example.com");
        // The caller's task is still free to do work before awaiting.
        let side_work = 2 + 2;
        assert_eq!(side_work, 4);

        let record = handle.await.unwrap();
        assert_eq!(record.url(), "https://example.com");
    }
}
