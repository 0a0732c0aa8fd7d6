use std::path::Path;

use crate::error::AppError;
use crate::record::ExtractionRecord;
use crate::traits::{Extractor, Refiner, ResultSink};

/// Offer a record to the refiner, keeping the original when refinement is
/// impossible or fails.
///
/// Records without Markdown are a logged no-op; the LLM is never called
/// for a failed extraction. A refinement error is logged and the original
/// record is returned untouched; optimization must never destroy content
/// that extraction already produced.
pub async fn optimize_record<R: Refiner>(refiner: &R, record: ExtractionRecord) -> ExtractionRecord {
    if !record.has_content() {
        tracing::debug!(url = %record.url(), "No markdown to optimize, skipping");
        return record;
    }

    match refiner.refine(&record).await {
        Ok(refined) => {
            tracing::info!(url = %record.url(), "Markdown refinement complete");
            refined
        }
        Err(e) => {
            tracing::warn!(
                url = %record.url(),
                error = %e,
                "Markdown refinement failed, keeping original"
            );
            record
        }
    }
}

/// Orchestrates the conversion pipeline: extract → optional LLM refinement
/// → optional persistence.
///
/// Generic over all external dependencies via traits, enabling dependency
/// injection and testability without real HTTP or LLM calls. Each service
/// instance is built for a single `convert_*` call; nothing is shared
/// across invocations.
pub struct ConvertService<E, R, S>
where
    E: Extractor,
    R: Refiner,
    S: ResultSink,
{
    extractor: E,
    refiner: Option<R>,
    sink: Option<S>,
}

impl<E, R, S> ConvertService<E, R, S>
where
    E: Extractor,
    R: Refiner,
    S: ResultSink,
{
    /// Create a service that extracts only: no refinement, no persistence.
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            refiner: None,
            sink: None,
        }
    }

    /// Enable the LLM refinement pass.
    pub fn with_refiner(mut self, refiner: R) -> Self {
        self.refiner = Some(refiner);
        self
    }

    /// Enable persistence through the given sink.
    pub fn with_sink(mut self, sink: S) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Convert a single URL.
    ///
    /// The returned record always carries `meta.url == url`; extraction and
    /// refinement failures are represented inside the record, and only sink
    /// I/O failures surface as `Err`.
    pub async fn convert_url(
        &self,
        url: &str,
        output: Option<&Path>,
    ) -> Result<ExtractionRecord, AppError> {
        tracing::info!(%url, "Converting URL");

        let record = self.extractor.extract(url).await;
        let record = self.maybe_refine(record).await;

        if let (Some(sink), Some(output)) = (&self.sink, output) {
            sink.save_record(&record, output)?;
            tracing::info!(output = %output.display(), "Saved conversion result");
        }

        Ok(record)
    }

    /// Convert a batch of URLs.
    ///
    /// Returns exactly `urls.len()` records in input order. Each record is
    /// independently offered to the refiner, sequentially; a record without
    /// Markdown skips refinement but keeps its position.
    pub async fn convert_batch(
        &self,
        urls: &[String],
        output_dir: Option<&Path>,
    ) -> Result<Vec<ExtractionRecord>, AppError> {
        tracing::info!(count = urls.len(), "Converting URL batch");

        let extracted = self.extractor.extract_batch(urls).await;

        let total = extracted.len();
        let mut records = Vec::with_capacity(total);
        for (i, record) in extracted.into_iter().enumerate() {
            let record = self.maybe_refine(record).await;
            tracing::debug!(url = %record.url(), position = i + 1, total, "Record processed");
            records.push(record);
        }

        if let (Some(sink), Some(dir)) = (&self.sink, output_dir) {
            sink.save_batch(&records, dir)?;
            tracing::info!(dir = %dir.display(), count = records.len(), "Saved batch results");
        }

        Ok(records)
    }

    async fn maybe_refine(&self, record: ExtractionRecord) -> ExtractionRecord {
        match &self.refiner {
            Some(refiner) => optimize_record(refiner, record).await,
            None => record,
        }
    }
}
