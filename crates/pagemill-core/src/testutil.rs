//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests. Mocks use
//! `Arc<Mutex<_>>` interior mutability so tests can assert on recorded
//! calls after the pipeline has consumed the mock.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::record::{ExtractionRecord, ExtractorKind};
use crate::traits::{Extractor, Refiner, ResultSink};

/// Build the success record [`MockExtractor`] produces for `url`.
pub fn mock_success_record(url: &str) -> ExtractionRecord {
    ExtractionRecord::success(
        url,
        format!("# Content from {url}"),
        format!("<h1>{url}</h1>"),
        "Mock Title",
        ExtractorKind::Scrape,
    )
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor with per-URL scripted outcomes and recorded calls.
#[derive(Clone)]
pub struct MockExtractor {
    fail_urls: Arc<HashSet<String>>,
    /// URLs passed to `extract`, in call order.
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    /// Every URL succeeds.
    pub fn succeeding() -> Self {
        Self {
            fail_urls: Arc::new(HashSet::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The listed URLs produce failure records; everything else succeeds.
    pub fn failing_for(urls: &[&str]) -> Self {
        Self {
            fail_urls: Arc::new(urls.iter().map(|u| u.to_string()).collect()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Extractor for MockExtractor {
    async fn extract(&self, url: &str) -> ExtractionRecord {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail_urls.contains(url) {
            ExtractionRecord::failure(url, "simulated extraction failure")
        } else {
            mock_success_record(url)
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

// ---------------------------------------------------------------------------
// MockRefiner
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum RefinerMode {
    Uppercase,
    Fail,
}

/// Mock refiner that either uppercases the Markdown (so refined output is
/// distinguishable from the input) or fails every call.
#[derive(Clone)]
pub struct MockRefiner {
    mode: RefinerMode,
    /// URLs of records offered to `refine`, in call order.
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockRefiner {
    pub fn uppercasing() -> Self {
        Self {
            mode: RefinerMode::Uppercase,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            mode: RefinerMode::Fail,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Refiner for MockRefiner {
    async fn refine(&self, record: &ExtractionRecord) -> Result<ExtractionRecord, AppError> {
        self.calls.lock().unwrap().push(record.url().to_string());
        match self.mode {
            RefinerMode::Uppercase => Ok(record
                .clone()
                .with_optimized_markdown(record.markdown.to_uppercase())),
            RefinerMode::Fail => Err(AppError::LlmError {
                message: "simulated LLM failure".into(),
                status_code: 500,
                retryable: true,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Mock sink recording every persistence request.
#[derive(Clone, Default)]
pub struct MockSink {
    fail: bool,
    pub saved_records: Arc<Mutex<Vec<(ExtractionRecord, PathBuf)>>>,
    pub saved_batches: Arc<Mutex<Vec<(Vec<ExtractionRecord>, PathBuf)>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl ResultSink for MockSink {
    fn save_record(&self, record: &ExtractionRecord, output: &Path) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::StorageError("simulated sink failure".into()));
        }
        self.saved_records
            .lock()
            .unwrap()
            .push((record.clone(), output.to_path_buf()));
        Ok(())
    }

    fn save_batch(&self, records: &[ExtractionRecord], dir: &Path) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::StorageError("simulated sink failure".into()));
        }
        self.saved_batches
            .lock()
            .unwrap()
            .push((records.to_vec(), dir.to_path_buf()));
        Ok(())
    }
}
