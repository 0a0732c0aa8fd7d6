use std::fs;
use std::io;
use std::path::Path;

use pagemill_core::error::AppError;
use pagemill_core::record::ExtractionRecord;
use pagemill_core::traits::ResultSink;

/// Filesystem sink.
///
/// Each record becomes up to three correlated artifacts: the Markdown
/// body, the raw HTML (only when `save_html` is on and the backend
/// returned any), and the metadata object as pretty-printed JSON. Batch
/// artifacts are named `url_<n>.*` by 1-based input position, never
/// derived from the URL itself.
#[derive(Debug, Clone)]
pub struct FsSink {
    save_html: bool,
}

impl FsSink {
    pub fn new(save_html: bool) -> Self {
        Self { save_html }
    }

    fn write_artifacts(&self, record: &ExtractionRecord, md_path: &Path) -> Result<(), AppError> {
        fs::write(md_path, &record.markdown).map_err(|e| storage_err("write", md_path, &e))?;

        if self.save_html && !record.html.is_empty() {
            let html_path = md_path.with_extension("html");
            fs::write(&html_path, &record.html)
                .map_err(|e| storage_err("write", &html_path, &e))?;
            tracing::info!(path = %html_path.display(), "Saved raw HTML");
        }

        let json_path = md_path.with_extension("json");
        let meta = serde_json::to_string_pretty(&record.meta)?;
        fs::write(&json_path, meta).map_err(|e| storage_err("write", &json_path, &e))?;

        Ok(())
    }
}

fn storage_err(action: &str, path: &Path, e: &io::Error) -> AppError {
    AppError::StorageError(format!("Failed to {action} {}: {e}", path.display()))
}

impl ResultSink for FsSink {
    fn save_record(&self, record: &ExtractionRecord, output: &Path) -> Result<(), AppError> {
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| storage_err("create", parent, &e))?;
        }

        self.write_artifacts(record, output)?;
        tracing::info!(path = %output.display(), "Saved Markdown");
        Ok(())
    }

    fn save_batch(&self, records: &[ExtractionRecord], dir: &Path) -> Result<(), AppError> {
        fs::create_dir_all(dir).map_err(|e| storage_err("create", dir, &e))?;

        for (i, record) in records.iter().enumerate() {
            let md_path = dir.join(format!("url_{}.md", i + 1));
            self.write_artifacts(record, &md_path)?;
        }

        tracing::info!(dir = %dir.display(), count = records.len(), "Saved batch results");
        Ok(())
    }
}
