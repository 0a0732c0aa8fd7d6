use pagemill_core::config::ExtractorConfig;
use pagemill_core::error::AppError;
use pagemill_core::record::{ExtractionRecord, ExtractorKind};
use pagemill_core::traits::Extractor;

use crate::reader::ReaderExtractor;
use crate::scrape::ScrapeExtractor;

/// An extraction backend selected at runtime.
///
/// Dispatches the [`Extractor`] capability over the concrete backends so
/// callers can pick one from configuration without naming its type.
#[derive(Clone)]
pub enum AnyExtractor {
    Scrape(ScrapeExtractor),
    Reader(ReaderExtractor),
}

impl AnyExtractor {
    pub fn new(
        kind: ExtractorKind,
        api_key: &str,
        config: &ExtractorConfig,
    ) -> Result<Self, AppError> {
        match kind {
            ExtractorKind::Scrape => Ok(Self::Scrape(ScrapeExtractor::new(api_key, config)?)),
            ExtractorKind::Reader => Ok(Self::Reader(ReaderExtractor::new(api_key, config)?)),
        }
    }
}

impl Extractor for AnyExtractor {
    async fn extract(&self, url: &str) -> ExtractionRecord {
        match self {
            AnyExtractor::Scrape(e) => e.extract(url).await,
            AnyExtractor::Reader(e) => e.extract(url).await,
        }
    }

    async fn extract_batch(&self, urls: &[String]) -> Vec<ExtractionRecord> {
        match self {
            AnyExtractor::Scrape(e) => e.extract_batch(urls).await,
            AnyExtractor::Reader(e) => e.extract_batch(urls).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructs_both_backends() {
        let config = ExtractorConfig::default();
        assert!(matches!(
            AnyExtractor::new(ExtractorKind::Scrape, "key", &config),
            Ok(AnyExtractor::Scrape(_))
        ));
        assert!(matches!(
            AnyExtractor::new(ExtractorKind::Reader, "key", &config),
            Ok(AnyExtractor::Reader(_))
        ));
    }
}
