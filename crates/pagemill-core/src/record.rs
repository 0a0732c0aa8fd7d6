use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of the remote extraction backend that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    Scrape,
    Reader,
}

impl ExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::Scrape => "scrape",
            ExtractorKind::Reader => "reader",
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scrape" => Ok(ExtractorKind::Scrape),
            "reader" => Ok(ExtractorKind::Reader),
            _ => Err(format!("Unknown extractor kind: {s}")),
        }
    }
}

/// Success/failure branch of a record's metadata.
///
/// Serialized untagged and flattened into [`RecordMeta`], so the persisted
/// metadata object stays flat: `{url, title, extractor}` on success,
/// `{url, error}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Success {
        title: String,
        extractor: ExtractorKind,
    },
    Failure {
        error: String,
    },
}

fn is_false(v: &bool) -> bool {
    !v
}

/// Metadata attached to every extraction record.
///
/// `url` is always present and equals the input URL that produced the
/// record, so batch results can be correlated by url as well as position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub url: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optimized: bool,
}

/// The unit flowing through the pipeline: extracted Markdown, optional raw
/// HTML, and per-URL metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub markdown: String,
    pub html: String,
    pub meta: RecordMeta,
}

impl ExtractionRecord {
    /// Build a successful record for `url`.
    pub fn success(
        url: impl Into<String>,
        markdown: impl Into<String>,
        html: impl Into<String>,
        title: impl Into<String>,
        extractor: ExtractorKind,
    ) -> Self {
        Self {
            markdown: markdown.into(),
            html: html.into(),
            meta: RecordMeta {
                url: url.into(),
                outcome: Outcome::Success {
                    title: title.into(),
                    extractor,
                },
                optimized: false,
            },
        }
    }

    /// Build a failure record for `url`: empty content, error in metadata.
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            markdown: String::new(),
            html: String::new(),
            meta: RecordMeta {
                url: url.into(),
                outcome: Outcome::Failure {
                    error: error.into(),
                },
                optimized: false,
            },
        }
    }

    pub fn url(&self) -> &str {
        &self.meta.url
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.meta.outcome, Outcome::Failure { .. })
    }

    /// True when there is Markdown content worth refining or printing.
    pub fn has_content(&self) -> bool {
        !self.markdown.is_empty()
    }

    /// Replace the Markdown with a refined version, marking the record as
    /// optimized. `html` and `url` are carried over unchanged.
    pub fn with_optimized_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = markdown.into();
        self.meta.optimized = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractor_kind_roundtrip() {
        for kind in [ExtractorKind::Scrape, ExtractorKind::Reader] {
            let s = kind.as_str();
            let parsed: ExtractorKind = s.parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("firehose".parse::<ExtractorKind>().is_err());
    }

    #[test]
    fn test_success_metadata_serializes_flat() {
        let record = ExtractionRecord::success(
            "https://a.test",
            "# X",
            "<h1>X</h1>",
            "T",
            ExtractorKind::Scrape,
        );
        let json = serde_json::to_value(&record.meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://a.test",
                "title": "T",
                "extractor": "scrape",
            })
        );
    }

    #[test]
    fn test_failure_metadata_serializes_flat() {
        let record = ExtractionRecord::failure("https://a.test", "connection refused");
        let json = serde_json::to_value(&record.meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://a.test",
                "error": "connection refused",
            })
        );
        assert!(record.markdown.is_empty());
        assert!(record.html.is_empty());
    }

    #[test]
    fn test_optimized_flag_appears_only_when_set() {
        let record = ExtractionRecord::success(
            "https://a.test",
            "# raw",
            "",
            "T",
            ExtractorKind::Reader,
        );
        let optimized = record.clone().with_optimized_markdown("# clean");

        let raw_json = serde_json::to_value(&record.meta).unwrap();
        assert!(raw_json.get("optimized").is_none());

        let opt_json = serde_json::to_value(&optimized.meta).unwrap();
        assert_eq!(opt_json["optimized"], serde_json::json!(true));
        assert_eq!(optimized.markdown, "# clean");
        assert_eq!(optimized.url(), "https://a.test");
    }

    #[test]
    fn test_with_optimized_markdown_keeps_html() {
        let record = ExtractionRecord::success(
            "https://a.test",
            "# raw",
            "<h1>raw</h1>",
            "T",
            ExtractorKind::Scrape,
        );
        let optimized = record.with_optimized_markdown("# clean");
        assert_eq!(optimized.html, "<h1>raw</h1>");
        assert!(optimized.meta.optimized);
    }
}
