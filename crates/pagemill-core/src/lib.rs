pub mod batch;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod retry;
pub mod testutil;
pub mod traits;

pub use config::{ExtractorConfig, LlmConfig};
pub use error::AppError;
pub use record::{ExtractionRecord, ExtractorKind};
pub use traits::{Extractor, Refiner, ResultSink};
