pub mod factory;
mod jobs;
pub mod reader;
pub mod refine;
pub mod scrape;
mod transport;

pub use factory::AnyExtractor;
pub use reader::ReaderExtractor;
pub use refine::{OpenAiRefiner, refiner_for};
pub use scrape::ScrapeExtractor;
