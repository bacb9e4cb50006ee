// Service exports
pub mod cache;
pub mod extractor;
pub mod images;
pub mod search;

pub use cache::CatalogCache;
pub use extractor::{ConstraintExtractor, ExtractionError, OpenAiExtractor, RuleBasedExtractor};
pub use images::{DogImageClient, ImageError};
pub use search::{InMemoryBackend, QueryRequest, SearchBackend, SearchError, UpstashClient};
