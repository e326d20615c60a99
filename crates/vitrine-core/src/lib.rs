//! All recommender logic independent of how it is served (CLI or an HTTP layer).
//!
//! The product catalog lives wherever the user keeps it. Vitrine stores only
//! config and the index cache in its own app data directory (see [app_data]).

pub mod analytics;
pub mod app_data;
pub mod config;
pub mod copywriter;
pub mod corpus;
pub mod datum;
pub mod embed;
pub mod images;
pub mod index;
pub mod ollama;
pub mod recommend;
pub mod sanitize;
pub mod store;

pub use app_data::{app_data_dir, default_index_dir};
pub use config::{load_config, save_config, set_data_path, Config, ConfigError, Settings};
pub use copywriter::{CopyWriter, TextGenerator};
pub use corpus::{parse_price, Corpus, CorpusError, Row};
pub use datum::Datum;
pub use embed::{EmbedError, Embedder};
pub use images::first_image_url;
pub use index::{Fingerprint, IndexError, VectorIndex};
pub use ollama::{OllamaClient, OllamaError};
pub use recommend::{Filters, RecommendError, Recommender, ResultRow, DEFAULT_TOP_K};
pub use sanitize::{sanitize, sanitize_row};
pub use store::{EmbeddingMatrix, FlatIpIndex, StoreError};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "vitrine-core ready"
}
