//! The recommender: prompt → embedding → over-fetched neighbors → keyword
//! filters → top-K enriched rows. Also item lookup and catalog analytics.
//!
//! Everything is read-only after [`Recommender::open`], so a recommender can be
//! shared across concurrent callers without locking.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::analytics;
use crate::config::Settings;
use crate::copywriter::{CopyWriter, TextGenerator};
use crate::corpus::{Corpus, CorpusError, Row, IMAGES_FIELD};
use crate::datum::Datum;
use crate::embed::{EmbedError, Embedder};
use crate::images::first_image_url;
use crate::index::{IndexError, VectorIndex};
use crate::ollama::{OllamaClient, OllamaError};
use crate::sanitize::sanitize_row;
use crate::store::normalize;

pub const DEFAULT_TOP_K: usize = 6;
/// Candidates fetched per requested result, so that keyword filtering still
/// leaves enough rows.
pub const OVERFETCH: usize = 3;

/// A catalog row plus `gen_description`, `score` (search only) and a single
/// resolved `images` URL. Field order follows the catalog's columns.
pub type ResultRow = Map<String, Value>;

/// Field name → substring that field must contain (case-insensitive).
pub type Filters = HashMap<String, String>;

pub struct Recommender<E> {
    corpus: Corpus,
    index: VectorIndex,
    embedder: E,
    writer: Box<dyn TextGenerator>,
}

impl Recommender<OllamaClient> {
    /// Load the catalog and the index (built and cached on first run) using
    /// an Ollama embedder.
    pub async fn open(settings: &Settings) -> Result<Self, RecommendError> {
        let client = OllamaClient::from_url(&settings.ollama_url)?.with_embed_model(settings.embedding_model.clone());
        Self::open_with(settings, client).await
    }
}

impl<E: Embedder> Recommender<E> {
    /// Like [`Recommender::open`] with any embedder.
    pub async fn open_with(settings: &Settings, embedder: E) -> Result<Self, RecommendError> {
        let corpus = Corpus::load(&settings.data_path)?;
        let index = VectorIndex::ensure(&settings.index_dir, &corpus, &embedder).await?;
        Ok(Self::from_parts(corpus, index, embedder, Box::new(CopyWriter::new())))
    }

    /// Assemble a recommender from an already-built catalog and index.
    pub fn from_parts(corpus: Corpus, index: VectorIndex, embedder: E, writer: Box<dyn TextGenerator>) -> Self {
        Self {
            corpus,
            index,
            embedder,
            writer,
        }
    }

    /// Swap the blurb generator (e.g. a seeded [`CopyWriter`] or a hosted model).
    pub fn with_writer(mut self, writer: impl TextGenerator + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Up to `top_k` catalog rows most similar to `prompt` that pass every
    /// filter, best first. Fewer rows come back when filters reject most of
    /// the `top_k * OVERFETCH` candidates.
    pub async fn recommend(&self, prompt: &str, top_k: usize, filters: &Filters) -> Result<Vec<ResultRow>, RecommendError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let query = self
            .embedder
            .encode(&[prompt.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbedError::Count { expected: 1, found: 0 })?;
        let candidates = self.index.search(&normalize(&query), top_k.saturating_mul(OVERFETCH))?;
        debug!(candidates = candidates.len(), top_k, filters = filters.len(), "searched index");

        let mut results = Vec::with_capacity(top_k);
        for (pos, score) in candidates {
            let Some(row) = self.corpus.row(pos) else {
                continue;
            };
            if !passes_filters(&row, filters) {
                continue;
            }
            results.push(self.enrich(&row, Some(score)));
            if results.len() >= top_k {
                break;
            }
        }
        Ok(results)
    }

    /// The row whose `uniq_id` is exactly `uniq_id`, enriched like a search
    /// result but without a score. Empty when there is no such row.
    pub fn item(&self, uniq_id: &str) -> ResultRow {
        self.corpus
            .position_of(uniq_id)
            .and_then(|i| self.corpus.row(i))
            .map(|row| self.enrich(&row, None))
            .unwrap_or_default()
    }

    /// Catalog statistics; see [`analytics::analytics`].
    pub fn analytics(&self) -> Value {
        analytics::analytics(&self.corpus)
    }

    fn enrich(&self, row: &Row<'_>, score: Option<f32>) -> ResultRow {
        let mut fields = row.to_pairs();
        let blurb = self
            .writer
            .generate(row.text("title"), row.text("description"), row.text("categories"));
        fields.push(("gen_description".to_string(), Datum::Text(blurb)));
        if let Some(score) = score {
            fields.push(("score".to_string(), Datum::F32(score)));
        }
        let mut out = sanitize_row(fields);
        out.insert(IMAGES_FIELD.to_string(), Value::String(first_image_url(row.text(IMAGES_FIELD))));
        out
    }
}

/// Every filter on a field the row has must match; filters on other fields are ignored.
fn passes_filters(row: &Row<'_>, filters: &Filters) -> bool {
    filters.iter().all(|(field, needle)| match row.get(field) {
        Some(value) => value.to_string().to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("catalog error: {0}")]
    Corpus(#[from] CorpusError),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    #[error("embedding error: {0}")]
    Embed(#[from] EmbedError),
    #[error("Ollama client error: {0}")]
    Ollama(#[from] OllamaError),
}
