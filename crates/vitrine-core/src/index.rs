//! Index pipeline: catalog texts → embed → normalize → flat index, cached on disk.
//!
//! The cache directory holds the matrix, the index and a fingerprint of the
//! catalog and model they were built from. A fingerprint mismatch triggers a
//! rebuild; corrupt artifacts are an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::corpus::Corpus;
use crate::embed::{encode_all, EmbedError, Embedder};
use crate::store::{EmbeddingMatrix, FlatIpIndex, StoreError};

pub const MATRIX_FILE: &str = "embeddings.bin";
pub const INDEX_FILE: &str = "flat_ip.index";
pub const FINGERPRINT_FILE: &str = "fingerprint.json";

/// What a cached index was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub model: String,
    pub items: usize,
    pub columns: Vec<String>,
    /// SHA-256 over the model, schema and every item's text.
    pub digest: String,
}

impl Fingerprint {
    pub fn of(corpus: &Corpus, model: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(corpus.len().to_le_bytes());
        for column in corpus.columns() {
            hasher.update(column.as_bytes());
            hasher.update([0]);
        }
        for text in corpus.texts() {
            hasher.update(text.as_bytes());
            hasher.update([0]);
        }
        Self {
            model: model.to_string(),
            items: corpus.len(),
            columns: corpus.columns().to_vec(),
            digest: hex::encode(hasher.finalize()),
        }
    }
}

/// Normalized embedding matrix plus the index built over it. Read-only.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    matrix: EmbeddingMatrix,
    index: FlatIpIndex,
}

impl VectorIndex {
    /// Encode every catalog text and build the index in memory.
    pub async fn build<E: Embedder + ?Sized>(corpus: &Corpus, embedder: &E) -> Result<Self, IndexError> {
        info!(items = corpus.len(), model = embedder.model_id(), "embedding catalog");
        let vectors = encode_all(embedder, &corpus.texts()).await?;
        let matrix = EmbeddingMatrix::from_rows(vectors)?;
        let index = FlatIpIndex::build(&matrix);
        Ok(Self { matrix, index })
    }

    /// Load the index from `dir` if it is cached and still matches the
    /// catalog, otherwise build it and write the cache.
    pub async fn ensure<E: Embedder + ?Sized>(dir: &Path, corpus: &Corpus, embedder: &E) -> Result<Self, IndexError> {
        fs::create_dir_all(dir).map_err(|e| IndexError::CreateDir(dir.to_path_buf(), e))?;
        let fingerprint = Fingerprint::of(corpus, embedder.model_id());

        if dir.join(MATRIX_FILE).exists() && dir.join(INDEX_FILE).exists() {
            match read_fingerprint(dir)? {
                Some(stored) if stored != fingerprint => {
                    warn!(dir = %dir.display(), "cached index was built from a different catalog or model; rebuilding");
                }
                stored => {
                    let cached = Self::load(dir)?;
                    if cached.len() != corpus.len() {
                        return Err(IndexError::Stale {
                            cached: cached.len(),
                            items: corpus.len(),
                            dir: dir.to_path_buf(),
                        });
                    }
                    if stored.is_none() {
                        warn!(dir = %dir.display(), "cached index has no fingerprint; trusting it");
                    }
                    info!(dir = %dir.display(), items = cached.len(), dim = cached.dim(), "loaded cached index");
                    return Ok(cached);
                }
            }
        }

        let built = Self::build(corpus, embedder).await?;
        built.persist(dir, &fingerprint)?;
        info!(dir = %dir.display(), items = built.len(), dim = built.dim(), "built and cached index");
        Ok(built)
    }

    /// Read both artifacts from `dir`.
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let matrix = EmbeddingMatrix::load(&dir.join(MATRIX_FILE))?;
        let index = FlatIpIndex::load(&dir.join(INDEX_FILE))?;
        if matrix.rows() != index.len() || (matrix.rows() > 0 && matrix.dim() != index.dim()) {
            return Err(IndexError::Mismatch(dir.to_path_buf()));
        }
        Ok(Self { matrix, index })
    }

    /// Write the matrix, the index and the fingerprint into `dir`.
    pub fn persist(&self, dir: &Path, fingerprint: &Fingerprint) -> Result<(), IndexError> {
        self.matrix.save(&dir.join(MATRIX_FILE))?;
        self.index.save(&dir.join(INDEX_FILE))?;
        let path = dir.join(FINGERPRINT_FILE);
        let json = serde_json::to_string_pretty(fingerprint).map_err(|e| IndexError::Fingerprint(path.clone(), e.to_string()))?;
        fs::write(&path, json).map_err(|e| IndexError::Fingerprint(path, e.to_string()))
    }

    /// The `m` nearest rows to a unit-length query, best first.
    pub fn search(&self, query: &[f32], m: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        Ok(self.index.search(query, m)?)
    }

    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dim(&self) -> usize {
        self.matrix.dim()
    }
}

fn read_fingerprint(dir: &Path) -> Result<Option<Fingerprint>, IndexError> {
    let path = dir.join(FINGERPRINT_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(&path).map_err(|e| IndexError::Fingerprint(path.clone(), e.to_string()))?;
    serde_json::from_str(&s)
        .map(Some)
        .map_err(|e| IndexError::Fingerprint(path, e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index store error: {0}")]
    Store(#[from] StoreError),
    #[error("embedding error: {0}")]
    Embed(#[from] EmbedError),
    #[error("failed to create index directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("fingerprint error for {0}: {1}")]
    Fingerprint(PathBuf, String),
    #[error("cached index in {dir} has {cached} rows but the catalog has {items}; clear the directory to rebuild")]
    Stale { cached: usize, items: usize, dir: PathBuf },
    #[error("cached matrix and index in {0} disagree")]
    Mismatch(PathBuf),
}
