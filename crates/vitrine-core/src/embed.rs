//! The embedding capability the index and the recommender depend on.

use async_trait::async_trait;

use crate::ollama::OllamaError;

/// Texts sent to the embedder per request when encoding the whole catalog.
pub const EMBED_BATCH_SIZE: usize = 64;

/// Maps strings to fixed-dimension dense vectors. Must be deterministic for a
/// fixed model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model; part of the index cache fingerprint.
    fn model_id(&self) -> &str;

    /// One vector per input, in input order.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Encode `texts` in batches, checking that the embedder returns one vector
/// per input and a single dimensionality throughout.
pub async fn encode_all<E: Embedder + ?Sized>(embedder: &E, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        let vectors = embedder.encode(batch).await?;
        if vectors.len() != batch.len() {
            return Err(EmbedError::Count {
                expected: batch.len(),
                found: vectors.len(),
            });
        }
        out.extend(vectors);
    }
    if let Some(dim) = out.first().map(Vec::len) {
        if let Some(bad) = out.iter().find(|v| v.len() != dim) {
            return Err(EmbedError::Dimension {
                expected: dim,
                found: bad.len(),
            });
        }
    }
    Ok(out)
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding error: {0}")]
    Ollama(#[from] OllamaError),
    #[error("embedder returned {found} vectors for {expected} inputs")]
    Count { expected: usize, found: usize },
    #[error("embedder returned a {found}-dimensional vector, expected {expected}")]
    Dimension { expected: usize, found: usize },
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic bag-of-words embedder for tests.

    use super::*;

    pub const DIM: usize = 128;

    pub struct WordHashEmbedder;

    /// Counts of FNV-1a-hashed lowercase words.
    pub fn embed_words(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0x811c_9dc5u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193));
            v[hash as usize % DIM] += 1.0;
        }
        v
    }

    #[async_trait]
    impl Embedder for WordHashEmbedder {
        fn model_id(&self) -> &str {
            "word-hash"
        }

        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts.iter().map(|t| embed_words(t)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    struct Ragged;

    #[async_trait]
    impl Embedder for Ragged {
        fn model_id(&self) -> &str {
            "ragged"
        }

        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts.iter().enumerate().map(|(i, _)| vec![1.0; i + 1]).collect())
        }
    }

    #[tokio::test]
    async fn encode_all_batches_in_order() {
        let texts: Vec<String> = (0..EMBED_BATCH_SIZE * 2 + 3).map(|i| format!("item {i}")).collect();
        let out = encode_all(&WordHashEmbedder, &texts).await.unwrap();
        assert_eq!(out.len(), texts.len());
        assert_eq!(out[70], embed_words("item 70"));
    }

    #[tokio::test]
    async fn ragged_dimensions_rejected() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = encode_all(&Ragged, &texts).await.unwrap_err();
        assert!(matches!(err, EmbedError::Dimension { expected: 1, found: 2 }));
    }
}
