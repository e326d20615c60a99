//! Embedding matrix and flat inner-product index over it.
//!
//! Rows are L2-normalized, so inner product equals cosine similarity. Both
//! structures are immutable once built and can be written to and read from disk.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Dense row-major `f32` matrix, one unit-length row per catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Build from one vector per item, normalizing each row. All rows must have
    /// the same length.
    pub fn from_rows(vectors: Vec<Vec<f32>>) -> Result<Self, StoreError> {
        let dim = vectors.first().map_or(0, Vec::len);
        let rows = vectors.len();
        let mut data = Vec::with_capacity(rows * dim);
        for v in vectors {
            if v.len() != dim {
                return Err(StoreError::Dimension {
                    expected: dim,
                    found: v.len(),
                });
            }
            data.extend(normalize(&v));
        }
        Ok(Self { rows, dim, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        (i < self.rows).then(|| &self.data[i * self.dim..(i + 1) * self.dim])
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_artifact(path, self)
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let matrix: Self = read_artifact(path)?;
        if matrix.rows.checked_mul(matrix.dim) != Some(matrix.data.len()) {
            return Err(StoreError::Corrupt(path.to_path_buf()));
        }
        Ok(matrix)
    }
}

/// Exhaustive inner-product index. Query results come back best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIpIndex {
    dim: usize,
    vectors: Vec<f32>,
}

impl FlatIpIndex {
    pub fn build(matrix: &EmbeddingMatrix) -> Self {
        Self {
            dim: matrix.dim,
            vectors: matrix.data.clone(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.vectors.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `m` rows with the highest inner product against `query`, as
    /// `(row, score)` in descending score order. Equal scores keep row order.
    pub fn search(&self, query: &[f32], m: usize) -> Result<Vec<(usize, f32)>, StoreError> {
        if self.is_empty() || m == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(StoreError::Dimension {
                expected: self.dim,
                found: query.len(),
            });
        }
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dim)
            .map(|row| dot(query, row))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(m);
        Ok(scored)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_artifact(path, self)
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let index: Self = read_artifact(path)?;
        let ragged = if index.dim == 0 {
            !index.vectors.is_empty()
        } else {
            index.vectors.len() % index.dim != 0
        };
        if ragged {
            return Err(StoreError::Corrupt(path.to_path_buf()));
        }
        Ok(index)
    }
}

/// Scale `v` to unit length. Zero vectors are returned unchanged.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|e| StoreError::Io(path.to_path_buf(), e))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, value).map_err(|e| StoreError::Encode(path.to_path_buf(), e))?;
    writer.flush().map_err(|e| StoreError::Io(path.to_path_buf(), e))
}

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::Io(path.to_path_buf(), e))?;
    bincode::deserialize_from(BufReader::new(file)).map_err(|e| StoreError::Decode(path.to_path_buf(), e))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("vector has {found} dimensions, expected {expected}")]
    Dimension { expected: usize, found: usize },
    #[error("i/o error for {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("failed to write {0}: {1}")]
    Encode(PathBuf, bincode::Error),
    #[error("failed to read {0}: {1}")]
    Decode(PathBuf, bincode::Error),
    #[error("artifact {0} is inconsistent")]
    Corrupt(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> EmbeddingMatrix {
        EmbeddingMatrix::from_rows(vec![
            vec![3.0, 4.0, 0.0],
            vec![0.0, 0.0, 2.0],
            vec![1.0, 1.0, 1.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn rows_are_unit_length() {
        let m = matrix();
        for i in 0..3 {
            let norm: f32 = m.row(i).unwrap().iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5, "row {i} has norm {norm}");
        }
        assert_eq!(m.row(3).unwrap(), &[0.0, 0.0, 0.0]);
        assert!(m.row(4).is_none());
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = EmbeddingMatrix::from_rows(vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, StoreError::Dimension { expected: 2, found: 1 }));
    }

    #[test]
    fn search_is_descending() {
        let index = FlatIpIndex::build(&matrix());
        let q = normalize(&[1.0, 1.0, 0.2]);
        let hits = index.search(&q, 10).unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[3].0, 3);
    }

    #[test]
    fn search_truncates_and_keeps_tie_order() {
        let m = EmbeddingMatrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let index = FlatIpIndex::build(&m);
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn wrong_query_dimension() {
        let index = FlatIpIndex::build(&matrix());
        assert!(matches!(index.search(&[1.0], 1), Err(StoreError::Dimension { .. })));
    }

    #[test]
    fn artifacts_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let m = matrix();
        let index = FlatIpIndex::build(&m);
        m.save(&dir.path().join("m.bin")).unwrap();
        index.save(&dir.path().join("i.bin")).unwrap();
        assert_eq!(EmbeddingMatrix::load(&dir.path().join("m.bin")).unwrap(), m);
        assert_eq!(FlatIpIndex::load(&dir.path().join("i.bin")).unwrap(), index);
    }

    #[test]
    fn garbage_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.bin");
        std::fs::write(&path, b"not bincode").unwrap();
        assert!(EmbeddingMatrix::load(&path).is_err());
    }

    #[test]
    fn overflowing_shape_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.bin");
        let bogus = EmbeddingMatrix {
            rows: usize::MAX,
            dim: 2,
            data: Vec::new(),
        };
        bogus.save(&path).unwrap();
        assert!(matches!(EmbeddingMatrix::load(&path), Err(StoreError::Corrupt(_))));
    }
}
