//! Loading the product catalog from CSV into an immutable row-store.
//!
//! After load every declared text field is present and non-null, `price` is a
//! finite number on every row, and a derived `text` column holds the string
//! that gets embedded.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::datum::Datum;

/// Text fields that always exist after load (empty string when absent).
pub const TEXT_FIELDS: [&str; 6] = ["title", "brand", "description", "categories", "material", "color"];
/// Fields concatenated (in this order) into the embedded `text` column.
const TEXT_PARTS: [&str; 6] = ["title", "brand", "categories", "material", "color", "description"];

pub const ID_FIELD: &str = "uniq_id";
pub const PRICE_FIELD: &str = "price";
pub const IMAGES_FIELD: &str = "images";
pub const TEXT_FIELD: &str = "text";

/// The catalog: column names plus row-major cells. Never mutated after load.
#[derive(Debug, Clone)]
pub struct Corpus {
    columns: Vec<String>,
    rows: Vec<Vec<Datum>>,
}

/// Borrowed view of one catalog row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [Datum],
}

impl<'a> Row<'a> {
    pub fn get(&self, field: &str) -> Option<&'a Datum> {
        let (columns, cells) = (self.columns, self.cells);
        let i = columns.iter().position(|c| c == field)?;
        cells.get(i)
    }

    /// Text of a field, or "" when the field is missing or not text.
    pub fn text(&self, field: &str) -> &'a str {
        self.get(field).and_then(Datum::as_str).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Datum)> + 'a {
        let (columns, cells) = (self.columns, self.cells);
        columns.iter().map(String::as_str).zip(cells.iter())
    }

    /// Owned copy of the row's fields, in column order.
    pub fn to_pairs(&self) -> Vec<(String, Datum)> {
        self.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }
}

impl Corpus {
    /// Load the catalog from a CSV file with a header row.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let reader = csv::Reader::from_path(path).map_err(|e| CorpusError::Open(path.to_path_buf(), e))?;
        let corpus = Self::from_csv(reader)?;
        info!(path = %path.display(), items = corpus.len(), "loaded catalog");
        Ok(corpus)
    }

    /// Load the catalog from any CSV stream with a header row.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, CorpusError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self, CorpusError> {
        let headers: Vec<String> = reader
            .headers()
            .map_err(CorpusError::Header)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| CorpusError::Row { line: i as u64 + 2, source: e })?;
            for (col, cell) in raw.iter_mut().zip(record.iter()) {
                col.push((!cell.is_empty()).then(|| cell.to_string()));
            }
        }
        let n_rows = raw.first().map_or(0, Vec::len);

        let mut columns = Vec::with_capacity(headers.len() + TEXT_FIELDS.len() + 2);
        let mut typed: Vec<Vec<Datum>> = Vec::with_capacity(columns.capacity());
        for (name, cells) in headers.into_iter().zip(raw) {
            let values = if TEXT_FIELDS.contains(&name.as_str()) {
                cells.into_iter().map(|c| Datum::Text(c.unwrap_or_default())).collect()
            } else if name == PRICE_FIELD {
                impute_prices(cells.iter().map(|c| c.as_deref().and_then(parse_price)).collect())
            } else if name == ID_FIELD || name == IMAGES_FIELD {
                cells.into_iter().map(|c| c.map_or(Datum::Null, Datum::Text)).collect()
            } else {
                infer_column(cells)
            };
            columns.push(name);
            typed.push(values);
        }

        for field in TEXT_FIELDS {
            if !columns.iter().any(|c| c == field) {
                debug!(field, "catalog has no such column, filling with empty text");
                columns.push(field.to_string());
                typed.push(vec![Datum::text(""); n_rows]);
            }
        }
        if !columns.iter().any(|c| c == PRICE_FIELD) {
            columns.push(PRICE_FIELD.to_string());
            typed.push(vec![Datum::Float(0.0); n_rows]);
        }

        let text: Vec<Datum> = (0..n_rows)
            .map(|r| {
                let parts: Vec<&str> = TEXT_PARTS
                    .iter()
                    .map(|field| {
                        columns
                            .iter()
                            .position(|c| c == field)
                            .and_then(|i| typed[i][r].as_str())
                            .unwrap_or("")
                    })
                    .collect();
                Datum::Text(parts.join(" "))
            })
            .collect();
        match columns.iter().position(|c| c == TEXT_FIELD) {
            Some(i) => typed[i] = text,
            None => {
                columns.push(TEXT_FIELD.to_string());
                typed.push(text);
            }
        }

        let mut rows: Vec<Vec<Datum>> = (0..n_rows).map(|_| Vec::with_capacity(columns.len())).collect();
        for col in typed {
            for (row, cell) in rows.iter_mut().zip(col) {
                row.push(cell);
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self, i: usize) -> Option<Row<'_>> {
        self.rows.get(i).map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Datum>> {
        let i = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(move |r| &r[i]))
    }

    /// Position of the first row whose `uniq_id` equals `uniq_id` exactly.
    pub fn position_of(&self, uniq_id: &str) -> Option<usize> {
        let i = self.columns.iter().position(|c| c == ID_FIELD)?;
        self.rows.iter().position(|r| r[i].as_str() == Some(uniq_id))
    }

    /// The `text` column, one string per row; this is what gets embedded.
    pub fn texts(&self) -> Vec<String> {
        self.rows().map(|r| r.text(TEXT_FIELD).to_string()).collect()
    }
}

/// Keep only ASCII digits and dots, then parse. "$1,149.99" -> 1149.99.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Median of the values; mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Fill missing prices with the median of the parsed ones, or 0.0 if none parsed.
fn impute_prices(parsed: Vec<Option<f64>>) -> Vec<Datum> {
    let valid: Vec<f64> = parsed.iter().flatten().copied().collect();
    let Some(fill) = median(&valid) else {
        return vec![Datum::Float(0.0); parsed.len()];
    };
    parsed.into_iter().map(|p| Datum::Float(p.unwrap_or(fill))).collect()
}

/// Integer column when every cell is an integer, float column when every
/// present cell is a number (empty cells become NaN), text otherwise.
fn infer_column(cells: Vec<Option<String>>) -> Vec<Datum> {
    let present: Vec<&str> = cells.iter().flatten().map(|s| s.trim()).collect();
    if present.is_empty() {
        return cells.into_iter().map(|c| c.map_or(Datum::Null, Datum::Text)).collect();
    }
    if present.len() == cells.len() && present.iter().all(|s| s.parse::<i64>().is_ok()) {
        return cells
            .iter()
            .flatten()
            .filter_map(|s| s.trim().parse::<i64>().ok())
            .map(Datum::Int)
            .collect();
    }
    if present.iter().all(|s| s.parse::<f64>().is_ok()) {
        return cells
            .iter()
            .map(|c| Datum::Float(c.as_deref().and_then(|s| s.trim().parse().ok()).unwrap_or(f64::NAN)))
            .collect();
    }
    cells.into_iter().map(|c| c.map_or(Datum::Null, Datum::Text)).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to open catalog {0}: {1}")]
    Open(PathBuf, csv::Error),
    #[error("malformed catalog header: {0}")]
    Header(csv::Error),
    #[error("malformed catalog row {line}: {source}")]
    Row { line: u64, source: csv::Error },
}
