//! Aggregate statistics over the whole catalog. Computed fresh on every call.

use serde_json::Value;

use crate::corpus::{Corpus, PRICE_FIELD};
use crate::datum::Datum;
use crate::sanitize::sanitize;

const TOP_BRANDS: usize = 10;
const TOP_CATEGORIES: usize = 15;

/// Brand counts, average price per category, per-column missing counts and a
/// price summary, as one sanitized JSON object.
pub fn analytics(corpus: &Corpus) -> Value {
    let brands = strings(corpus, "brand");
    let categories = strings(corpus, "categories");
    let prices = prices(corpus);

    sanitize(Datum::Map(vec![
        ("top_brands".into(), top_brands(&brands)),
        ("avg_price_by_category".into(), avg_price_by_category(&categories, &prices)),
        ("missingness".into(), missingness(corpus)),
        ("price_summary".into(), price_summary(&prices)),
    ]))
}

fn strings(corpus: &Corpus, field: &str) -> Vec<String> {
    corpus
        .column(field)
        .map(|col| col.map(|d| d.to_string()).collect())
        .unwrap_or_default()
}

fn prices(corpus: &Corpus) -> Vec<f64> {
    corpus
        .column(PRICE_FIELD)
        .map(|col| col.map(|d| d.as_f64().unwrap_or(f64::NAN)).collect())
        .unwrap_or_default()
}

/// Groups values in first-appearance order.
fn group<'a, T>(keys: &'a [String], values: impl IntoIterator<Item = T>) -> Vec<(&'a str, Vec<T>)> {
    let mut groups: Vec<(&str, Vec<T>)> = Vec::new();
    for (key, value) in keys.iter().zip(values) {
        match groups.iter_mut().find(|(k, _)| *k == key.as_str()) {
            Some((_, members)) => members.push(value),
            None => groups.push((key.as_str(), vec![value])),
        }
    }
    groups
}

fn top_brands(brands: &[String]) -> Datum {
    let mut counts: Vec<(&str, usize)> = group(brands, std::iter::repeat(()))
        .into_iter()
        .map(|(k, members)| (k, members.len()))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Datum::Map(
        counts
            .into_iter()
            .take(TOP_BRANDS)
            .map(|(k, n)| (k.to_string(), Datum::from(n)))
            .collect(),
    )
}

fn avg_price_by_category(categories: &[String], prices: &[f64]) -> Datum {
    let mut averages: Vec<(&str, f64)> = group(categories, prices.iter().copied())
        .into_iter()
        .map(|(k, members)| (k, mean(&members)))
        .collect();
    averages.sort_by(|a, b| b.1.total_cmp(&a.1));
    Datum::Map(
        averages
            .into_iter()
            .take(TOP_CATEGORIES)
            .map(|(k, avg)| (k.to_string(), Datum::Float(round2(avg))))
            .collect(),
    )
}

fn missingness(corpus: &Corpus) -> Datum {
    let mut counts = vec![0usize; corpus.columns().len()];
    for row in corpus.rows() {
        for (count, (_, cell)) in counts.iter_mut().zip(row.iter()) {
            let missing = match cell {
                Datum::Null => true,
                Datum::Float(x) => x.is_nan(),
                _ => false,
            };
            if missing {
                *count += 1;
            }
        }
    }
    Datum::Map(
        corpus
            .columns()
            .iter()
            .zip(counts)
            .map(|(c, n)| (c.clone(), Datum::from(n)))
            .collect(),
    )
}

/// count, mean, std, min, quartiles and max, rounded to 2 places.
fn price_summary(prices: &[f64]) -> Datum {
    let mut sorted: Vec<f64> = prices.iter().copied().filter(|p| !p.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let mean = mean(&sorted);
    let std = if n < 2 {
        f64::NAN
    } else {
        (sorted.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    };
    let stats = [
        ("count", n as f64),
        ("mean", mean),
        ("std", std),
        ("min", quantile(&sorted, 0.0)),
        ("25%", quantile(&sorted, 0.25)),
        ("50%", quantile(&sorted, 0.5)),
        ("75%", quantile(&sorted, 0.75)),
        ("max", quantile(&sorted, 1.0)),
    ];
    Datum::Map(
        stats
            .into_iter()
            .map(|(k, v)| (k.to_string(), Datum::Float(round2(v))))
            .collect(),
    )
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear interpolation between closest ranks; `sorted` must be ascending.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn corpus(csv: &str) -> Corpus {
        Corpus::from_reader(csv.as_bytes()).unwrap()
    }

    const CSV: &str = "uniq_id,brand,categories,price,note\n\
        a,Acme,Chairs,$10,\n\
        b,Birch,Sofas,$20,x\n\
        c,Acme,Chairs,$30,y\n\
        d,Cove,Sofas,$40,z\n";

    #[test]
    fn brands_by_frequency() {
        let out = analytics(&corpus(CSV));
        assert_eq!(out["top_brands"], json!({"Acme": 2, "Birch": 1, "Cove": 1}));
        let keys: Vec<&String> = out["top_brands"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["Acme", "Birch", "Cove"]);
    }

    #[test]
    fn category_averages_descending() {
        let out = analytics(&corpus(CSV));
        let avg = out["avg_price_by_category"].as_object().unwrap();
        let keys: Vec<&String> = avg.keys().collect();
        assert_eq!(keys, ["Sofas", "Chairs"]);
        assert_eq!(avg["Sofas"], json!(30.0));
        assert_eq!(avg["Chairs"], json!(20.0));
    }

    #[test]
    fn brands_and_categories_are_capped_and_rounded() {
        let mut csv = String::from("uniq_id,brand,categories,price\n");
        for i in 0..20 {
            csv.push_str(&format!("p{i},B{i},C{i},${i}.333\n"));
        }
        let out = analytics(&corpus(&csv));
        let brands = out["top_brands"].as_object().unwrap();
        assert_eq!(brands.len(), TOP_BRANDS);
        assert_eq!(brands.keys().next().unwrap(), "B0");

        let avg = out["avg_price_by_category"].as_object().unwrap();
        assert_eq!(avg.len(), TOP_CATEGORIES);
        let (first, first_avg) = avg.iter().next().unwrap();
        assert_eq!((first.as_str(), first_avg), ("C19", &json!(19.33)));
        assert_eq!(avg.get("C5"), Some(&json!(5.33)));
        assert!(avg.get("C4").is_none());
    }

    #[test]
    fn missing_cells_counted_per_column() {
        let out = analytics(&corpus(CSV));
        assert_eq!(out["missingness"]["note"], json!(1));
        assert_eq!(out["missingness"]["title"], json!(0));
        assert_eq!(out["missingness"]["price"], json!(0));
        assert_eq!(out["missingness"]["text"], json!(0));
    }

    #[test]
    fn price_summary_matches_describe() {
        let out = analytics(&corpus(CSV));
        assert_eq!(
            out["price_summary"],
            json!({
                "count": 4.0,
                "mean": 25.0,
                "std": 12.91,
                "min": 10.0,
                "25%": 17.5,
                "50%": 25.0,
                "75%": 32.5,
                "max": 40.0,
            })
        );
    }

    #[test]
    fn undefined_stats_are_null() {
        let out = analytics(&corpus("uniq_id,price\na,$5\n"));
        assert_eq!(out["price_summary"]["std"], Value::Null);
        assert_eq!(out["price_summary"]["mean"], json!(5.0));

        let empty = analytics(&corpus("uniq_id,price\n"));
        assert_eq!(empty["price_summary"]["count"], json!(0.0));
        assert_eq!(empty["price_summary"]["max"], Value::Null);
        assert_eq!(empty["top_brands"], json!({}));
    }
}
