//! Converts [`Datum`] trees into JSON that can always be transmitted.
//! Non-finite floats become `null`; narrow floats are widened to `f64`.

use serde_json::{Map, Number, Value};

use crate::datum::Datum;

/// Recursively sanitize a value.
pub fn sanitize(datum: Datum) -> Value {
    match datum {
        Datum::Null => Value::Null,
        Datum::Bool(b) => Value::Bool(b),
        Datum::Int(i) => Value::Number(Number::from(i)),
        Datum::Float(x) => finite(x),
        Datum::F32(x) => finite(f64::from(x)),
        Datum::Text(s) => Value::String(s),
        Datum::List(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Datum::Map(pairs) => Value::Object(sanitize_row(pairs)),
    }
}

/// Sanitize an ordered list of fields into a JSON object, keeping field order.
pub fn sanitize_row(pairs: Vec<(String, Datum)>) -> Map<String, Value> {
    pairs.into_iter().map(|(k, v)| (k, sanitize(v))).collect()
}

/// `Number::from_f64` rejects NaN and infinities.
fn finite(x: f64) -> Value {
    Number::from_f64(x).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains_non_finite(v: &Value) -> bool {
        match v {
            Value::Number(n) => n.as_f64().is_some_and(|f| !f.is_finite()),
            Value::Array(items) => items.iter().any(contains_non_finite),
            Value::Object(map) => map.values().any(contains_non_finite),
            _ => false,
        }
    }

    #[test]
    fn non_finite_become_null() {
        assert_eq!(sanitize(Datum::Float(f64::NAN)), Value::Null);
        assert_eq!(sanitize(Datum::Float(f64::INFINITY)), Value::Null);
        assert_eq!(sanitize(Datum::F32(f32::NEG_INFINITY)), Value::Null);
    }

    #[test]
    fn nested_trees_are_cleaned() {
        let tree = Datum::Map(vec![
            ("price".into(), Datum::Float(f64::NAN)),
            (
                "nested".into(),
                Datum::List(vec![
                    Datum::Float(1.5),
                    Datum::F32(f32::NAN),
                    Datum::Map(vec![("inf".into(), Datum::Float(f64::INFINITY))]),
                ]),
            ),
            ("title".into(), Datum::text("Lamp")),
        ]);
        let out = sanitize(tree);
        assert!(!contains_non_finite(&out));
        assert_eq!(out["price"], Value::Null);
        assert_eq!(out["nested"][0], serde_json::json!(1.5));
        assert_eq!(out["nested"][1], Value::Null);
        assert_eq!(out["nested"][2]["inf"], Value::Null);
        assert_eq!(out["title"], "Lamp");
    }

    #[test]
    fn narrow_types_become_plain_numbers() {
        let v = sanitize(Datum::F32(0.5));
        assert_eq!(v.as_f64(), Some(0.5));
        assert_eq!(sanitize(Datum::Int(7)), serde_json::json!(7));
    }

    #[test]
    fn row_keeps_field_order() {
        let row = sanitize_row(vec![
            ("z".into(), Datum::Int(1)),
            ("a".into(), Datum::Int(2)),
        ]);
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, ["z", "a"]);
    }
}
