//! Small tagged value used for catalog cells and for result trees before they
//! are sanitized into JSON.

use std::fmt;

/// A cell or result value. `F32` carries values that come straight out of the
/// index (similarity scores) and is widened when sanitized.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    F32(f32),
    Text(String),
    List(Vec<Datum>),
    /// Ordered key/value pairs.
    Map(Vec<(String, Datum)>),
}

impl Datum {
    pub fn text(s: impl Into<String>) -> Self {
        Datum::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Borrow the text, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view for price-like cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Int(i) => Some(*i as f64),
            Datum::Float(f) => Some(*f),
            Datum::F32(f) => Some(f64::from(*f)),
            _ => None,
        }
    }
}

/// String form used for keyword filtering: text as-is, integers via `Display`,
/// whole-number floats with one decimal (`120.0`), null and NaN as the empty
/// string.
impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => Ok(()),
            Datum::Bool(b) => write!(f, "{b}"),
            Datum::Int(i) => write!(f, "{i}"),
            Datum::Float(x) if x.is_nan() => Ok(()),
            Datum::Float(x) if x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{x:.1}"),
            Datum::Float(x) => write!(f, "{x}"),
            Datum::F32(x) if x.is_nan() => Ok(()),
            Datum::F32(x) if x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{x:.1}"),
            Datum::F32(x) => write!(f, "{x}"),
            Datum::Text(s) => f.write_str(s),
            Datum::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Datum::Map(pairs) => {
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Text(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::Text(s)
    }
}

impl From<f64> for Datum {
    fn from(x: f64) -> Self {
        Datum::Float(x)
    }
}

impl From<f32> for Datum {
    fn from(x: f32) -> Self {
        Datum::F32(x)
    }
}

impl From<i64> for Datum {
    fn from(i: i64) -> Self {
        Datum::Int(i)
    }
}

impl From<usize> for Datum {
    fn from(n: usize) -> Self {
        Datum::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_filter_string_form() {
        assert_eq!(Datum::Null.to_string(), "");
        assert_eq!(Datum::text("Oak Chair").to_string(), "Oak Chair");
        assert_eq!(Datum::Int(42).to_string(), "42");
        assert_eq!(Datum::Float(19.5).to_string(), "19.5");
    }

    #[test]
    fn whole_floats_keep_a_decimal() {
        assert_eq!(Datum::Float(120.0).to_string(), "120.0");
        assert_eq!(Datum::Float(-3.0).to_string(), "-3.0");
        assert_eq!(Datum::Float(0.25).to_string(), "0.25");
        assert_eq!(Datum::F32(2.0).to_string(), "2.0");
        assert_eq!(Datum::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Datum::Float(f64::NAN).to_string(), "");
    }

    #[test]
    fn numeric_view() {
        assert_eq!(Datum::Int(3).as_f64(), Some(3.0));
        assert_eq!(Datum::text("3").as_f64(), None);
    }
}
