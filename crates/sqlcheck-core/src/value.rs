use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A flat record: column alias to scalar.
pub type Row = BTreeMap<String, Scalar>;

/// One cell of a result row.
///
/// Integers and reals compare numerically (`5 == 5.0`); there is no
/// tolerance, so a real only equals the exact double the engine produced.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Scalar {
    pub fn from_sqlite(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Scalar::Null,
            ValueRef::Integer(i) => Scalar::Integer(i),
            ValueRef::Real(f) => Scalar::Real(f),
            ValueRef::Text(b) => Scalar::Text(String::from_utf8_lossy(b).into_owned()),
            ValueRef::Blob(b) => Scalar::Blob(b.to_vec()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Integer(_) => "integer",
            Scalar::Real(_) => "real",
            Scalar::Text(_) => "text",
            Scalar::Blob(_) => "blob",
        }
    }
}

fn int_eq_real(i: i64, r: f64) -> bool {
    r.fract() == 0.0 && r >= i64::MIN as f64 && r < i64::MAX as f64 && r as i64 == i
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Integer(a), Scalar::Integer(b)) => a == b,
            (Scalar::Real(a), Scalar::Real(b)) => a == b,
            (Scalar::Integer(i), Scalar::Real(r)) | (Scalar::Real(r), Scalar::Integer(i)) => {
                int_eq_real(*i, *r)
            }
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            (Scalar::Blob(a), Scalar::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Real(r) => write!(f, "{r}"),
            Scalar::Text(s) => write!(f, "{s:?}"),
            Scalar::Blob(b) => write!(f, "x'{}'", hex::encode(b)),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => s.serialize_unit(),
            Scalar::Integer(i) => s.serialize_i64(*i),
            Scalar::Real(r) => s.serialize_f64(*r),
            Scalar::Text(t) => s.serialize_str(t),
            Scalar::Blob(b) => s.serialize_str(&hex::encode(b)),
        }
    }
}

// Expectation literals come from YAML/JSON, which has no blob form.
#[derive(Deserialize)]
#[serde(untagged)]
enum Literal {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(match Literal::deserialize(d)? {
            Literal::Null => Scalar::Null,
            Literal::Integer(i) => Scalar::Integer(i),
            Literal::Real(r) => Scalar::Real(r),
            Literal::Text(t) => Scalar::Text(t),
        })
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Integer(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Integer(v.into())
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Real(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// Builds a [`Row`] from `alias => value` pairs.
#[macro_export]
macro_rules! row {
    ($($k:expr => $v:expr),* $(,)?) => {{
        let mut r = $crate::value::Row::new();
        $( r.insert($k.to_string(), $crate::value::Scalar::from($v)); )*
        r
    }};
}

/// Compact single-line rendering used in failure messages.
pub fn render_rows(rows: &[Row]) -> String {
    serde_json::to_string(rows).unwrap_or_else(|_| format!("{rows:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality_crosses_int_and_real() {
        assert_eq!(Scalar::Integer(5), Scalar::Real(5.0));
        assert_eq!(Scalar::Real(10.0), Scalar::Integer(10));
        assert_ne!(Scalar::Integer(5), Scalar::Real(5.000001));
        assert_ne!(Scalar::Integer(1), Scalar::Text("1".into()));
        assert_ne!(Scalar::Null, Scalar::Integer(0));
    }

    #[test]
    fn test_rounded_literals_match_engine_doubles() {
        let expected: Scalar = serde_yaml::from_str("518297522.1").unwrap();
        assert_eq!(expected, Scalar::Real(518_297_522.10));
        let expected: Scalar = serde_yaml::from_str("3.79").unwrap();
        assert_ne!(expected, Scalar::Real(3.7899999));
    }

    #[test]
    fn test_literal_parsing() {
        let row: Row = serde_yaml::from_str(
            "{ count: 1112, price: \"$9.99/month\", casted_price: 9.99, note: null }",
        )
        .unwrap();
        assert!(matches!(row["count"], Scalar::Integer(1112)));
        assert!(matches!(row["casted_price"], Scalar::Real(_)));
        assert!(matches!(row["note"], Scalar::Null));
        assert_eq!(row["price"], Scalar::Text("$9.99/month".into()));
    }

    #[test]
    fn test_blob_renders_as_hex() {
        let v = Scalar::Blob(vec![0xde, 0xad]);
        assert_eq!(v.to_string(), "x'dead'");
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"dead\"");
    }

    #[test]
    fn test_row_macro() {
        let r = row! { "director" => "Ridley Scott", "total_budget" => 722882143.58 };
        assert_eq!(
            render_rows(&[r]),
            r#"[{"director":"Ridley Scott","total_budget":722882143.58}]"#
        );
    }
}
