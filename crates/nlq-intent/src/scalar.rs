//! Scalar values carried through filters and bound parameters

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single bound value: always shipped to the database as a parameter,
/// never rendered into SQL text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Float(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "NULL"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_stay_integers() {
        let s: Scalar = serde_json::from_str("42").unwrap();
        assert_eq!(s, Scalar::Int(42));
    }

    #[test]
    fn floats_and_strings_round_trip() {
        let s: Scalar = serde_json::from_str("49.5").unwrap();
        assert_eq!(s, Scalar::Float(49.5));

        let s: Scalar = serde_json::from_str("\"'; DROP TABLE contacts; --\"").unwrap();
        assert_eq!(s, Scalar::Text("'; DROP TABLE contacts; --".to_string()));
    }

    #[test]
    fn null_decodes() {
        let s: Scalar = serde_json::from_str("null").unwrap();
        assert_eq!(s, Scalar::Null);
    }
}
