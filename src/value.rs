//! Typed cell values and schema-boundary coercion.
//!
//! A [`Value`] is what sits in a table cell. Coercion happens once, when a
//! value crosses the schema boundary (INSERT, UPDATE, WHERE), never lazily
//! at comparison time.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::EngineError;

/// A single cell value.
///
/// Serializes untagged so table blobs read as plain JSON: `null`, numbers,
/// booleans, strings. serde_json keeps integers and floats apart, so the
/// round trip is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Equality as the executor uses it for filtering and uniqueness:
    /// strict per-variant, except Text against Text which compares
    /// case-insensitively.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => self == other,
        }
    }

    /// True for Null and for strings spelling the NULL literal.
    pub fn is_null_literal(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.eq_ignore_ascii_case("NULL"),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Declared column type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Int,
    Text,
    Bool,
    Float,
}

impl ColumnType {
    /// Comma-separated list of the supported type keywords, for messages.
    pub fn supported() -> String {
        ColumnType::iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Coerce a raw value to this declared type.
    ///
    /// Null passes through regardless of type. Numeric types never
    /// auto-promote to each other: an INT column rejects a float with a
    /// fractional part, while a FLOAT column accepts any Int.
    pub fn coerce(self, raw: &Value) -> Result<Value, EngineError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        match self {
            ColumnType::Int => match raw {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Float(f) if is_integral(*f) => Ok(Value::Int(*f as i64)),
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| cannot_convert(raw, self)),
                _ => Err(cannot_convert(raw, self)),
            },
            ColumnType::Float => match raw {
                Value::Int(i) => Ok(Value::Float(*i as f64)),
                Value::Float(f) => Ok(Value::Float(*f)),
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| cannot_convert(raw, self)),
                _ => Err(cannot_convert(raw, self)),
            },
            ColumnType::Bool => match raw {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::Text(s) => match s.to_lowercase().as_str() {
                    "true" | "1" | "yes" | "t" => Ok(Value::Bool(true)),
                    "false" | "0" | "no" | "f" | "" => Ok(Value::Bool(false)),
                    _ => Err(cannot_convert(raw, self)),
                },
                _ => Err(cannot_convert(raw, self)),
            },
            ColumnType::Text => Ok(Value::Text(raw.to_string())),
        }
    }
}

/// Finite, no fractional part, and representable as i64.
fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&f)
}

fn cannot_convert(raw: &Value, ty: ColumnType) -> EngineError {
    EngineError::Type(format!("Cannot convert '{raw}' to {ty}"))
}
