//! Scalar cell values, type coercion of raw text, and output formatting.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tokens read as missing, matching the NA set the source exports were
/// produced against.
const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Declared scalar type of a source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Float,
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueKind::Float => write!(f, "float"),
            ValueKind::Text => write!(f, "text"),
        }
    }
}

/// Per-cell normalization applied after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// `Q01` -> `1`.
    QuarterToInt,
    /// Scale by 1000, round half to even, scale back.
    RoundThousandths,
}

impl Transform {
    /// Returns `None` when the cell cannot take the transform; the row is then
    /// treated like any other row-level coercion failure.
    pub fn apply(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (Transform::QuarterToInt, Value::Text(s)) => {
                s.trim().get(1..)?.parse::<i64>().ok().map(Value::Int)
            }
            (Transform::RoundThousandths, Value::Float(v)) => {
                Some(Value::Float((v * 1000.0).round_ties_even() / 1000.0))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Text(String),
    /// A cell that was explicitly left unresolved.
    Missing,
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => Ok(()),
        }
    }
}

/// Whitespace-only cells (including the single-space sentinel) and NA tokens
/// are missing.
pub fn is_missing_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed)
}

/// Coerce a raw cell to `kind`. `None` means the row carries no usable value.
pub fn coerce(raw: &str, kind: ValueKind) -> Option<Value> {
    if is_missing_token(raw) {
        return None;
    }
    match kind {
        ValueKind::Float => raw.trim().parse::<f64>().ok().map(Value::Float),
        ValueKind::Text => Some(Value::Text(raw.to_string())),
    }
}

/// Integral floats keep a trailing `.0`; everything else uses the shortest
/// representation that round-trips. Very small or large magnitudes switch to
/// exponent form.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if let Some(scientific) = scientific_notation(v) {
        scientific
    } else if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// `1e-05`, `1.5e+16`: shortest mantissa, signed exponent of at least two
/// digits. `None` when the exponent is in [-4, 16).
fn scientific_notation(v: f64) -> Option<String> {
    let shortest = format!("{:e}", v);
    let (mantissa, exponent) = shortest.split_once('e')?;
    let exponent: i32 = exponent.parse().ok()?;
    if v == 0.0 || (-4..16).contains(&exponent) {
        return None;
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    Some(format!("{}e{}{:02}", mantissa, sign, exponent.abs()))
}
