//! Typed flag values and the literal coercion rules shared by `SET` and
//! condition comparisons.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed value stored under a flag name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer value.
    Number(i64),
    /// A 64-bit floating-point value (only produced by hosts, never by `SET`).
    Float(f64),
    /// A text value.
    Text(String),
}

impl FlagValue {
    /// Coerce a raw literal the way `SET var = value` does.
    ///
    /// `true`/`false` become booleans, a run of ASCII digits becomes a number,
    /// a quoted literal becomes the unquoted text, anything else stays raw text.
    pub fn from_literal(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }

        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return Self::Number(n);
            }
        }

        if let Some(inner) = unquote(raw) {
            return Self::Text(inner.to_string());
        }

        Self::Text(raw.to_string())
    }

    /// Truthiness used when a bare identifier appears in a condition.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0,
            Self::Float(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Numeric view of the value, parsing text when it looks like a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Equality across representations: numbers compare numerically,
    /// everything else compares by its rendered text.
    pub fn loose_eq(&self, other: &FlagValue) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => self.to_string() == other.to_string(),
            },
        }
    }

    /// Numeric ordering; `None` when either side is not a number.
    pub fn numeric_cmp(&self, other: &FlagValue) -> Option<Ordering> {
        self.as_number()?.partial_cmp(&other.as_number()?)
    }
}

impl Default for FlagValue {
    fn default() -> Self {
        Self::Bool(false)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Strip one matching pair of double or single quotes.
pub fn unquote(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    if raw.len() < 2 {
        return None;
    }
    let first = raw.as_bytes()[0];
    let last = raw.as_bytes()[raw.len() - 1];
    if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}
