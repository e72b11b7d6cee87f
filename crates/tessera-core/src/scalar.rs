//! Scalar parameter types.
//!
//! Path and query parameters arrive as raw strings and are cast into one of
//! four scalar types. Casting is deliberately narrow:
//!
//! - integers and floats are parsed after trimming surrounding whitespace
//! - booleans are `true` only for the case-insensitive literal `"true"`;
//!   every other input is `false`, never an error
//! - strings are taken verbatim

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The scalar types a path or query parameter may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Boolean.
    Boolean,
    /// UTF-8 string.
    String,
}

impl ScalarType {
    /// Returns the JSON schema type name used in generated documents.
    #[must_use]
    pub const fn openapi_type(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }

    /// Casts a raw string into a value of this type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tessera_core::{ScalarType, ScalarValue};
    ///
    /// assert_eq!(ScalarType::Integer.cast("42"), Ok(ScalarValue::Integer(42)));
    /// assert_eq!(ScalarType::Boolean.cast("yes"), Ok(ScalarValue::Boolean(false)));
    /// assert!(ScalarType::Float.cast("abc").is_err());
    /// ```
    pub fn cast(self, raw: &str) -> Result<ScalarValue, CastError> {
        match self {
            Self::Integer => raw
                .trim()
                .parse::<i64>()
                .map(ScalarValue::Integer)
                .map_err(|_| CastError::new(self, raw)),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .map(ScalarValue::Float)
                .map_err(|_| CastError::new(self, raw)),
            Self::Boolean => Ok(ScalarValue::Boolean(raw.eq_ignore_ascii_case("true"))),
            Self::String => Ok(ScalarValue::String(raw.to_string())),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.openapi_type())
    }
}

/// A raw string that could not be cast into its declared scalar type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, got {raw:?}")]
pub struct CastError {
    expected: ScalarType,
    raw: String,
}

impl CastError {
    /// Creates a new cast error.
    pub fn new(expected: ScalarType, raw: impl Into<String>) -> Self {
        Self {
            expected,
            raw: raw.into(),
        }
    }

    /// Returns the type the value was being cast into.
    #[must_use]
    pub fn expected(&self) -> ScalarType {
        self.expected
    }

    /// Returns the raw input.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// A cast scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// String value.
    String(String),
}

impl ScalarValue {
    /// Returns the type of this value.
    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::Integer(_) => ScalarType::Integer,
            Self::Float(_) => ScalarType::Float,
            Self::Boolean(_) => ScalarType::Boolean,
            Self::String(_) => ScalarType::String,
        }
    }

    /// Converts this value into `ty`, widening integers into floats.
    ///
    /// Returns `None` for any other mismatch.
    #[must_use]
    pub fn coerce(self, ty: ScalarType) -> Option<Self> {
        match (self, ty) {
            (value, ty) if value.scalar_type() == ty => Some(value),
            (Self::Integer(v), ScalarType::Float) => Some(Self::Float(v as f64)),
            _ => None,
        }
    }

    /// Returns the value as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Integer(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Value::from(*v),
            Self::Boolean(v) => serde_json::Value::from(*v),
            Self::String(v) => serde_json::Value::from(v.as_str()),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Rust types that map onto a [`ScalarType`].
///
/// Used to declare typed parameters and to read bound values back out.
pub trait Scalar: Sized + Send + Sync + 'static {
    /// The declared scalar type.
    const TYPE: ScalarType;

    /// Reads a bound value, returning `None` on a type mismatch.
    fn from_value(value: &ScalarValue) -> Option<Self>;
}

impl Scalar for i64 {
    const TYPE: ScalarType = ScalarType::Integer;

    fn from_value(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl Scalar for f64 {
    const TYPE: ScalarType = ScalarType::Float;

    fn from_value(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl Scalar for bool {
    const TYPE: ScalarType = ScalarType::Boolean;

    fn from_value(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl Scalar for String {
    const TYPE: ScalarType = ScalarType::String;

    fn from_value(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}
