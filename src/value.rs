//! Value kinds and literal values held by attribute instances.
//!
//! Every attribute type carries exactly one [`ValueKind`]; every attribute
//! instance holds one [`Value`] of that kind.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The value kind of an attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// `true` or `false`.
    Boolean,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
    /// Date and time without a time zone.
    DateTime,
}

impl ValueKind {
    /// Returns true if values of this kind can be checked against a regex.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Long => write!(f, "long"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "string"),
            Self::DateTime => write!(f, "datetime"),
        }
    }
}

/// A literal value.
///
/// # Examples
///
/// ```
/// use typegraph::{Value, ValueKind};
///
/// let v = Value::Long(42);
/// assert_eq!(v.kind(), ValueKind::Long);
/// assert_eq!(v.as_long(), Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// A boolean literal.
    Boolean(bool),
    /// A long literal.
    Long(i64),
    /// A double literal.
    Double(f64),
    /// A string literal.
    String(String),
    /// A datetime literal.
    DateTime(NaiveDateTime),
}

impl Value {
    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Long(_) => ValueKind::Long,
            Self::Double(_) => ValueKind::Double,
            Self::String(_) => ValueKind::String,
            Self::DateTime(_) => ValueKind::DateTime,
        }
    }

    /// Returns the boolean, if this is one.
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the long, if this is one.
    pub const fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the double, if this is one.
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the datetime, if this is one.
    pub const fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Stable byte encoding used to derive attribute identity.
    ///
    /// Doubles are encoded by bit pattern, so `0.0` and `-0.0` are distinct.
    #[must_use]
    pub fn identity_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        match self {
            Self::Boolean(v) => {
                out.push(0);
                out.push(u8::from(*v));
            }
            Self::Long(v) => {
                out.push(1);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Self::Double(v) => {
                out.push(2);
                out.extend_from_slice(&v.to_bits().to_be_bytes());
            }
            Self::String(v) => {
                out.push(3);
                out.extend_from_slice(v.as_bytes());
            }
            Self::DateTime(v) => {
                out.push(4);
                out.extend_from_slice(&v.and_utc().timestamp_millis().to_be_bytes());
            }
        }
        out
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "\"{v}\""),
            Self::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.3f")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}
