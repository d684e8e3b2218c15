//! Values produced by extraction and consumed by construction.

use std::collections::BTreeMap;
use std::fmt;

use crate::cursor::Cursor;

/// A decoded field value, or a value to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value<'a> {
    /// 1-bit integer field with a static width.
    Bool(bool),
    U64(u64),
    I64(i64),
    /// Contents of a `string` field.
    Bytes(Vec<u8>),
    /// Contents of a `bitstring` field: a view into the matched buffer.
    Bits(Cursor<'a>),
}

impl Value<'_> {
    /// Integer view of booleans and integers.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Bool(b) => Some(*b as i128),
            Value::U64(v) => Some(*v as i128),
            Value::I64(v) => Some(*v as i128),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Human-readable kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::U64(_) | Value::I64(_) => "int",
            Value::Bytes(_) => "string",
            Value::Bits(_) => "bitstring",
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Value::Bits(c) => write!(f, "<{} bits at {}>", c.len(), c.offset()),
        }
    }
}

impl From<bool> for Value<'_> {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<u64> for Value<'_> {
    fn from(value: u64) -> Self {
        Value::U64(value)
    }
}

impl From<i64> for Value<'_> {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<&[u8]> for Value<'_> {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<&str> for Value<'_> {
    fn from(value: &str) -> Self {
        Value::Bytes(value.as_bytes().to_vec())
    }
}

impl<'a> From<Cursor<'a>> for Value<'a> {
    fn from(value: Cursor<'a>) -> Self {
        Value::Bits(value)
    }
}

/// Names bound so far, in the order-independent form case bodies read them.
pub type Bindings<'a> = BTreeMap<String, Value<'a>>;

/// A value known when the specification is written: a literal pattern or a
/// literal constructor value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Bytes(Vec<u8>),
}

impl Literal {
    /// Whether an extracted value equals this literal.
    pub fn matches(&self, value: &Value<'_>) -> bool {
        match (self, value) {
            (Literal::Bytes(l), Value::Bytes(v)) => l == v,
            (Literal::Bytes(_), _) | (_, Value::Bytes(_)) | (_, Value::Bits(_)) => false,
            (Literal::Bool(l), v) => v.as_i128() == Some(*l as i128),
            (Literal::Int(l), v) => v.as_i128() == Some(*l as i128),
        }
    }

    pub fn to_value<'a>(&self) -> Value<'a> {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::I64(*i),
            Literal::Bytes(b) => Value::Bytes(b.clone()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_value(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_matches_across_integer_kinds() {
        assert!(Literal::Int(255).matches(&Value::U64(255)));
        assert!(Literal::Int(-1).matches(&Value::I64(-1)));
        assert!(!Literal::Int(-1).matches(&Value::U64(u64::MAX)));
        assert!(Literal::Bool(true).matches(&Value::Bool(true)));
        assert!(Literal::Int(1).matches(&Value::Bool(true)));
    }

    #[test]
    fn test_literal_bytes() {
        assert!(Literal::Bytes(b"AB".to_vec()).matches(&Value::from("AB")));
        assert!(!Literal::Bytes(b"AB".to_vec()).matches(&Value::U64(0x4142)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
        assert_eq!(Value::I64(-3).to_string(), "-3");
    }
}
