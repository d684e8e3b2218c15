//! Error types for specification checking, matching and construction.
//!
//! A failed guard or a field that does not fit the remaining bits is not an
//! error: it is reported as [crate::matcher::CaseOutcome::NotMatched] and the
//! next case is tried.

use std::fmt;

use thiserror::Error;

/// Qualifier slot, used to name the slot a duplicate qualifier collides with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    ValueType,
    Sign,
    Endian,
    Bind,
    Check,
    Map,
    Offset,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::ValueType => "value type",
            Slot::Sign => "signedness",
            Slot::Endian => "endianness",
            Slot::Bind => "bind",
            Slot::Check => "check",
            Slot::Map => "map",
            Slot::Offset => "offset",
        };
        f.write_str(name)
    }
}

/// Errors produced while folding a qualifier list into [crate::qualifier::Qualifiers].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualifierError {
    /// The slot was already set by an earlier qualifier of the same field.
    #[error("duplicate {0} qualifier")]
    Duplicate(Slot),
    /// Unknown qualifier; carries the token text.
    #[error("invalid qualifier `{0}`")]
    Invalid(String),
}

/// Errors in a field specification, detected before any data is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error(transparent)]
    Qualifier(#[from] QualifierError),
    /// String length must be -1 or a positive multiple of 8.
    #[error("invalid string length {0}: expected -1 or a positive multiple of 8")]
    InvalidStringLength(i64),
    /// Bitstring length must be at least -1.
    #[error("invalid bitstring length {0}")]
    InvalidBitstringLength(i64),
    /// Integer width must lie in 1..=64.
    #[error("invalid integer field length {0}: expected 1..=64")]
    InvalidIntLength(i64),
    #[error("negative or null field size in constructor ({0})")]
    NonPositiveConstructorLength(i64),
    /// String and bitstring fields only bind to a variable or `_`.
    #[error("field {index}: {kind} fields can only be bound to a variable or `_`")]
    NonVariablePattern { index: usize, kind: &'static str },
    /// A 1-bit constructor field was given a literal other than 0 or 1.
    #[error("invalid value {0} for a 1-bit field: expected 0 or 1")]
    InvalidBitValue(i64),
    #[error("{0} qualifier is not allowed in a constructor")]
    NotAllowedInConstructor(Slot),
    /// Length arithmetic overflowed, divided by zero, or read a bound value
    /// outside `i64`. Field widths treat this as "does not fit".
    #[error("cannot evaluate field length")]
    LengthArithmetic,
    /// A length referred to a name that is not bound to an integer.
    #[error("length refers to `{0}`, which is not a bound integer")]
    UnboundLength(String),
    /// Textual field specification could not be parsed.
    #[error("parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },
}

/// Errors produced by [crate::matcher::match_cursor].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error(transparent)]
    Spec(#[from] SpecError),
    /// No case matched the cursor.
    #[error("no case matched the bitstring at {location}")]
    Exhausted { location: String },
}

/// Errors produced by [crate::construct::construct].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructError {
    #[error(transparent)]
    Spec(#[from] SpecError),
    /// A value does not fit its field's type or width.
    #[error("bad field value in field {index}: {value}")]
    BadFieldValue { index: usize, value: String },
}
