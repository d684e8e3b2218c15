//! Field-length validation per value type.

use crate::{errors::SpecError, expr::LengthExpr, qualifier::ValueType};

/// Length meaning "everything that is left" for string and bitstring fields.
pub const REST: i64 = -1;

/// Checks a statically known length against the legal range of `value_type`
/// and returns it. Lengths only known at run time pass unchecked as `None`;
/// see [runtime_width] for the check applied once they are known.
pub fn check_length(value_type: ValueType, length: &LengthExpr) -> Result<Option<i64>, SpecError> {
    let Some(n) = length.evaluate() else {
        return Ok(None);
    };

    match value_type {
        ValueType::String if n != REST && (n <= 0 || n % 8 != 0) => {
            Err(SpecError::InvalidStringLength(n))
        }
        ValueType::Bitstring if n < REST => Err(SpecError::InvalidBitstringLength(n)),
        ValueType::Int if !(1..=64).contains(&n) => Err(SpecError::InvalidIntLength(n)),
        _ => Ok(Some(n)),
    }
}

/// Width of a field whose length was computed at run time, or `None` when the
/// value is out of range for `value_type`. An out-of-range dynamic width makes
/// the field not fit, it is not a specification error.
pub fn runtime_width(value_type: ValueType, n: i64) -> Option<usize> {
    let legal = match value_type {
        ValueType::Int => (1..=64).contains(&n),
        ValueType::String => n >= 0 && n % 8 == 0,
        ValueType::Bitstring => n >= 0,
    };

    if legal { usize::try_from(n).ok() } else { None }
}
