//! Fields checked and planned once, ahead of any matching or construction.

use crate::{
    cursor::Cursor,
    dispatch::Routine,
    errors::{Slot, SpecError},
    expr::{CheckExpr, LengthExpr, MapExpr, ValueExpr},
    field::{BuildField, BuildValue, Field, Pattern},
    length::{REST, check_length, runtime_width},
    qualifier::{Qualifiers, ValueType},
    value::{Bindings, Literal, Value},
};

/// How many bits a field spans.
#[derive(Debug, Clone)]
pub enum Width {
    Static(usize),
    /// The `-1` sentinel: everything that is left.
    Rest,
    Dynamic(LengthExpr),
}

impl Width {
    fn compile(static_len: Option<i64>, length: &LengthExpr) -> Self {
        match static_len {
            Some(REST) => Width::Rest,
            // Negative static lengths other than REST never pass validation.
            Some(n) => Width::Static(n.max(0) as usize),
            None => Width::Dynamic(length.clone()),
        }
    }
}

/// A validated match field with its decode routine.
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub pattern: Pattern,
    pub value_type: ValueType,
    pub width: Width,
    pub routine: Routine,
    pub check: Option<CheckExpr>,
    pub bind: Option<ValueExpr>,
    pub map: Option<MapExpr>,
    pub save_offset_to: Option<String>,
}

impl CompiledField {
    /// Validates field `index` of a case.
    pub fn compile(index: usize, field: &Field) -> Result<Self, SpecError> {
        let q = &field.qualifiers;
        let value_type = q.value_type();
        let static_len = check_length(value_type, &field.length)?;

        if value_type != ValueType::Int
            && q.bind.is_none()
            && matches!(field.pattern, Pattern::Literal(_))
        {
            return Err(SpecError::NonVariablePattern {
                index,
                kind: value_type.name(),
            });
        }

        Ok(CompiledField {
            pattern: field.pattern.clone(),
            value_type,
            width: Width::compile(static_len, &field.length),
            routine: Routine::select(value_type, q.sign(), q.endian(), static_len),
            check: q.check.clone(),
            bind: q.bind.clone(),
            map: q.map.clone(),
            save_offset_to: q.save_offset_to.clone(),
        })
    }

    /// Bits this field consumes from `cursor`, or `None` when it does not fit.
    pub fn width(&self, cursor: &Cursor<'_>, env: &Bindings<'_>) -> Result<Option<usize>, SpecError> {
        let width = match &self.width {
            Width::Static(n) => Some(*n),
            Width::Rest => match self.value_type {
                ValueType::String if cursor.len() % 8 != 0 => None,
                _ => Some(cursor.len()),
            },
            Width::Dynamic(length) => match eval_width(length, env)? {
                Some(n) => runtime_width(self.value_type, n),
                None => None,
            },
        };

        Ok(width.filter(|w| *w <= cursor.len()))
    }
}

/// A validated constructor field with its encode routine.
#[derive(Debug, Clone)]
pub struct CompiledBuildField {
    pub value: BuildValue,
    pub value_type: ValueType,
    pub width: Width,
    pub routine: Routine,
}

impl CompiledBuildField {
    pub fn compile(field: &BuildField) -> Result<Self, SpecError> {
        let q = &field.qualifiers;
        reject_match_only(q)?;

        let value_type = q.value_type();
        if let Some(n) = field.length.evaluate() {
            let rest_allowed = value_type != ValueType::Int && n == REST;
            if n <= 0 && !rest_allowed {
                return Err(SpecError::NonPositiveConstructorLength(n));
            }
        }

        let static_len = check_length(value_type, &field.length)?;
        if value_type == ValueType::Int && static_len == Some(1) {
            if let BuildValue::Literal(Literal::Int(v)) = &field.value {
                if *v != 0 && *v != 1 {
                    return Err(SpecError::InvalidBitValue(*v));
                }
            }
        }

        Ok(CompiledBuildField {
            value: field.value.clone(),
            value_type,
            width: Width::compile(static_len, &field.length),
            routine: Routine::select(value_type, q.sign(), q.endian(), static_len),
        })
    }

    /// Declared width for `value`: the static or evaluated length, or the
    /// value's own length for the `-1` sentinel. `Ok(None)` when an evaluated
    /// length is out of range.
    pub fn width(&self, value: &Value<'_>, env: &Bindings<'_>) -> Result<Option<usize>, SpecError> {
        Ok(match &self.width {
            Width::Static(n) => Some(*n),
            Width::Rest => match value {
                Value::Bytes(b) => Some(b.len() * 8),
                Value::Bits(c) => Some(c.len()),
                _ => None,
            },
            Width::Dynamic(length) => match eval_width(length, env)? {
                Some(n) => runtime_width(self.value_type, n).filter(|w| *w > 0),
                None => None,
            },
        })
    }

    /// Whether the field takes its width from the value (`-1`).
    pub fn is_rest(&self) -> bool {
        matches!(self.width, Width::Rest)
    }

    pub fn static_width(&self) -> Option<usize> {
        match self.width {
            Width::Static(n) => Some(n),
            _ => None,
        }
    }
}

/// Evaluates a run-time length. Overflow, division by zero and values outside
/// `i64` come from the data, so they yield `None` rather than an error.
fn eval_width(length: &LengthExpr, env: &Bindings<'_>) -> Result<Option<i64>, SpecError> {
    match length.eval(env) {
        Ok(n) => Ok(Some(n)),
        Err(SpecError::LengthArithmetic) => Ok(None),
        Err(err) => Err(err),
    }
}

fn reject_match_only(q: &Qualifiers) -> Result<(), SpecError> {
    let slot = if q.check.is_some() {
        Slot::Check
    } else if q.bind.is_some() {
        Slot::Bind
    } else if q.map.is_some() {
        Slot::Map
    } else if q.save_offset_to.is_some() {
        Slot::Offset
    } else {
        return Ok(());
    };

    Err(SpecError::NotAllowedInConstructor(slot))
}
