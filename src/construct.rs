//! Construction: evaluates each field's value in order and appends it to a
//! bit buffer. Every value must fill exactly its field's width.

use tracing::{debug, trace};

use crate::{
    compiled::CompiledBuildField,
    errors::{ConstructError, SpecError},
    field::BuildField,
    value::Bindings,
    writer::BitBuffer,
};

/// A validated constructor, reusable with different bindings.
#[derive(Debug, Clone)]
pub struct Constructor {
    fields: Vec<CompiledBuildField>,
    static_bits: usize,
}

impl Constructor {
    /// Validates every field. Nothing is written when this fails.
    pub fn compile(fields: &[BuildField]) -> Result<Self, SpecError> {
        let fields = fields
            .iter()
            .map(CompiledBuildField::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let static_bits = fields.iter().filter_map(|f| f.static_width()).sum();

        Ok(Constructor {
            fields,
            static_bits,
        })
    }

    /// Sum of the lengths known without evaluating anything.
    pub fn static_bits(&self) -> usize {
        self.static_bits
    }

    /// Whether some field's length is only known once values are evaluated.
    pub fn is_dynamic(&self) -> bool {
        self.fields.iter().any(|f| f.static_width().is_none())
    }

    /// Builds a buffer, reading variables from `env`.
    pub fn construct(&self, env: &Bindings<'_>) -> Result<BitBuffer, ConstructError> {
        let mut out = BitBuffer::with_capacity(self.static_bits);

        for (index, field) in self.fields.iter().enumerate() {
            let bad_value = |value: String| ConstructError::BadFieldValue { index, value };

            let value = field
                .value
                .eval(env)
                .ok_or_else(|| bad_value(format!("{:?} is not bound", field.value)))?;
            let width = field
                .width(&value, env)?
                .ok_or_else(|| bad_value(format!("{value} has no valid length")))?;

            trace!(field = index, width, routine = ?field.routine, "encode");
            let written = field
                .routine
                .encode(&mut out, &value, width, env)
                .ok_or_else(|| bad_value(value.to_string()))?;
            if written != width && !field.is_rest() {
                debug!(field = index, width, written, "value length differs from field width");
                return Err(bad_value(value.to_string()));
            }
        }

        debug!(bits = out.len_bits(), "constructed");
        Ok(out)
    }
}

/// Validates `fields` and builds a buffer from them.
pub fn construct(fields: &[BuildField], env: &Bindings<'_>) -> Result<BitBuffer, ConstructError> {
    Constructor::compile(fields)?.construct(env)
}
