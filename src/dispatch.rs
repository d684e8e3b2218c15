//! Maps (type, sign, endianness, width) to a decode routine, and mirrors the
//! same table for encoding.

use crate::{
    bits,
    cursor::Cursor,
    expr::EndianExpr,
    qualifier::{Endian, Endianness, Sign, ValueType},
    value::{Bindings, Value},
    writer::BitBuffer,
};

/// Integer container a fixed-width routine works in: widths in `(8, 16]`,
/// `(16, 32]` and `(32, 64]` use the 16, 32 and 64-bit routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    U16,
    U32,
    U64,
}

impl Container {
    pub fn for_bits(bits: usize) -> Self {
        match bits {
            0..=16 => Container::U16,
            17..=32 => Container::U32,
            _ => Container::U64,
        }
    }
}

/// The routine chosen for one field.
#[derive(Debug, Clone)]
pub enum Routine {
    /// Static 1-bit integer, decoded as a boolean.
    Bool,
    /// Static width in `[2, 8]`; byte order does not apply.
    Byte { bits: usize, sign: Sign },
    /// Static width above 8 with a byte order known up front.
    Fixed {
        container: Container,
        bits: usize,
        sign: Sign,
        endian: Endianness,
    },
    /// Static width above 8 with the byte order supplied at run time.
    Referred {
        container: Container,
        bits: usize,
        sign: Sign,
        endian: EndianExpr,
    },
    /// Width only known at run time (1 to 64 bits).
    Variable { sign: Sign, endian: Endian },
    String,
    Bitstring,
}

impl Routine {
    /// Picks the routine for a field. `static_len` is the folded length, if any.
    pub fn select(
        value_type: ValueType,
        sign: Sign,
        endian: &Endian,
        static_len: Option<i64>,
    ) -> Self {
        match value_type {
            ValueType::String => Routine::String,
            ValueType::Bitstring => Routine::Bitstring,
            ValueType::Int => match static_len.and_then(|n| usize::try_from(n).ok()) {
                None => Routine::Variable {
                    sign,
                    endian: endian.clone(),
                },
                Some(1) => Routine::Bool,
                Some(bits @ 2..=8) => Routine::Byte { bits, sign },
                Some(bits) => {
                    let container = Container::for_bits(bits);
                    match endian {
                        Endian::Referred(expr) => Routine::Referred {
                            container,
                            bits,
                            sign,
                            endian: expr.clone(),
                        },
                        fixed => Routine::Fixed {
                            container,
                            bits,
                            sign,
                            endian: fixed.resolve(&Bindings::new()),
                        },
                    }
                }
            },
        }
    }

    /// Decodes `width` bits at the start of `cursor`.
    ///
    /// The caller guarantees `width <= cursor.len()`, that integer widths lie
    /// in `1..=64` and that string widths are whole bytes.
    pub fn decode<'a>(&self, cursor: &Cursor<'a>, width: usize, env: &Bindings<'a>) -> Value<'a> {
        let data = cursor.data();
        let at = cursor.offset();

        match self {
            Routine::Bool => Value::Bool(cursor.is_set(0)),
            Routine::Byte { bits, sign } => {
                int_value(bits::read_bits_at(data, at, *bits), *bits, *sign)
            }
            Routine::Fixed {
                bits, sign, endian, ..
            } => int_value(bits::read_int_at(data, at, *bits, *endian), *bits, *sign),
            Routine::Referred {
                bits, sign, endian, ..
            } => {
                let endian = endian.eval(env);
                int_value(bits::read_int_at(data, at, *bits, endian), *bits, *sign)
            }
            Routine::Variable { sign, endian } => {
                let endian = endian.resolve(env);
                int_value(bits::read_int_at(data, at, width, endian), width, *sign)
            }
            Routine::String => Value::Bytes(take(cursor, width).to_bytes()),
            Routine::Bitstring => Value::Bits(take(cursor, width)),
        }
    }

    /// Encodes `value` into `out` and returns the number of bits written, or
    /// `None` when the value does not fit this routine.
    ///
    /// Integers are written in exactly `width` bits. Strings and bitstrings
    /// are written whole; the caller compares the returned count to `width`.
    pub fn encode(
        &self,
        out: &mut BitBuffer,
        value: &Value<'_>,
        width: usize,
        env: &Bindings<'_>,
    ) -> Option<usize> {
        match self {
            Routine::Bool => {
                let bit = match value.as_i128()? {
                    0 => false,
                    1 => true,
                    _ => return None,
                };
                out.push_bit(bit);
                Some(1)
            }
            Routine::Byte { bits, sign } => {
                out.push_bits(int_bits(value, *bits, *sign)?, *bits);
                Some(*bits)
            }
            Routine::Fixed {
                bits, sign, endian, ..
            } => {
                push_int(out, int_bits(value, *bits, *sign)?, *bits, *endian);
                Some(*bits)
            }
            Routine::Referred {
                bits, sign, endian, ..
            } => {
                push_int(out, int_bits(value, *bits, *sign)?, *bits, endian.eval(env));
                Some(*bits)
            }
            Routine::Variable { sign, endian } => {
                push_int(out, int_bits(value, width, *sign)?, width, endian.resolve(env));
                Some(width)
            }
            Routine::String => {
                let bytes = value.as_bytes()?;
                out.push_bytes(bytes);
                Some(bytes.len() * 8)
            }
            Routine::Bitstring => match value {
                Value::Bits(cursor) => {
                    out.push_cursor(cursor);
                    Some(cursor.len())
                }
                Value::Bytes(bytes) => {
                    out.push_bytes(bytes);
                    Some(bytes.len() * 8)
                }
                _ => None,
            },
        }
    }
}

fn take<'a>(cursor: &Cursor<'a>, width: usize) -> Cursor<'a> {
    cursor.take(width).unwrap_or_else(|| cursor.rest())
}

fn int_value<'a>(raw: u64, bits: usize, sign: Sign) -> Value<'a> {
    match sign {
        Sign::Signed => Value::I64(bits::sign_extend(raw, bits)),
        Sign::Unsigned => Value::U64(raw),
    }
}

/// Two's-complement bits of `value`, if it is in range for `bits` and `sign`.
fn int_bits(value: &Value<'_>, bits: usize, sign: Sign) -> Option<u64> {
    let v = value.as_i128()?;
    let (lo, hi) = match sign {
        Sign::Unsigned => (0, (1i128 << bits) - 1),
        Sign::Signed => (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1),
    };

    if (lo..=hi).contains(&v) {
        Some(bits::mask(v as u64, bits))
    } else {
        None
    }
}

fn push_int(out: &mut BitBuffer, raw: u64, bits: usize, endian: Endianness) {
    for (chunk, n) in bits::int_chunks(raw, bits, endian) {
        out.push_bits(chunk, n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(bits: Option<i64>, sign: Sign, endian: Endian) -> Routine {
        Routine::select(ValueType::Int, sign, &endian, bits)
    }

    #[test]
    fn test_select_by_width() {
        assert!(matches!(select(Some(1), Sign::Signed, Endian::Big), Routine::Bool));
        assert!(matches!(
            select(Some(8), Sign::Signed, Endian::Little),
            Routine::Byte { bits: 8, sign: Sign::Signed }
        ));
        assert!(matches!(
            select(Some(12), Sign::Unsigned, Endian::Little),
            Routine::Fixed {
                container: Container::U16,
                bits: 12,
                endian: Endianness::Little,
                ..
            }
        ));
        assert!(matches!(
            select(Some(17), Sign::Unsigned, Endian::Big),
            Routine::Fixed { container: Container::U32, .. }
        ));
        assert!(matches!(
            select(Some(64), Sign::Unsigned, Endian::Big),
            Routine::Fixed { container: Container::U64, .. }
        ));
        assert!(matches!(
            select(None, Sign::Unsigned, Endian::Big),
            Routine::Variable { .. }
        ));
    }

    #[test]
    fn test_select_referred() {
        let endian = Endian::Referred(EndianExpr::new(|_| Endianness::Little));
        assert!(matches!(
            select(Some(32), Sign::Unsigned, endian.clone()),
            Routine::Referred { container: Container::U32, .. }
        ));
        // Byte-sized fields ignore byte order.
        assert!(matches!(
            select(Some(8), Sign::Unsigned, endian),
            Routine::Byte { .. }
        ));
    }

    #[test]
    fn test_select_native() {
        let routine = select(Some(16), Sign::Unsigned, Endian::Native);
        assert!(matches!(
            routine,
            Routine::Fixed { endian, .. } if endian == Endianness::native()
        ));
    }

    #[test]
    fn test_decode_signed_byte() {
        let data = [0b1111_0000];
        let cursor = Cursor::new(&data);
        let routine = Routine::Byte { bits: 4, sign: Sign::Signed };
        assert_eq!(routine.decode(&cursor, 4, &Bindings::new()), Value::I64(-1));
    }

    #[test]
    fn test_decode_referred_endianness() {
        let data = [0x01, 0x02];
        let cursor = Cursor::new(&data);
        let routine = select(
            Some(16),
            Sign::Unsigned,
            Endian::Referred(EndianExpr::new(|env| {
                if env.contains_key("le") {
                    Endianness::Little
                } else {
                    Endianness::Big
                }
            })),
        );

        let mut env = Bindings::new();
        assert_eq!(routine.decode(&cursor, 16, &env), Value::U64(0x0102));
        env.insert("le".to_string(), Value::Bool(true));
        assert_eq!(routine.decode(&cursor, 16, &env), Value::U64(0x0201));
    }

    #[test]
    fn test_decode_variable_width() {
        let data = [0xAB, 0xCD];
        let cursor = Cursor::new(&data);
        let routine = select(None, Sign::Unsigned, Endian::Big);
        assert_eq!(routine.decode(&cursor, 12, &Bindings::new()), Value::U64(0xABC));
    }

    #[test]
    fn test_decode_string_and_bitstring() {
        let data = *b"ABC";
        let cursor = Cursor::new(&data);
        let env = Bindings::new();

        assert_eq!(
            Routine::String.decode(&cursor, 16, &env),
            Value::Bytes(b"AB".to_vec())
        );
        let Value::Bits(bits) = Routine::Bitstring.decode(&cursor, 12, &env) else {
            panic!("expected a bitstring");
        };
        assert_eq!((bits.offset(), bits.len()), (0, 12));
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        let env = Bindings::new();
        let mut out = BitBuffer::new();
        let routine = Routine::Byte { bits: 4, sign: Sign::Unsigned };
        assert_eq!(routine.encode(&mut out, &Value::U64(16), 4, &env), None);
        assert_eq!(routine.encode(&mut out, &Value::I64(-1), 4, &env), None);

        let signed = Routine::Byte { bits: 4, sign: Sign::Signed };
        assert_eq!(signed.encode(&mut out, &Value::I64(-8), 4, &env), Some(4));
        assert_eq!(signed.encode(&mut out, &Value::I64(8), 4, &env), None);
    }

    #[test]
    fn test_encode_bool() {
        let env = Bindings::new();
        let mut out = BitBuffer::new();
        assert_eq!(Routine::Bool.encode(&mut out, &Value::Bool(true), 1, &env), Some(1));
        assert_eq!(Routine::Bool.encode(&mut out, &Value::U64(0), 1, &env), Some(1));
        assert_eq!(Routine::Bool.encode(&mut out, &Value::U64(2), 1, &env), None);
        assert_eq!(out.as_bytes(), &[0b1000_0000]);
    }

    #[test]
    fn test_encode_little_endian_mirrors_decode() {
        let env = Bindings::new();
        let routine = select(Some(12), Sign::Unsigned, Endian::Little);
        let mut out = BitBuffer::new();
        routine.encode(&mut out, &Value::U64(0xCAB), 12, &env).unwrap();

        let cursor = out.as_cursor();
        assert_eq!(routine.decode(&cursor, 12, &env), Value::U64(0xCAB));
    }
}
