//! Case selection: threads a cursor through each case's fields and evaluates
//! the body of the first case that matches.

use std::panic::Location;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    compiled::CompiledField,
    cursor::Cursor,
    errors::{MatchError, SpecError},
    field::{Field, Pattern},
    value::{Bindings, Value},
};

type BodyFn<R> = dyn for<'b> Fn(&Bindings<'b>) -> R + Send + Sync;

/// One field list and the expression evaluated when it matches.
pub struct Case<R> {
    pub fields: Vec<Field>,
    body: Arc<BodyFn<R>>,
}

impl<R> Case<R> {
    pub fn new(
        fields: Vec<Field>,
        body: impl for<'b> Fn(&Bindings<'b>) -> R + Send + Sync + 'static,
    ) -> Self {
        Case {
            fields,
            body: Arc::new(body),
        }
    }
}

impl<R> Clone for Case<R> {
    fn clone(&self) -> Self {
        Case {
            fields: self.fields.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

/// Result of trying one case against a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome<'a> {
    Matched(Bindings<'a>),
    /// A field did not fit or a guard failed; try the next case.
    NotMatched,
}

struct CompiledCase<R> {
    fields: Vec<CompiledField>,
    body: Arc<BodyFn<R>>,
}

/// A validated list of cases, reusable across buffers.
pub struct Matcher<R> {
    cases: Vec<CompiledCase<R>>,
    location: &'static Location<'static>,
}

impl<R> Matcher<R> {
    /// Validates every field of every case. Specification errors surface here,
    /// before any buffer is looked at.
    #[track_caller]
    pub fn compile(cases: &[Case<R>]) -> Result<Self, SpecError> {
        let location = Location::caller();
        let mut compiled = Vec::with_capacity(cases.len());

        for case in cases {
            compiled.push(CompiledCase {
                fields: compile_fields(&case.fields)?,
                body: Arc::clone(&case.body),
            });
        }

        Ok(Matcher {
            cases: compiled,
            location,
        })
    }

    /// Index and bindings of the first matching case, if any.
    pub fn select<'a>(&self, cursor: Cursor<'a>) -> Result<Option<(usize, Bindings<'a>)>, SpecError> {
        for (index, case) in self.cases.iter().enumerate() {
            match run_case(cursor, &case.fields)? {
                CaseOutcome::Matched(bindings) => {
                    debug!(case = index, "case matched");
                    return Ok(Some((index, bindings)));
                }
                CaseOutcome::NotMatched => continue,
            }
        }

        Ok(None)
    }

    /// Evaluates the body of the first matching case.
    pub fn match_cursor(&self, cursor: Cursor<'_>) -> Result<R, MatchError> {
        match self.select(cursor)? {
            Some((index, bindings)) => Ok((self.cases[index].body)(&bindings)),
            None => {
                debug!(location = %self.location, "no case matched");
                Err(MatchError::Exhausted {
                    location: self.location.to_string(),
                })
            }
        }
    }
}

/// Matches `cursor` against `cases` in order and evaluates the body of the
/// first case whose fields all extract and whose guards all pass.
#[track_caller]
pub fn match_cursor<R>(cursor: Cursor<'_>, cases: &[Case<R>]) -> Result<R, MatchError> {
    Matcher::compile(cases)?.match_cursor(cursor)
}

/// Index and bindings of the first case in `cases` that matches `cursor`.
/// Exhaustion is `Ok(None)`, left to the caller.
pub fn select<'a, R>(
    cursor: Cursor<'a>,
    cases: &[Case<R>],
) -> Result<Option<(usize, Bindings<'a>)>, SpecError> {
    Matcher::compile(cases)?.select(cursor)
}

/// Tries a single field list against `cursor`.
pub fn try_case<'a>(cursor: Cursor<'a>, fields: &[Field]) -> Result<CaseOutcome<'a>, SpecError> {
    run_case(cursor, &compile_fields(fields)?)
}

fn compile_fields(fields: &[Field]) -> Result<Vec<CompiledField>, SpecError> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| CompiledField::compile(index, field))
        .collect()
}

fn run_case<'a>(mut cursor: Cursor<'a>, fields: &[CompiledField]) -> Result<CaseOutcome<'a>, SpecError> {
    let start = cursor.offset();
    let mut env = Bindings::new();

    for (index, field) in fields.iter().enumerate() {
        let Some(width) = field.width(&cursor, &env)? else {
            debug!(field = index, remaining = cursor.len(), "field does not fit");
            return Ok(CaseOutcome::NotMatched);
        };
        trace!(field = index, offset = cursor.offset(), width, routine = ?field.routine, "extract");

        if let Some(name) = &field.save_offset_to {
            env.insert(name.clone(), Value::U64((cursor.offset() - start) as u64));
        }

        let mut value = match &field.bind {
            Some(bind) => bind.eval(&env),
            None => field.routine.decode(&cursor, width, &env),
        };
        if let Some(map) = &field.map {
            value = map.eval(value);
        }

        match &field.pattern {
            Pattern::Bind(name) => {
                env.insert(name.clone(), value.clone());
            }
            Pattern::Wildcard => {}
            Pattern::Literal(literal) => {
                if !literal.matches(&value) {
                    debug!(field = index, %literal, %value, "literal mismatch");
                    return Ok(CaseOutcome::NotMatched);
                }
            }
        }

        if let Some(check) = &field.check {
            if !check.eval(&value, &env) {
                debug!(field = index, %value, "check failed");
                return Ok(CaseOutcome::NotMatched);
            }
        }

        // `width <= cursor.len()` was checked above.
        cursor = cursor.advance(width).unwrap_or_else(|| cursor.rest());
    }

    Ok(CaseOutcome::Matched(env))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::LengthExpr,
        length::REST,
        qualifier::{Endianness, Qualifier},
        value::Literal,
    };

    fn get<'a>(env: &Bindings<'a>, name: &str) -> Value<'a> {
        env.get(name).cloned().expect("bound")
    }

    #[test]
    fn test_bool_byte_and_short() {
        // 1 | 01 | 0000000000000001, padded to three bytes.
        let data = [0b1010_0000, 0b0000_0000, 0b0010_0000];
        let cursor = Cursor::sub(&data, 0, 19).unwrap();
        let fields = vec![
            Field::bind("a", 1),
            Field::bind("b", 2),
            Field::bind("x", 16).qualified([Qualifier::BigEndian]).unwrap(),
        ];

        let CaseOutcome::Matched(env) = try_case(cursor, &fields).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(get(&env, "a"), Value::Bool(true));
        assert_eq!(get(&env, "b"), Value::U64(1));
        assert_eq!(get(&env, "x"), Value::U64(1));
    }

    #[test]
    fn test_first_matching_case_wins() {
        let data = [0x02, 0xFF];
        let cases = vec![
            Case::new(vec![Field::literal(Literal::Int(1), 8), Field::skip(8)], |_| "one"),
            Case::new(vec![Field::literal(Literal::Int(2), 8), Field::skip(8)], |_| "two"),
            Case::new(vec![Field::skip(16)], |_| "any"),
        ];

        assert_eq!(match_cursor(Cursor::new(&data), &cases), Ok("two"));

        let reordered = vec![cases[2].clone(), cases[1].clone()];
        assert_eq!(match_cursor(Cursor::new(&data), &reordered), Ok("any"));
    }

    #[test]
    fn test_too_short_is_not_matched() {
        let data = [0xFF];
        let fields = vec![Field::bind("x", 16)];
        assert_eq!(try_case(Cursor::new(&data), &fields), Ok(CaseOutcome::NotMatched));
    }

    #[test]
    fn test_exhaustion_reports_location() {
        let data = [0xFF];
        let cases = vec![Case::new(vec![Field::bind("x", 16)], |_| ())];
        let err = match_cursor(Cursor::new(&data), &cases).unwrap_err();
        let MatchError::Exhausted { location } = err else {
            panic!("expected exhaustion");
        };
        assert!(location.contains("matcher.rs"));
    }

    #[test]
    fn test_spec_error_is_not_a_non_match() {
        let data = [0xFF; 16];
        let cases = vec![
            Case::new(vec![Field::bind("x", 8)], |_| 1),
            Case::new(vec![Field::bind("y", 65)], |_| 2),
        ];
        assert_eq!(
            match_cursor(Cursor::new(&data), &cases),
            Err(MatchError::Spec(SpecError::InvalidIntLength(65)))
        );
    }

    #[test]
    fn test_check_guard() {
        let data = [0x07];
        let guarded = Field::bind("v", 8)
            .qualified([Qualifier::check(|v, _| v.as_i128() == Some(8))])
            .unwrap();
        let cases = vec![
            Case::new(vec![guarded], |_| "eight"),
            Case::new(vec![Field::bind("v", 8)], |env| {
                if env.get("v") == Some(&Value::U64(7)) { "seven" } else { "other" }
            }),
        ];
        assert_eq!(match_cursor(Cursor::new(&data), &cases), Ok("seven"));
    }

    #[test]
    fn test_save_offset_to() {
        let data = [0u8; 4];
        let fields = vec![
            Field::skip(3),
            Field::bind("a", 5).qualified([Qualifier::save_offset_to("off_a")]).unwrap(),
            Field::bind("b", 16).qualified([Qualifier::save_offset_to("off_b")]).unwrap(),
        ];
        let cursor = Cursor::new(&data).advance(8).unwrap();
        let CaseOutcome::Matched(env) = try_case(cursor, &fields).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(get(&env, "off_a"), Value::U64(3));
        assert_eq!(get(&env, "off_b"), Value::U64(8));
    }

    #[test]
    fn test_bind_replaces_extraction_but_advances() {
        let data = [0xAA, 0xBB];
        let fields = vec![
            Field::bind("a", 8)
                .qualified([Qualifier::bind(|_| Value::U64(42))])
                .unwrap(),
            Field::bind("b", 8),
        ];
        let CaseOutcome::Matched(env) = try_case(Cursor::new(&data), &fields).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(get(&env, "a"), Value::U64(42));
        assert_eq!(get(&env, "b"), Value::U64(0xBB));
    }

    #[test]
    fn test_map_transforms_value() {
        let data = [0x05];
        let fields = vec![
            Field::bind("a", 8)
                .qualified([Qualifier::map(|v| match v {
                    Value::U64(n) => Value::U64(n * 10),
                    other => other,
                })])
                .unwrap(),
        ];
        let CaseOutcome::Matched(env) = try_case(Cursor::new(&data), &fields).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(get(&env, "a"), Value::U64(50));
    }

    #[test]
    fn test_dynamic_length_from_earlier_field() {
        let data = [0x02, b'h', b'i', 0xFF];
        let fields = vec![
            Field::bind("len", 8),
            Field::bind("s", 0)
                .qualified([Qualifier::String])
                .unwrap()
                .with_length(LengthExpr::binary(
                    crate::expr::BinaryOp::Mul,
                    LengthExpr::var("len"),
                    LengthExpr::Const(8),
                )),
            Field::bind("tail", REST).qualified([Qualifier::Bitstring]).unwrap(),
        ];
        let CaseOutcome::Matched(env) = try_case(Cursor::new(&data), &fields).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(get(&env, "s"), Value::Bytes(b"hi".to_vec()));
        let Value::Bits(tail) = get(&env, "tail") else {
            panic!("expected a bitstring");
        };
        assert_eq!((tail.offset(), tail.len()), (24, 8));
    }

    #[test]
    fn test_dynamic_int_width_out_of_range_tries_next_case() {
        let data = [70, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let wide = Field::bind("v", 0).with_length(LengthExpr::var("n"));
        let cases = vec![
            Case::new(vec![Field::bind("n", 8), wide], |_| "wide"),
            Case::new(vec![Field::bind("n", 8)], |_| "fallback"),
        ];
        assert_eq!(match_cursor(Cursor::new(&data), &cases), Ok("fallback"));
    }

    #[test]
    fn test_length_division_by_zero_tries_next_case() {
        let data = [0, 0xAB];
        let ratio = Field::bind("v", 0).with_length(LengthExpr::binary(
            crate::expr::BinaryOp::Div,
            LengthExpr::Const(8),
            LengthExpr::var("n"),
        ));
        let cases = vec![
            Case::new(vec![Field::bind("n", 8), ratio], |_| "ratio"),
            Case::new(vec![Field::bind("n", 8), Field::skip(8)], |_| "fallback"),
        ];
        assert_eq!(match_cursor(Cursor::new(&data), &cases), Ok("fallback"));
    }

    #[test]
    fn test_length_outside_i64_tries_next_case() {
        let data = [0xFF; 10];
        let sized = Field::bind("s", 0)
            .qualified([Qualifier::Bitstring])
            .unwrap()
            .with_length(LengthExpr::var("n"));
        let cases = vec![
            Case::new(vec![Field::bind("n", 64), sized], |_| "sized"),
            Case::new(vec![Field::bind("n", 64)], |_| "fallback"),
        ];
        assert_eq!(match_cursor(Cursor::new(&data), &cases), Ok("fallback"));
    }

    #[test]
    fn test_referred_endian_from_earlier_field() {
        let data = [0x01, 0x34, 0x12];
        let fields = vec![
            Field::bind("le", 8),
            Field::bind("v", 16)
                .qualified([Qualifier::endian(|env| {
                    if env.get("le") == Some(&Value::U64(1)) {
                        Endianness::Little
                    } else {
                        Endianness::Big
                    }
                })])
                .unwrap(),
        ];
        let CaseOutcome::Matched(env) = try_case(Cursor::new(&data), &fields).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(get(&env, "v"), Value::U64(0x1234));
    }

    #[test]
    fn test_matcher_is_reusable() {
        let cases = vec![Case::new(vec![Field::bind("x", 8)], |env| {
            env.get("x").and_then(Value::as_i128).unwrap_or(-1)
        })];
        let matcher = Matcher::compile(&cases).unwrap();

        let first = [1u8];
        let second = [2u8];
        assert_eq!(matcher.match_cursor(Cursor::new(&first)), Ok(1));
        assert_eq!(matcher.match_cursor(Cursor::new(&second)), Ok(2));
    }
}
