//! Expressions carried by fields: lengths, and the caller-supplied closures
//! behind `bind`, `check`, `map` and `endian(..)`.
//!
//! Closures are generic over the lifetime of the matched buffer so that one
//! field list can be reused against any number of buffers.

use std::fmt;
use std::sync::Arc;

use crate::{
    errors::SpecError,
    qualifier::Endianness,
    value::{Bindings, Value},
};

type ValueFn = dyn for<'b> Fn(&Bindings<'b>) -> Value<'b> + Send + Sync;
type CheckFn = dyn for<'b> Fn(&Value<'b>, &Bindings<'b>) -> bool + Send + Sync;
type EndianFn = dyn for<'b> Fn(&Bindings<'b>) -> Endianness + Send + Sync;
type MapFn = dyn for<'b> Fn(Value<'b>) -> Value<'b> + Send + Sync;
type LengthFn = dyn for<'b> Fn(&Bindings<'b>) -> i64 + Send + Sync;

/// Produces a value from the current bindings (`bind(..)`, constructor values).
#[derive(Clone)]
pub struct ValueExpr(Arc<ValueFn>);

impl ValueExpr {
    pub fn new(f: impl for<'b> Fn(&Bindings<'b>) -> Value<'b> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn eval<'b>(&self, env: &Bindings<'b>) -> Value<'b> {
        (self.0)(env)
    }
}

/// Guard over an extracted value (`check(..)`).
#[derive(Clone)]
pub struct CheckExpr(Arc<CheckFn>);

impl CheckExpr {
    pub fn new(
        f: impl for<'b> Fn(&Value<'b>, &Bindings<'b>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    pub fn eval<'b>(&self, value: &Value<'b>, env: &Bindings<'b>) -> bool {
        (self.0)(value, env)
    }
}

/// Endianness decided at run time (`endian(..)`).
#[derive(Clone)]
pub struct EndianExpr(Arc<EndianFn>);

impl EndianExpr {
    pub fn new(f: impl for<'b> Fn(&Bindings<'b>) -> Endianness + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn eval(&self, env: &Bindings<'_>) -> Endianness {
        (self.0)(env)
    }
}

/// Transforms an extracted value before it is bound (`map(..)`).
#[derive(Clone)]
pub struct MapExpr(Arc<MapFn>);

impl MapExpr {
    pub fn new(f: impl for<'b> Fn(Value<'b>) -> Value<'b> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn eval<'b>(&self, value: Value<'b>) -> Value<'b> {
        (self.0)(value)
    }
}

macro_rules! opaque_debug {
    ($($ty:ident),*) => {
        $(impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($ty), "(..)"))
            }
        })*
    };
}

opaque_debug!(ValueExpr, CheckExpr, EndianExpr, MapExpr);

/// Operators allowed in length expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    /// Arithmetic shift right.
    Shr,
    /// Logical shift right.
    Lsr,
}

/// Applies `op`, returning `None` on overflow, division by zero or an
/// out-of-range shift.
pub fn apply_binary(op: BinaryOp, l: i64, r: i64) -> Option<i64> {
    let shift = || u32::try_from(r).ok().filter(|s| *s < 64);

    match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Div => l.checked_div(r),
        BinaryOp::Mod => l.checked_rem(r),
        BinaryOp::And => Some(l & r),
        BinaryOp::Or => Some(l | r),
        BinaryOp::Xor => Some(l ^ r),
        BinaryOp::Shl => shift().map(|s| l << s),
        BinaryOp::Shr => shift().map(|s| l >> s),
        BinaryOp::Lsr => shift().map(|s| ((l as u64) >> s) as i64),
    }
}

/// Bit length of a field.
#[derive(Clone)]
pub enum LengthExpr {
    Const(i64),
    /// Integer bound by an earlier field of the same case.
    Var(String),
    Binary {
        op: BinaryOp,
        lhs: Box<LengthExpr>,
        rhs: Box<LengthExpr>,
    },
    /// Computed by the caller at run time.
    Dynamic(Arc<LengthFn>),
}

impl LengthExpr {
    pub fn var(name: impl Into<String>) -> Self {
        LengthExpr::Var(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: LengthExpr, rhs: LengthExpr) -> Self {
        LengthExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn dynamic(f: impl for<'b> Fn(&Bindings<'b>) -> i64 + Send + Sync + 'static) -> Self {
        LengthExpr::Dynamic(Arc::new(f))
    }

    /// Constant-folds the expression. `None` means the length is only known
    /// at run time, not that it is invalid.
    pub fn evaluate(&self) -> Option<i64> {
        match self {
            LengthExpr::Const(n) => Some(*n),
            LengthExpr::Binary { op, lhs, rhs } => {
                apply_binary(*op, lhs.evaluate()?, rhs.evaluate()?)
            }
            LengthExpr::Var(_) | LengthExpr::Dynamic(_) => None,
        }
    }

    /// Evaluates the expression against the bindings of the current case.
    pub fn eval(&self, env: &Bindings<'_>) -> Result<i64, SpecError> {
        match self {
            LengthExpr::Const(n) => Ok(*n),
            LengthExpr::Var(name) => {
                let value = env
                    .get(name)
                    .and_then(Value::as_i128)
                    .ok_or_else(|| SpecError::UnboundLength(name.clone()))?;
                i64::try_from(value).map_err(|_| SpecError::LengthArithmetic)
            }
            LengthExpr::Binary { op, lhs, rhs } => {
                apply_binary(*op, lhs.eval(env)?, rhs.eval(env)?)
                    .ok_or(SpecError::LengthArithmetic)
            }
            LengthExpr::Dynamic(f) => Ok(f(env)),
        }
    }
}

impl From<i64> for LengthExpr {
    fn from(value: i64) -> Self {
        LengthExpr::Const(value)
    }
}

impl fmt::Debug for LengthExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthExpr::Const(n) => write!(f, "{n}"),
            LengthExpr::Var(name) => f.write_str(name),
            LengthExpr::Binary { op, lhs, rhs } => write!(f, "({lhs:?} {op:?} {rhs:?})"),
            LengthExpr::Dynamic(_) => f.write_str("<dynamic>"),
        }
    }
}
