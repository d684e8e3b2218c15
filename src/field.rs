//! Field definitions for matching ([Field]) and construction ([BuildField]).

use crate::{
    errors::QualifierError,
    expr::{LengthExpr, ValueExpr},
    qualifier::{Qualifier, Qualifiers},
    value::{Bindings, Literal, Value},
};

/// What an extracted value binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Bind the value to a name visible to later fields and the case body.
    Bind(String),
    /// Skip the bits.
    Wildcard,
    /// The value must equal the literal for the case to match.
    Literal(Literal),
}

/// One field of a match case: `pattern : length : qualifiers`.
#[derive(Debug, Clone)]
pub struct Field {
    pub pattern: Pattern,
    pub length: LengthExpr,
    /// Default-filled qualifiers.
    pub qualifiers: Qualifiers,
}

impl Field {
    pub fn new(pattern: Pattern, length: LengthExpr, qualifiers: Qualifiers) -> Self {
        Field {
            pattern,
            length,
            qualifiers: qualifiers.set_defaults(),
        }
    }

    /// Unsigned big-endian integer bound to `name`.
    pub fn bind(name: impl Into<String>, length: i64) -> Self {
        Self::new(
            Pattern::Bind(name.into()),
            LengthExpr::Const(length),
            Qualifiers::empty(),
        )
    }

    /// `_ : length`.
    pub fn skip(length: i64) -> Self {
        Self::new(Pattern::Wildcard, LengthExpr::Const(length), Qualifiers::empty())
    }

    pub fn literal(literal: Literal, length: i64) -> Self {
        Self::new(
            Pattern::Literal(literal),
            LengthExpr::Const(length),
            Qualifiers::empty(),
        )
    }

    /// Replaces the qualifiers with `tokens`, resolved and default-filled.
    pub fn qualified<I>(mut self, tokens: I) -> Result<Self, QualifierError>
    where
        I: IntoIterator<Item = Qualifier>,
    {
        self.qualifiers = Qualifiers::resolve(tokens)?.set_defaults();
        Ok(self)
    }

    pub fn with_length(mut self, length: LengthExpr) -> Self {
        self.length = length;
        self
    }
}

/// Source of a constructor field's value.
#[derive(Debug, Clone)]
pub enum BuildValue {
    Literal(Literal),
    /// Looked up in the bindings passed to the constructor.
    Var(String),
    Expr(ValueExpr),
}

impl BuildValue {
    pub fn eval<'b>(&self, env: &Bindings<'b>) -> Option<Value<'b>> {
        match self {
            BuildValue::Literal(literal) => Some(literal.to_value()),
            BuildValue::Var(name) => env.get(name).cloned(),
            BuildValue::Expr(expr) => Some(expr.eval(env)),
        }
    }
}

/// One field of a constructor: `value : length : qualifiers`.
#[derive(Debug, Clone)]
pub struct BuildField {
    pub value: BuildValue,
    pub length: LengthExpr,
    pub qualifiers: Qualifiers,
}

impl BuildField {
    pub fn new(value: BuildValue, length: LengthExpr, qualifiers: Qualifiers) -> Self {
        BuildField {
            value,
            length,
            qualifiers: qualifiers.set_defaults(),
        }
    }

    pub fn literal(literal: Literal, length: i64) -> Self {
        Self::new(
            BuildValue::Literal(literal),
            LengthExpr::Const(length),
            Qualifiers::empty(),
        )
    }

    pub fn var(name: impl Into<String>, length: i64) -> Self {
        Self::new(
            BuildValue::Var(name.into()),
            LengthExpr::Const(length),
            Qualifiers::empty(),
        )
    }

    pub fn expr(
        f: impl for<'b> Fn(&Bindings<'b>) -> Value<'b> + Send + Sync + 'static,
        length: i64,
    ) -> Self {
        Self::new(
            BuildValue::Expr(ValueExpr::new(f)),
            LengthExpr::Const(length),
            Qualifiers::empty(),
        )
    }

    pub fn qualified<I>(mut self, tokens: I) -> Result<Self, QualifierError>
    where
        I: IntoIterator<Item = Qualifier>,
    {
        self.qualifiers = Qualifiers::resolve(tokens)?.set_defaults();
        Ok(self)
    }

    pub fn with_length(mut self, length: LengthExpr) -> Self {
        self.length = length;
        self
    }
}
