//! Textual field specifications.
//!
//! ```text
//! field      := pattern ":" length [ ":" qualifiers ]
//! qualifiers := qualifier ( "," qualifier )*
//! case_body  := field ( ";" field )*
//! ```
//!
//! Lengths are integer arithmetic over literals and names bound by earlier
//! fields. Expression-valued qualifiers (`endian(..)`, `bind(..)`,
//! `check(..)`, `map(..)`) name a closure registered in [Externs].

use std::collections::HashMap;

use crate::{
    errors::{QualifierError, SpecError},
    expr::{BinaryOp, CheckExpr, EndianExpr, LengthExpr, MapExpr, ValueExpr},
    field::{BuildField, BuildValue, Field, Pattern},
    qualifier::{Endianness, Qualifier, Qualifiers},
    value::{Bindings, Literal, Value},
};

/// Named closures that textual qualifiers can refer to.
#[derive(Debug, Clone, Default)]
pub struct Externs {
    endians: HashMap<String, EndianExpr>,
    values: HashMap<String, ValueExpr>,
    checks: HashMap<String, CheckExpr>,
    maps: HashMap<String, MapExpr>,
}

impl Externs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endian(
        mut self,
        name: impl Into<String>,
        f: impl for<'b> Fn(&Bindings<'b>) -> Endianness + Send + Sync + 'static,
    ) -> Self {
        self.endians.insert(name.into(), EndianExpr::new(f));
        self
    }

    pub fn value(
        mut self,
        name: impl Into<String>,
        f: impl for<'b> Fn(&Bindings<'b>) -> Value<'b> + Send + Sync + 'static,
    ) -> Self {
        self.values.insert(name.into(), ValueExpr::new(f));
        self
    }

    pub fn check(
        mut self,
        name: impl Into<String>,
        f: impl for<'b> Fn(&Value<'b>, &Bindings<'b>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.checks.insert(name.into(), CheckExpr::new(f));
        self
    }

    pub fn map(
        mut self,
        name: impl Into<String>,
        f: impl for<'b> Fn(Value<'b>) -> Value<'b> + Send + Sync + 'static,
    ) -> Self {
        self.maps.insert(name.into(), MapExpr::new(f));
        self
    }
}

/// Parses a `;`-separated list of match fields.
pub fn parse_fields(text: &str, externs: &Externs) -> Result<Vec<Field>, SpecError> {
    let mut parser = Parser::new(text)?;
    let mut fields = Vec::new();

    while !parser.at_end() {
        let pattern = parser.pattern()?;
        let (length, qualifiers) = parser.field_tail(externs)?;
        fields.push(Field::new(pattern, length, qualifiers));
        if !parser.eat(";") {
            break;
        }
    }

    parser.expect_end()?;
    Ok(fields)
}

/// Parses a `;`-separated list of constructor fields. Names in value
/// position are looked up in the bindings passed to the constructor.
pub fn parse_build_fields(text: &str, externs: &Externs) -> Result<Vec<BuildField>, SpecError> {
    let mut parser = Parser::new(text)?;
    let mut fields = Vec::new();

    while !parser.at_end() {
        let position = parser.position();
        let value = match parser.pattern()? {
            Pattern::Bind(name) => BuildValue::Var(name),
            Pattern::Literal(literal) => BuildValue::Literal(literal),
            Pattern::Wildcard => return Err(parse_error(position, "`_` has no value to construct")),
        };
        let (length, qualifiers) = parser.field_tail(externs)?;
        fields.push(BuildField::new(value, length, qualifiers));
        if !parser.eat(";") {
            break;
        }
    }

    parser.expect_end()?;
    Ok(fields)
}

/// Parses a comma-separated qualifier list.
pub fn parse_qualifiers(text: &str, externs: &Externs) -> Result<Qualifiers, SpecError> {
    let mut parser = Parser::new(text)?;
    let qualifiers = parser.qualifiers(externs)?;
    parser.expect_end()?;
    Ok(qualifiers)
}

/// Parses a single pattern: a name, `_`, or a literal.
pub fn parse_pattern(text: &str) -> Result<Pattern, SpecError> {
    let mut parser = Parser::new(text)?;
    let pattern = parser.pattern()?;
    parser.expect_end()?;
    Ok(pattern)
}

/// Parses a length expression.
pub fn parse_length(text: &str) -> Result<LengthExpr, SpecError> {
    let mut parser = Parser::new(text)?;
    let length = parser.expr()?;
    parser.expect_end()?;
    Ok(length)
}

fn parse_error(position: usize, message: impl Into<String>) -> SpecError {
    SpecError::Parse {
        position,
        message: message.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Str(Vec<u8>),
    Punct(&'static str),
}

const PUNCTS: [&str; 17] = [
    ">>>", "<<", ">>", ":", ";", ",", "(", ")", "+", "-", "*", "/", "%", "&", "|", "^", "_",
];

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, SpecError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        if c.is_ascii_alphabetic() || (c == b'_' && bytes.get(i + 1).is_some_and(is_ident_byte)) {
            while bytes.get(i).is_some_and(is_ident_byte) {
                i += 1;
            }
            tokens.push((start, Token::Ident(text[start..i].to_string())));
        } else if c.is_ascii_digit() {
            while bytes.get(i).is_some_and(is_ident_byte) {
                i += 1;
            }
            let n = parse_int(&text[start..i])
                .ok_or_else(|| parse_error(start, format!("invalid number `{}`", &text[start..i])))?;
            tokens.push((start, Token::Int(n)));
        } else if c == b'"' {
            i += 1;
            let mut value = Vec::new();
            loop {
                match bytes.get(i) {
                    None => return Err(parse_error(start, "unterminated string")),
                    Some(b'"') => break,
                    Some(b'\\') => {
                        let escaped = match bytes.get(i + 1) {
                            Some(b'n') => b'\n',
                            Some(b't') => b'\t',
                            Some(b'0') => 0,
                            Some(&b) => b,
                            None => return Err(parse_error(start, "unterminated string")),
                        };
                        value.push(escaped);
                        i += 2;
                    }
                    Some(&b) => {
                        value.push(b);
                        i += 1;
                    }
                }
            }
            i += 1;
            tokens.push((start, Token::Str(value)));
        } else {
            let punct = PUNCTS
                .iter()
                .find(|p| text[i..].starts_with(**p))
                .ok_or_else(|| parse_error(i, format!("unexpected character `{}`", c as char)))?;
            i += punct.len();
            tokens.push((start, Token::Punct(*punct)));
        }
    }

    Ok(tokens)
}

fn is_ident_byte(b: &u8) -> bool {
    b.is_ascii_alphanumeric() || *b == b'_'
}

fn parse_int(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let (radix, body) = match digits.get(..2) {
        Some("0x") | Some("0X") => (16, &digits[2..]),
        Some("0b") | Some("0B") => (2, &digits[2..]),
        Some("0o") | Some("0O") => (8, &digits[2..]),
        _ => (10, digits.as_str()),
    };
    i64::from_str_radix(body, radix).ok()
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, SpecError> {
        Ok(Parser {
            tokens: tokenize(text)?,
            pos: 0,
            len: text.len(),
        })
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.len, |(p, _)| *p)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), SpecError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(parse_error(self.position(), format!("expected `{punct}`")))
        }
    }

    fn expect_end(&self) -> Result<(), SpecError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(parse_error(self.position(), "unexpected trailing input"))
        }
    }

    fn pattern(&mut self) -> Result<Pattern, SpecError> {
        let position = self.position();
        match self.next() {
            Some(Token::Punct("_")) => Ok(Pattern::Wildcard),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Pattern::Literal(Literal::Bool(true)),
                "false" => Pattern::Literal(Literal::Bool(false)),
                _ => Pattern::Bind(name),
            }),
            Some(Token::Int(n)) => Ok(Pattern::Literal(Literal::Int(n))),
            Some(Token::Punct("-")) => match self.next() {
                Some(Token::Int(n)) => Ok(Pattern::Literal(Literal::Int(-n))),
                _ => Err(parse_error(position, "expected a number after `-`")),
            },
            Some(Token::Str(bytes)) => Ok(Pattern::Literal(Literal::Bytes(bytes))),
            _ => Err(parse_error(position, "expected a pattern")),
        }
    }

    fn field_tail(&mut self, externs: &Externs) -> Result<(LengthExpr, Qualifiers), SpecError> {
        self.expect(":")?;
        let length = self.expr()?;
        let qualifiers = if self.eat(":") {
            self.qualifiers(externs)?
        } else {
            Qualifiers::empty()
        };
        Ok((length, qualifiers))
    }

    fn qualifiers(&mut self, externs: &Externs) -> Result<Qualifiers, SpecError> {
        let mut tokens = vec![self.qualifier(externs)?];
        while self.eat(",") {
            tokens.push(self.qualifier(externs)?);
        }
        Ok(Qualifiers::resolve(tokens)?)
    }

    fn qualifier(&mut self, externs: &Externs) -> Result<Qualifier, SpecError> {
        let position = self.position();
        let Some(Token::Ident(word)) = self.next() else {
            return Err(parse_error(position, "expected a qualifier"));
        };

        if !self.eat("(") {
            return Ok(word.parse::<Qualifier>()?);
        }

        let arg_position = self.position();
        let Some(Token::Ident(arg)) = self.next() else {
            return Err(parse_error(arg_position, "expected a name"));
        };
        self.expect(")")?;

        let invalid = || QualifierError::Invalid(format!("{word}({arg})"));
        let qualifier = match word.as_str() {
            "endian" => match arg.as_str() {
                "littleendian" => Qualifier::LittleEndian,
                "bigendian" => Qualifier::BigEndian,
                "nativeendian" => Qualifier::NativeEndian,
                _ => Qualifier::Endian(externs.endians.get(&arg).cloned().ok_or_else(invalid)?),
            },
            "bind" => Qualifier::Bind(externs.values.get(&arg).cloned().ok_or_else(invalid)?),
            "check" => Qualifier::Check(externs.checks.get(&arg).cloned().ok_or_else(invalid)?),
            "map" => Qualifier::Map(externs.maps.get(&arg).cloned().ok_or_else(invalid)?),
            "save_offset_to" => Qualifier::SaveOffsetTo(arg.clone()),
            _ => return Err(invalid().into()),
        };

        Ok(qualifier)
    }

    fn expr(&mut self) -> Result<LengthExpr, SpecError> {
        self.binary_level(0)
    }

    /// Precedence climbing, loosest level first.
    fn binary_level(&mut self, level: usize) -> Result<LengthExpr, SpecError> {
        const LEVELS: [&[(&str, BinaryOp)]; 6] = [
            &[("|", BinaryOp::Or)],
            &[("^", BinaryOp::Xor)],
            &[("&", BinaryOp::And)],
            &[("<<", BinaryOp::Shl), (">>>", BinaryOp::Lsr), (">>", BinaryOp::Shr)],
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
        ];

        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };

        let mut lhs = self.binary_level(level + 1)?;
        loop {
            let op = ops.iter().find_map(|(sym, op)| match self.peek() {
                Some(Token::Punct(p)) if p == sym => Some(*op),
                Some(Token::Ident(word)) if word == "mod" && *sym == "%" => Some(*op),
                _ => None,
            });
            let Some(op) = op else {
                return Ok(lhs);
            };
            self.pos += 1;
            let rhs = self.binary_level(level + 1)?;
            lhs = LengthExpr::binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<LengthExpr, SpecError> {
        if self.eat("-") {
            let operand = self.unary()?;
            return Ok(match operand {
                LengthExpr::Const(n) => LengthExpr::Const(-n),
                other => LengthExpr::binary(BinaryOp::Sub, LengthExpr::Const(0), other),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<LengthExpr, SpecError> {
        let position = self.position();
        match self.next() {
            Some(Token::Int(n)) => Ok(LengthExpr::Const(n)),
            Some(Token::Ident(name)) => Ok(LengthExpr::Var(name)),
            Some(Token::Punct("(")) => {
                let inner = self.expr()?;
                self.expect(")")?;
                Ok(inner)
            }
            _ => Err(parse_error(position, "expected a length")),
        }
    }
}
