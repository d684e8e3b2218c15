//! Per-field qualifiers: value type, signedness, endianness, guard, value
//! override, value mapping and offset capture.

use std::str::FromStr;

use crate::{
    errors::{QualifierError, Slot},
    expr::{CheckExpr, EndianExpr, MapExpr, ValueExpr},
    value::{Bindings, Value},
};

/// Which encode/decode family a field uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    Int,
    String,
    Bitstring,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::String => "string",
            ValueType::Bitstring => "bitstring",
        }
    }
}

/// Signedness of an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sign {
    Signed,
    Unsigned,
}

/// A concrete byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the target the engine runs on.
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }
}

/// Byte order of an integer field, possibly decided at run time.
#[derive(Debug, Clone)]
pub enum Endian {
    Little,
    Big,
    Native,
    Referred(EndianExpr),
}

impl Endian {
    pub fn resolve(&self, env: &Bindings<'_>) -> Endianness {
        match self {
            Endian::Little => Endianness::Little,
            Endian::Big => Endianness::Big,
            Endian::Native => Endianness::native(),
            Endian::Referred(expr) => expr.eval(env),
        }
    }

    pub fn is_referred(&self) -> bool {
        matches!(self, Endian::Referred(_))
    }
}

/// A single qualifier token, as written after the second `:` of a field.
#[derive(Debug, Clone)]
pub enum Qualifier {
    Int,
    String,
    Bitstring,
    Signed,
    Unsigned,
    LittleEndian,
    BigEndian,
    NativeEndian,
    Endian(EndianExpr),
    Bind(ValueExpr),
    Check(CheckExpr),
    Map(MapExpr),
    SaveOffsetTo(String),
}

impl Qualifier {
    pub fn endian(f: impl for<'b> Fn(&Bindings<'b>) -> Endianness + Send + Sync + 'static) -> Self {
        Qualifier::Endian(EndianExpr::new(f))
    }

    pub fn bind(f: impl for<'b> Fn(&Bindings<'b>) -> Value<'b> + Send + Sync + 'static) -> Self {
        Qualifier::Bind(ValueExpr::new(f))
    }

    pub fn check(
        f: impl for<'b> Fn(&Value<'b>, &Bindings<'b>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Qualifier::Check(CheckExpr::new(f))
    }

    pub fn map(f: impl for<'b> Fn(Value<'b>) -> Value<'b> + Send + Sync + 'static) -> Self {
        Qualifier::Map(MapExpr::new(f))
    }

    pub fn save_offset_to(name: impl Into<String>) -> Self {
        Qualifier::SaveOffsetTo(name.into())
    }
}

impl FromStr for Qualifier {
    type Err = QualifierError;

    /// Parses the word-form qualifiers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "int" => Qualifier::Int,
            "string" => Qualifier::String,
            "bitstring" => Qualifier::Bitstring,
            "signed" => Qualifier::Signed,
            "unsigned" => Qualifier::Unsigned,
            "littleendian" => Qualifier::LittleEndian,
            "bigendian" => Qualifier::BigEndian,
            "nativeendian" => Qualifier::NativeEndian,
            other => return Err(QualifierError::Invalid(other.to_string())),
        })
    }
}

/// The resolved qualifiers of one field. Every slot is set at most once.
#[derive(Debug, Clone, Default)]
pub struct Qualifiers {
    pub value_type: Option<ValueType>,
    pub sign: Option<Sign>,
    pub endian: Option<Endian>,
    pub check: Option<CheckExpr>,
    pub bind: Option<ValueExpr>,
    pub map: Option<MapExpr>,
    pub save_offset_to: Option<String>,
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: Slot) -> Result<(), QualifierError> {
    if slot.is_some() {
        return Err(QualifierError::Duplicate(name));
    }
    *slot = Some(value);
    Ok(())
}

impl Qualifiers {
    /// No slot set, and no defaults applied.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Folds `tokens` into a qualifier record.
    ///
    /// A single token yields exactly that slot; a longer list is passed
    /// through [Qualifiers::set_defaults].
    pub fn resolve<I>(tokens: I) -> Result<Self, QualifierError>
    where
        I: IntoIterator<Item = Qualifier>,
    {
        let mut qualifiers = Self::empty();
        let mut count = 0;

        for token in tokens {
            qualifiers.apply(token)?;
            count += 1;
        }

        if count > 1 {
            qualifiers = qualifiers.set_defaults();
        }

        Ok(qualifiers)
    }

    /// Sets the slot `token` refers to, failing if it is already set.
    pub fn apply(&mut self, token: Qualifier) -> Result<(), QualifierError> {
        match token {
            Qualifier::Int => set_once(&mut self.value_type, ValueType::Int, Slot::ValueType),
            Qualifier::String => set_once(&mut self.value_type, ValueType::String, Slot::ValueType),
            Qualifier::Bitstring => {
                set_once(&mut self.value_type, ValueType::Bitstring, Slot::ValueType)
            }
            Qualifier::Signed => set_once(&mut self.sign, Sign::Signed, Slot::Sign),
            Qualifier::Unsigned => set_once(&mut self.sign, Sign::Unsigned, Slot::Sign),
            Qualifier::LittleEndian => set_once(&mut self.endian, Endian::Little, Slot::Endian),
            Qualifier::BigEndian => set_once(&mut self.endian, Endian::Big, Slot::Endian),
            Qualifier::NativeEndian => set_once(&mut self.endian, Endian::Native, Slot::Endian),
            Qualifier::Endian(e) => set_once(&mut self.endian, Endian::Referred(e), Slot::Endian),
            Qualifier::Bind(e) => set_once(&mut self.bind, e, Slot::Bind),
            Qualifier::Check(e) => set_once(&mut self.check, e, Slot::Check),
            Qualifier::Map(e) => set_once(&mut self.map, e, Slot::Map),
            Qualifier::SaveOffsetTo(name) => set_once(&mut self.save_offset_to, name, Slot::Offset),
        }
    }

    /// Fills value type, sign and endianness when unset.
    pub fn set_defaults(mut self) -> Self {
        self.value_type.get_or_insert(ValueType::Int);
        self.sign.get_or_insert(Sign::Unsigned);
        self.endian.get_or_insert(Endian::Big);
        self
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type.unwrap_or(ValueType::Int)
    }

    pub fn sign(&self) -> Sign {
        self.sign.unwrap_or(Sign::Unsigned)
    }

    pub fn endian(&self) -> &Endian {
        self.endian.as_ref().unwrap_or(&Endian::Big)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_token_has_no_defaults() {
        let q = Qualifiers::resolve([Qualifier::Signed]).unwrap();
        assert_eq!(q.sign, Some(Sign::Signed));
        assert_eq!(q.value_type, None);
        assert!(q.endian.is_none());
    }

    #[test]
    fn test_multiple_tokens_get_defaults() {
        let q = Qualifiers::resolve([Qualifier::Signed, Qualifier::LittleEndian]).unwrap();
        assert_eq!(q.value_type, Some(ValueType::Int));
        assert_eq!(q.sign, Some(Sign::Signed));
        assert!(matches!(q.endian, Some(Endian::Little)));
    }

    #[test]
    fn test_set_defaults_keeps_existing() {
        let q = Qualifiers::resolve([Qualifier::String])
            .unwrap()
            .set_defaults();
        assert_eq!(q.value_type, Some(ValueType::String));
        assert_eq!(q.sign, Some(Sign::Unsigned));
        assert!(matches!(q.endian, Some(Endian::Big)));
    }

    #[test]
    fn test_duplicate_endianness() {
        let err = Qualifiers::resolve([Qualifier::BigEndian, Qualifier::LittleEndian]).unwrap_err();
        assert_eq!(err, QualifierError::Duplicate(Slot::Endian));
    }

    #[test]
    fn test_duplicate_slots() {
        let cases = [
            (vec![Qualifier::Int, Qualifier::String], Slot::ValueType),
            (vec![Qualifier::Signed, Qualifier::Unsigned], Slot::Sign),
            (
                vec![Qualifier::save_offset_to("a"), Qualifier::save_offset_to("b")],
                Slot::Offset,
            ),
            (
                vec![Qualifier::map(|v| v), Qualifier::map(|v| v)],
                Slot::Map,
            ),
        ];

        for (tokens, slot) in cases {
            assert_eq!(
                Qualifiers::resolve(tokens).unwrap_err(),
                QualifierError::Duplicate(slot)
            );
        }
    }

    #[test]
    fn test_bind_and_check_are_independent() {
        let q = Qualifiers::resolve([
            Qualifier::bind(|_| Value::U64(1)),
            Qualifier::check(|_, _| true),
        ]);
        assert!(q.is_ok());

        let err = Qualifiers::resolve([
            Qualifier::check(|_, _| true),
            Qualifier::check(|_, _| false),
        ])
        .unwrap_err();
        assert_eq!(err, QualifierError::Duplicate(Slot::Check));

        let err = Qualifiers::resolve([
            Qualifier::bind(|_| Value::U64(1)),
            Qualifier::bind(|_| Value::U64(2)),
        ])
        .unwrap_err();
        assert_eq!(err, QualifierError::Duplicate(Slot::Bind));
    }

    #[test]
    fn test_from_str() {
        assert!(matches!("bigendian".parse::<Qualifier>(), Ok(Qualifier::BigEndian)));
        assert_eq!(
            "bogus".parse::<Qualifier>().unwrap_err(),
            QualifierError::Invalid("bogus".to_string())
        );
    }

    #[test]
    fn test_referred_endian_resolves_at_run_time() {
        let endian = Endian::Referred(EndianExpr::new(|env| {
            if env.contains_key("le") {
                Endianness::Little
            } else {
                Endianness::Big
            }
        }));
        let mut env = Bindings::new();
        assert_eq!(endian.resolve(&env), Endianness::Big);
        env.insert("le".to_string(), Value::Bool(true));
        assert_eq!(endian.resolve(&env), Endianness::Little);
        assert!(endian.is_referred());
    }
}
