//! JSON-deserializable field specifications.
//!
//! These types describe the *shape* of a binary layout as plain data, for
//! example a specification file shipped with an application. Patterns,
//! lengths and qualifiers use the textual syntax of [crate::parse];
//! expression-valued qualifiers name closures supplied through
//! [crate::parse::Externs].

use serde::{Deserialize, Serialize};

use crate::{
    construct::Constructor,
    errors::SpecError,
    field::{BuildField, BuildValue, Field, Pattern},
    matcher::{Case, Matcher},
    parse::{self, Externs},
    qualifier::Qualifiers,
};

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    /// Pattern (matching) or value (construction): a name, `_`, or a literal.
    pub pattern: String,
    /// Length expression, e.g. `"16"`, `"-1"` or `"len * 8"`.
    pub length: String,
    /// Qualifier tokens, e.g. `["signed", "littleendian"]`.
    #[serde(default)]
    pub qualifiers: Vec<String>,
}

impl FieldDef {
    fn qualifiers(&self, externs: &Externs) -> Result<Qualifiers, SpecError> {
        if self.qualifiers.is_empty() {
            return Ok(Qualifiers::empty());
        }
        parse::parse_qualifiers(&self.qualifiers.join(", "), externs)
    }

    pub fn to_field(&self, externs: &Externs) -> Result<Field, SpecError> {
        Ok(Field::new(
            parse::parse_pattern(&self.pattern)?,
            parse::parse_length(&self.length)?,
            self.qualifiers(externs)?,
        ))
    }

    pub fn to_build_field(&self, externs: &Externs) -> Result<BuildField, SpecError> {
        let value = match parse::parse_pattern(&self.pattern)? {
            Pattern::Bind(name) => BuildValue::Var(name),
            Pattern::Literal(literal) => BuildValue::Literal(literal),
            Pattern::Wildcard => {
                return Err(SpecError::Parse {
                    position: 0,
                    message: "`_` has no value to construct".to_string(),
                });
            }
        };

        Ok(BuildField::new(
            value,
            parse::parse_length(&self.length)?,
            self.qualifiers(externs)?,
        ))
    }
}

impl TryFrom<&FieldDef> for Field {
    type Error = SpecError;

    fn try_from(value: &FieldDef) -> Result<Self, Self::Error> {
        value.to_field(&Externs::new())
    }
}

/// A named list of fields. As a match case, its name is the case result.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaseDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl CaseDef {
    pub fn fields(&self, externs: &Externs) -> Result<Vec<Field>, SpecError> {
        self.fields.iter().map(|f| f.to_field(externs)).collect()
    }

    pub fn build_fields(&self, externs: &Externs) -> Result<Vec<BuildField>, SpecError> {
        self.fields.iter().map(|f| f.to_build_field(externs)).collect()
    }
}

/// Top-level specification: cases tried in order.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpecDef {
    pub cases: Vec<CaseDef>,
}

impl SpecDef {
    /// A matcher whose result is the name of the matching case.
    pub fn matcher(&self, externs: &Externs) -> Result<Matcher<String>, SpecError> {
        let cases = self
            .cases
            .iter()
            .map(|case| {
                let name = case.name.clone();
                Ok(Case::new(case.fields(externs)?, move |_| name.clone()))
            })
            .collect::<Result<Vec<_>, SpecError>>()?;

        Matcher::compile(&cases)
    }

    /// A constructor for the case called `name`, if there is one.
    pub fn constructor(&self, name: &str, externs: &Externs) -> Result<Option<Constructor>, SpecError> {
        self.cases
            .iter()
            .find(|case| case.name == name)
            .map(|case| Constructor::compile(&case.build_fields(externs)?))
            .transpose()
    }
}
