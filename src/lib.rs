//! # bitpattern
//!
//! Declarative bit-level pattern matching and construction of binary data.
//!
//! A case is an ordered list of fields, each a pattern, a length in bits and
//! a set of qualifiers (type, signedness, endianness, guards). Matching
//! threads a bit cursor through the fields and evaluates the body of the
//! first case whose fields all match. Construction runs the other way: it
//! evaluates each field's value and appends it to a bit buffer.
//!
//! ## Example
//!
//! ```
//! use bitpattern::cursor::Cursor;
//! use bitpattern::field::Field;
//! use bitpattern::matcher::{Case, Matcher};
//! use bitpattern::qualifier::Qualifier;
//!
//! let header = vec![
//!     Field::bind("version", 4),
//!     Field::bind("len", 12).qualified([Qualifier::Unsigned]).unwrap(),
//! ];
//! let matcher = Matcher::compile(&[Case::new(header, |env| env["len"].as_i128())]).unwrap();
//!
//! let len = matcher.match_cursor(Cursor::new(&[0x40, 0x2A])).unwrap();
//! assert_eq!(len, Some(42));
//! ```
//!
//! The same layout in the textual syntax:
//!
//! ```
//! use bitpattern::construct::construct;
//! use bitpattern::parse::{Externs, parse_build_fields};
//! use bitpattern::value::{Bindings, Value};
//!
//! let fields = parse_build_fields("4 : 4; len : 12 : unsigned", &Externs::new()).unwrap();
//! let mut env = Bindings::new();
//! env.insert("len".to_string(), Value::U64(42));
//! assert_eq!(construct(&fields, &env).unwrap().into_bytes(), vec![0x40, 0x2A]);
//! ```

pub(crate) mod bits;
pub mod compiled;
pub mod construct;
pub mod cursor;
pub mod dispatch;
pub mod errors;
pub mod expr;
pub mod field;
pub mod length;
pub mod matcher;
pub mod parse;
pub mod qualifier;
#[cfg(feature = "serde")]
pub mod serde;
pub mod value;
pub mod writer;
