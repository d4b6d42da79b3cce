//! Built-in simple schema types and runtime atomic values.
//!
//! The crate knows the lexical spaces of the XML Schema built-ins a query
//! result can carry, renders values into them and parses them back. The
//! [`ValueClassifier`] trait names the type of a value and auto-types store
//! fragments holding its text.

mod classifier;
mod error;
mod lexical;
mod temporal;
mod types;
mod value;

pub use classifier::{BuiltinClassifier, ValueClassifier};
pub use error::{ClassificationError, LexicalError};
pub use lexical::parse_lexical;
pub use types::{BuiltinSimpleType, XS_NAMESPACE, XS_PREFIX};
pub use value::{AtomicValue, Duration};

pub use num_bigint::BigInt;
pub use rust_decimal::Decimal;
