//! Scripted expression engine for exercising the query bridge in tests.
//!
//! Expressions are compiled through a light static phase (syntax, prefixes,
//! variables) and evaluated by closures registered per expression body. See
//! [`scripts`] for the common ones.

mod engine;
mod lexer;
mod node;
pub mod scripts;

pub use engine::{MockCompiled, Script, ScriptContext, ScriptedEngine};
pub use node::{MockNode, SyntheticNode};
