//! Query execution bridge between an expression engine and the XML store.
//!
//! Expressions are compiled once into a [`CompiledQuery`], then run any number
//! of times through single-use [`QueryExecution`]s. Each execution captures the
//! document version when it is prepared and refuses to produce results if the
//! document changed in between. Results land in a store [`Selection`]: nodes as
//! cursors on the very same nodes, scalars as typed fragments.
//!
//! ```ignore
//! let bridge = QueryBridge::new(engine);
//! let found = bridge.select(&cursor, "//item[@id = $id]", &VariableBindings::new().with("id", 7))?;
//! ```
//!
//! [`Selection`]: xqbridge_store::Selection

mod binder;
mod bridge;
mod cache;
mod compiler;
mod error;
mod execution;
mod materialize;
mod options;

pub use binder::{
    CalendarShape, CalendarValue, DurationValue, GenericDuration, VariableBindings, VariableValue, bind_variables,
};
pub use bridge::QueryBridge;
pub use cache::{CacheStats, QueryCache, QueryKey};
pub use compiler::{
    CompiledQuery, DEFAULT_ELEMENT_NAMESPACE_KEY, NamespaceMap, compile, compile_with_variables, find_prolog_boundary,
};
pub use error::{BindError, BridgeError, CompileError, ExecError, MaterializationError};
pub use execution::{QueryExecution, execute};
pub use materialize::materialize;
pub use options::{BridgeOptions, DEFAULT_CACHE_CAPACITY, DEFAULT_CONTEXT_VARIABLE};
